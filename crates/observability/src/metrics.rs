//! Relay metric recording
//!
//! Thin helpers over the `metrics` facade so every crate uses the same names
//! and labels. Without an installed recorder these calls are no-ops.

use contracts::RejectionReason;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

pub const FRAMES_RECEIVED: &str = "telemetry_relay_frames_received_total";
pub const RECORDS_ACCEPTED: &str = "telemetry_relay_records_accepted_total";
pub const RECORDS_REJECTED: &str = "telemetry_relay_records_rejected_total";
pub const UPSTREAM_RECONNECTS: &str = "telemetry_relay_upstream_reconnects_total";
pub const CONNECTOR_STATE: &str = "telemetry_relay_connector_state";
pub const RECORDS_DISPATCHED: &str = "telemetry_relay_records_dispatched_total";
pub const LIVE_SUBSCRIBERS: &str = "telemetry_relay_live_subscribers";
pub const LIVE_DROPPED: &str = "telemetry_relay_live_dropped_total";
pub const QUERY_SCANNED_LINES: &str = "telemetry_relay_query_scanned_lines";
pub const QUERY_SKIPPED_LINES: &str = "telemetry_relay_query_skipped_lines_total";

/// Register descriptions with the installed recorder
pub fn describe_metrics() {
    describe_counter!(FRAMES_RECEIVED, "Frames received from the upstream feed");
    describe_counter!(RECORDS_ACCEPTED, "Frames that passed validation");
    describe_counter!(RECORDS_REJECTED, "Frames rejected by validation, by reason");
    describe_counter!(UPSTREAM_RECONNECTS, "Upstream disconnects followed by a retry");
    describe_gauge!(
        CONNECTOR_STATE,
        "0 = disconnected, 1 = connecting, 2 = reading, 3 = stopped"
    );
    describe_counter!(RECORDS_DISPATCHED, "Sink writes, by sink and status");
    describe_gauge!(LIVE_SUBSCRIBERS, "Currently attached live subscribers");
    describe_counter!(LIVE_DROPPED, "Records dropped for slow live subscribers");
    describe_histogram!(QUERY_SCANNED_LINES, "Log lines scanned per historical query");
    describe_counter!(QUERY_SKIPPED_LINES, "Unparseable log lines skipped by queries");
}

/// Record one upstream frame
pub fn record_frame_received() {
    counter!(FRAMES_RECEIVED).increment(1);
}

/// Record a frame that became a record
pub fn record_record_accepted() {
    counter!(RECORDS_ACCEPTED).increment(1);
}

/// Record a validation rejection
pub fn record_record_rejected(reason: &RejectionReason) {
    counter!(RECORDS_REJECTED, "reason" => reason.kind()).increment(1);
}

/// Record a frame of an unsupported kind (binary)
pub fn record_frame_unsupported() {
    counter!(RECORDS_REJECTED, "reason" => "unsupported_frame").increment(1);
}

/// Record an upstream disconnect that schedules a reconnect
pub fn record_upstream_reconnect() {
    counter!(UPSTREAM_RECONNECTS).increment(1);
}

/// Record the connector state code
pub fn record_connector_state(code: u8) {
    gauge!(CONNECTOR_STATE).set(f64::from(code));
}

/// Record a sink write outcome
pub fn record_record_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        RECORDS_DISPATCHED,
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record the live subscriber count
pub fn record_live_subscribers(count: usize) {
    gauge!(LIVE_SUBSCRIBERS).set(count as f64);
}

/// Record records dropped for a lagging subscriber
pub fn record_live_dropped(count: u64) {
    counter!(LIVE_DROPPED).increment(count);
}

/// Record a completed historical scan
pub fn record_query_scan(scanned_lines: u64, skipped_lines: u64) {
    histogram!(QUERY_SCANNED_LINES).record(scanned_lines as f64);
    if skipped_lines > 0 {
        counter!(QUERY_SKIPPED_LINES).increment(skipped_lines);
    }
}
