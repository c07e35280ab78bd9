//! Record validator
//!
//! Turns one raw text frame into an accepted [`Record`] or a
//! [`RejectionReason`]. Pure and stateless.

use contracts::{Record, RejectionReason};
use serde::Deserialize;

/// Two-field frame shape; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct FramePayload {
    timestamp: i64,
    value: i64,
}

/// Validate a raw text frame
///
/// Checks run in order: emptiness, shape, timestamp range, value range.
/// A JSON `null` counts as empty.
pub fn validate(raw: &str) -> Result<Record, RejectionReason> {
    if raw.trim().is_empty() {
        return Err(RejectionReason::EmptyPayload);
    }

    let payload: FramePayload = serde_json::from_str::<Option<FramePayload>>(raw)
        .map_err(|e| RejectionReason::malformed(e.to_string()))?
        .ok_or(RejectionReason::EmptyPayload)?;

    Record::new(payload.timestamp, payload.value)
}
