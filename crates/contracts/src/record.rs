//! Record - the validated telemetry unit
//!
//! A `Record` can only be obtained through [`Record::new`] (or deserialization,
//! which routes through the same checks), so every instance past the validation
//! boundary satisfies `timestamp > 0` and `value >= 0`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accepted telemetry record
///
/// Serialized form is exactly `{"timestamp":<i64>,"value":<i64>}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct Record {
    /// Epoch milliseconds
    timestamp: i64,
    value: i64,
}

impl Record {
    /// Build a record, enforcing the range invariants
    pub fn new(timestamp: i64, value: i64) -> Result<Self, RejectionReason> {
        if timestamp <= 0 {
            return Err(RejectionReason::InvalidTimestamp { timestamp });
        }
        if value < 0 {
            return Err(RejectionReason::InvalidValue { value });
        }
        Ok(Self { timestamp, value })
    }

    /// Epoch milliseconds
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    /// Inclusive on both ends
    pub fn is_within(&self, start: i64, end: i64) -> bool {
        start <= self.timestamp && self.timestamp <= end
    }
}

/// Wire shape before range checks
#[derive(Deserialize)]
struct RecordFields {
    timestamp: i64,
    value: i64,
}

impl TryFrom<RecordFields> for Record {
    type Error = RejectionReason;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        Record::new(fields.timestamp, fields.value)
    }
}

/// Why a raw frame did not become a [`Record`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// Null, empty or whitespace-only payload
    #[error("empty payload")]
    EmptyPayload,

    /// Payload does not parse into the two-field shape
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// `timestamp <= 0`
    #[error("invalid timestamp {timestamp}: must be > 0")]
    InvalidTimestamp { timestamp: i64 },

    /// `value < 0`
    #[error("invalid value {value}: must be >= 0")]
    InvalidValue { value: i64 },
}

impl RejectionReason {
    /// Create a malformed payload rejection
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    /// Stable label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyPayload => "empty_payload",
            Self::MalformedPayload { .. } => "malformed_payload",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::InvalidValue { .. } => "invalid_value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_new_enforces_ranges() {
        assert!(Record::new(1, 0).is_ok());
        assert_eq!(
            Record::new(0, 5),
            Err(RejectionReason::InvalidTimestamp { timestamp: 0 })
        );
        assert_eq!(
            Record::new(10, -1),
            Err(RejectionReason::InvalidValue { value: -1 })
        );
    }

    #[test]
    fn test_record_serializes_two_fields() {
        let record = Record::new(1_700_000_000_000, 72).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"timestamp":1700000000000,"value":72}"#);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let err = serde_json::from_str::<Record>(r#"{"timestamp": -4, "value": 1}"#);
        assert!(err.is_err());

        let ok: Record = serde_json::from_str(r#"{"timestamp": 4, "value": 1}"#).unwrap();
        assert_eq!(ok.timestamp(), 4);
    }

    #[test]
    fn test_is_within_inclusive() {
        let record = Record::new(200, 1).unwrap();
        assert!(record.is_within(200, 200));
        assert!(record.is_within(150, 250));
        assert!(!record.is_within(201, 300));
        assert!(!record.is_within(100, 199));
    }

    #[test]
    fn test_rejection_kind_labels() {
        assert_eq!(RejectionReason::EmptyPayload.kind(), "empty_payload");
        assert_eq!(RejectionReason::malformed("x").kind(), "malformed_payload");
    }
}
