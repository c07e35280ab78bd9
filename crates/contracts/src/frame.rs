//! RawFrame - unvalidated upstream payload

use bytes::Bytes;

/// Payload as received from the upstream transport
///
/// Discarded right after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// Text frame (the only supported kind)
    Text(String),

    /// Binary frame (unsupported, dropped by the connector)
    Binary(Bytes),
}

impl RawFrame {
    /// Text content, if this is a text frame
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for RawFrame {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawFrame {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
