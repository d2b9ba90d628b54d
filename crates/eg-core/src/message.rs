use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat message as produced by an input adapter.
///
/// Windowing and resume filtering assume a slice of messages in
/// non-decreasing `timestamp` order; [`sort_messages`] establishes that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: DateTime<Utc>,
    pub author_id: String,
    pub text: String,
}

impl Message {
    pub fn new(timestamp: DateTime<Utc>, author_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            author_id: author_id.into(),
            text: text.into(),
        }
    }

    /// UTF-8 length of the message text.
    pub fn byte_size(&self) -> usize {
        self.text.len()
    }
}

/// Stable sort by timestamp; messages sharing a timestamp keep their
/// original relative order.
pub fn sort_messages(messages: &mut [Message]) {
    messages.sort_by_key(|m| m.timestamp);
}

pub fn is_time_ordered(messages: &[Message]) -> bool {
    messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}
