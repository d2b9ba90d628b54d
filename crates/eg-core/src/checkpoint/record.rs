use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version written into every new checkpoint.
pub const SCHEMA_VERSION: &str = "1.0";
const SCHEMA_MAJOR: &str = "1";

/// Persisted progress marker for one source.
///
/// `last_processed_timestamp` is the newest timestamp whose messages have all
/// been processed; `None` means nothing has been committed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_processed_timestamp: Option<DateTime<Utc>>,
    pub messages_processed: u64,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new(None, 0)
    }
}

impl Checkpoint {
    pub fn new(last_processed_timestamp: Option<DateTime<Utc>>, messages_processed: u64) -> Self {
        Self {
            last_processed_timestamp,
            messages_processed,
            schema_version: default_schema_version(),
        }
    }

    /// Move forward to `timestamp` with `messages_processed` total. Neither
    /// field ever moves backwards.
    pub fn advance(&self, timestamp: DateTime<Utc>, messages_processed: u64) -> Self {
        let last = match self.last_processed_timestamp {
            Some(prev) => prev.max(timestamp),
            None => timestamp,
        };
        Self::new(Some(last), self.messages_processed.max(messages_processed))
    }

    /// Whether this build understands the record's layout.
    pub fn is_supported(&self) -> bool {
        self.schema_version.split('.').next() == Some(SCHEMA_MAJOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn advance_is_monotonic() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let cp = Checkpoint::default().advance(t2, 10);
        let back = cp.advance(t1, 4);
        assert_eq!(back.last_processed_timestamp, Some(t2));
        assert_eq!(back.messages_processed, 10);
    }

    #[test]
    fn json_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap();
        let cp = Checkpoint::new(Some(ts), 42);
        let v = serde_json::to_value(&cp).unwrap();
        assert_eq!(v["last_processed_timestamp"], "2024-01-01T12:30:00Z");
        assert_eq!(v["messages_processed"], 42);
        assert_eq!(v["schema_version"], "1.0");
    }

    #[test]
    fn missing_schema_version_defaults() {
        let cp: Checkpoint =
            serde_json::from_str(r#"{"last_processed_timestamp":null,"messages_processed":0}"#)
                .unwrap();
        assert_eq!(cp.schema_version, SCHEMA_VERSION);
        assert!(cp.is_supported());
    }

    #[test]
    fn schema_major_gates_support() {
        let mut cp = Checkpoint::default();
        cp.schema_version = "1.7".into();
        assert!(cp.is_supported());
        cp.schema_version = "2.0".into();
        assert!(!cp.is_supported());
        cp.schema_version = "10".into();
        assert!(!cp.is_supported());
    }
}
