use chrono::{DateTime, Utc};

use super::record::Checkpoint;
use crate::message::Message;

/// Drop every message already covered by `checkpoint`.
///
/// `messages` must be time-ordered. Without a checkpoint, or with one that
/// never committed a timestamp, the input is returned unchanged.
pub fn resume_filter<'a>(messages: &'a [Message], checkpoint: Option<&Checkpoint>) -> &'a [Message] {
    match checkpoint.and_then(|c| c.last_processed_timestamp) {
        Some(last) => &messages[messages.partition_point(|m| m.timestamp <= last)..],
        None => messages,
    }
}

/// Timestamp that can be committed once `messages[..processed_end]` has been
/// processed.
///
/// Resuming filters on `timestamp <= committed`, so committing a timestamp
/// shared with an unprocessed message would lose that message. In that case
/// the commit backs off to the newest strictly earlier timestamp, or `None`
/// when no safe point exists yet.
pub fn commit_point(messages: &[Message], processed_end: usize) -> Option<DateTime<Utc>> {
    let processed_end = processed_end.min(messages.len());
    let last = messages[..processed_end].last()?.timestamp;

    match messages.get(processed_end) {
        Some(next) if next.timestamp <= last => {
            let tied = messages[..processed_end].partition_point(|m| m.timestamp < last);
            tied.checked_sub(1).map(|i| messages[i].timestamp)
        }
        _ => Some(last),
    }
}
