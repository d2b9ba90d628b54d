use std::fmt;
use std::ops::Range;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::message::Message;

const FIELD_SEP: [u8; 1] = [0x1f];
const RECORD_SEP: [u8; 1] = [0x1e];

/// A contiguous, non-empty run of messages produced by the windower.
///
/// The first [`overlap`](Window::overlap) messages repeat the tail of the
/// previous window; the rest are fresh. `range` indexes into the slice the
/// windower was given, so `range().end` is the count of messages this window
/// brings fully into view.
#[derive(Debug, Clone)]
pub struct Window<'a> {
    index: usize,
    range: Range<usize>,
    overlap: usize,
    messages: &'a [Message],
}

impl<'a> Window<'a> {
    /// `messages` must be the non-empty, time-ordered slice that `range`
    /// addresses in the windower input.
    pub(crate) fn new(
        index: usize,
        range: Range<usize>,
        overlap: usize,
        messages: &'a [Message],
    ) -> Self {
        debug_assert!(!messages.is_empty());
        debug_assert_eq!(range.len(), messages.len());
        Self {
            index,
            range,
            overlap: overlap.min(messages.len()),
            messages,
        }
    }

    /// Narrow to `local` (indices relative to this window's messages),
    /// keeping the window index.
    pub(crate) fn slice(&self, local: Range<usize>) -> Window<'a> {
        let overlap = self.overlap.min(local.end).saturating_sub(local.start);
        let range = self.range.start + local.start..self.range.start + local.end;
        Window::new(self.index, range, overlap, &self.messages[local])
    }

    /// Zero-based position in the windowing sequence. Parts produced by
    /// splitting share their parent's index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.messages[0].timestamp
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.messages[self.messages.len() - 1].timestamp
    }

    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Number of leading messages repeated from the previous window.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn messages(&self) -> &'a [Message] {
        self.messages
    }

    pub fn fresh_messages(&self) -> &'a [Message] {
        &self.messages[self.overlap..]
    }

    /// Total UTF-8 text size of every message in the window.
    pub fn byte_size(&self) -> usize {
        self.messages.iter().map(Message::byte_size).sum()
    }

    /// Hex SHA-256 over timestamp, author and text of each message.
    ///
    /// Stable across runs for the same messages, which makes it usable as a
    /// cache or deduplication key by downstream processors.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for m in self.messages {
            hasher.update(m.timestamp.to_rfc3339().as_bytes());
            hasher.update(FIELD_SEP);
            hasher.update(m.author_id.as_bytes());
            hasher.update(FIELD_SEP);
            hasher.update(m.text.as_bytes());
            hasher.update(RECORD_SEP);
        }
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for Window<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{} .. {}] {} msgs ({} overlap)",
            self.index,
            self.start_time().format("%Y-%m-%d %H:%M"),
            self.end_time().format("%Y-%m-%d %H:%M"),
            self.size(),
            self.overlap,
        )
    }
}
