use std::collections::VecDeque;
use std::fmt;

use eg_core::checkpoint::{Checkpoint, CheckpointStore, commit_point, resume_filter};
use eg_core::message::Message;
use eg_core::window::{Window, Windower, split_window};
use orion_error::prelude::*;
use serde::Serialize;

use crate::error::{RuntimeReason, RuntimeResult, from_core};
use crate::processor::{ProcessError, WindowProcessor};

// ---------------------------------------------------------------------------
// DriverOptions / RunReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    /// Stop after this many windows; 0 processes everything.
    pub max_windows: usize,
    /// Split windows whose text exceeds this many bytes before processing.
    pub max_window_bytes: Option<usize>,
    /// How many times a window may be re-split.
    pub max_split_depth: usize,
    /// Read the checkpoint before the run and write it after every window.
    pub checkpoint: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_windows: 0,
            max_window_bytes: None,
            max_split_depth: 5,
            checkpoint: false,
        }
    }
}

/// Outcome of one source run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub source: String,
    /// Messages dropped by the resume filter.
    pub skipped: usize,
    /// Messages left to process when the run started.
    pub pending: usize,
    pub windows_processed: usize,
    /// Checkpoint in effect when the run finished.
    pub checkpoint: Option<Checkpoint>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} window(s) processed, {} message(s) pending, {} skipped",
            self.source, self.windows_processed, self.pending, self.skipped
        )?;
        if let Some(ts) = self
            .checkpoint
            .as_ref()
            .and_then(|c| c.last_processed_timestamp)
        {
            write!(f, ", checkpoint at {}", ts.to_rfc3339())?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WindowDriver
// ---------------------------------------------------------------------------

/// Runs one source: read the checkpoint, skip what it covers, window the
/// rest, hand each window to a processor and commit progress after each.
pub struct WindowDriver<'s> {
    source: String,
    windower: Windower,
    options: DriverOptions,
    store: &'s dyn CheckpointStore,
}

impl<'s> WindowDriver<'s> {
    pub fn new(
        source: impl Into<String>,
        windower: Windower,
        options: DriverOptions,
        store: &'s dyn CheckpointStore,
    ) -> Self {
        Self {
            source: source.into(),
            windower,
            options,
            store,
        }
    }

    /// Process `messages` (time-ordered). A processor failure or a failed
    /// checkpoint write stops the run; every window before it stays
    /// committed.
    pub fn run<P>(&self, messages: &[Message], processor: &mut P) -> RuntimeResult<RunReport>
    where
        P: WindowProcessor + ?Sized,
    {
        let _span = tracing::info_span!("source", name = %self.source).entered();

        let previous = if self.options.checkpoint {
            self.store.load(&self.source)
        } else {
            None
        };
        let pending = resume_filter(messages, previous.as_ref());
        let skipped = messages.len() - pending.len();
        let base_count = previous.as_ref().map_or(0, |c| c.messages_processed);
        eg_info!(
            win,
            total = messages.len(),
            skipped,
            pending = pending.len(),
            policy = %self.windower.policy(),
            "windowing source"
        );

        let limit = window_limit(self.options.max_windows);
        let mut checkpoint = previous;
        let mut windows_processed = 0;

        // Already-processed messages stay in view as overlap context.
        for window in self.windower.windows_from(messages, skipped).take(limit) {
            self.process_window(&window, processor)?;
            windows_processed += 1;

            if !self.options.checkpoint {
                continue;
            }
            let Some(ts) = commit_point(pending, window.range().end - skipped) else {
                eg_debug!(ckpt, index = window.index(), "no safe commit point yet");
                continue;
            };
            let done = base_count + pending.partition_point(|m| m.timestamp <= ts) as u64;
            let next = match &checkpoint {
                Some(prev) => prev.advance(ts, done),
                None => Checkpoint::new(Some(ts), done),
            };
            self.store.save(&self.source, &next).map_err(from_core)?;
            eg_debug!(ckpt, at = %ts, messages = done, "checkpoint saved");
            checkpoint = Some(next);
        }

        let report = RunReport {
            source: self.source.clone(),
            skipped,
            pending: pending.len(),
            windows_processed,
            checkpoint,
        };
        eg_info!(win, windows = report.windows_processed, "source done");
        Ok(report)
    }

    /// Process one window, splitting it (depth-first, in order) as long as
    /// it is over `max_window_bytes` or the processor reports it too large.
    fn process_window<P>(&self, window: &Window<'_>, processor: &mut P) -> RuntimeResult<()>
    where
        P: WindowProcessor + ?Sized,
    {
        let mut queue = VecDeque::from([(window.clone(), 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if let Some(limit) = self.options.max_window_bytes {
                let bytes = current.byte_size();
                if bytes > limit && current.size() > 1 && depth < self.options.max_split_depth {
                    eg_debug!(win, index = current.index(), bytes, limit, "window over byte limit, splitting");
                    self.enqueue_split(&mut queue, &current, depth, split_count(bytes, limit))?;
                    continue;
                }
            }

            match processor.process(&current) {
                Ok(()) => {
                    eg_debug!(win, index = current.index(), size = current.size(), depth, "window processed");
                }
                Err(ProcessError::TooLarge { estimated, limit }) => {
                    eg_warn!(
                        win,
                        index = current.index(),
                        estimated,
                        limit,
                        depth,
                        "processor rejected window as too large, splitting"
                    );
                    self.enqueue_split(&mut queue, &current, depth, split_count(estimated, limit))?;
                }
                Err(ProcessError::Failed(e)) => {
                    return StructError::from(RuntimeReason::Process)
                        .with_detail(format!(
                            "source {} window {}: {e:#}",
                            self.source,
                            current.index()
                        ))
                        .err();
                }
            }
        }
        Ok(())
    }

    fn enqueue_split<'m>(
        &self,
        queue: &mut VecDeque<(Window<'m>, usize)>,
        window: &Window<'m>,
        depth: usize,
        parts: usize,
    ) -> RuntimeResult<()> {
        if depth >= self.options.max_split_depth {
            return StructError::from(RuntimeReason::Process)
                .with_detail(format!(
                    "source {} window {}: still too large after {depth} split(s)",
                    self.source,
                    window.index()
                ))
                .err();
        }
        if window.size() < 2 {
            return StructError::from(RuntimeReason::Process)
                .with_detail(format!(
                    "source {} window {}: a single message is too large to process",
                    self.source,
                    window.index()
                ))
                .err();
        }

        let parts = split_window(window, parts).map_err(from_core)?;
        for part in parts.into_iter().rev() {
            queue.push_front((part, depth + 1));
        }
        Ok(())
    }
}

/// `max_windows = 0` means no limit.
pub(crate) fn window_limit(max_windows: usize) -> usize {
    match max_windows {
        0 => usize::MAX,
        n => n,
    }
}

/// `max(2, ceil(amount / limit))`.
fn split_count(amount: usize, limit: usize) -> usize {
    if limit == 0 {
        return 2;
    }
    amount.div_ceil(limit).max(2)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
