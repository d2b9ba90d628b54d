use chrono::TimeDelta;
use eg_config::WindowSpec;

use super::policy::WindowPolicy;
use super::view::Window;
use crate::error::CoreResult;
use crate::message::Message;

// ---------------------------------------------------------------------------
// Windower
// ---------------------------------------------------------------------------

/// Splits a time-ordered message slice into consecutive, overlapping windows.
///
/// The fresh parts of the produced windows partition the input in order:
/// every message is fresh in exactly one window, windows never go backwards,
/// and a window starting at index 0 has no overlap prefix.
///
/// Time windows sit on a fixed grid of `step`-long cells counted from the
/// Unix epoch, so the cell a message lands in does not depend on where
/// enumeration started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windower {
    policy: WindowPolicy,
}

impl Windower {
    /// Validate `spec`; configuration problems surface here, before any
    /// message is read.
    pub fn new(spec: &WindowSpec) -> CoreResult<Self> {
        Ok(Self::from_policy(WindowPolicy::from_spec(spec)?))
    }

    pub fn from_policy(policy: WindowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    /// Lazily window `messages`. Empty input yields no windows.
    pub fn windows<'a>(&self, messages: &'a [Message]) -> Windows<'a> {
        self.windows_from(messages, 0)
    }

    /// Window `messages[from..]`, drawing overlap prefixes from
    /// `messages[..from]` as an uninterrupted run would have.
    ///
    /// When `from` is the fresh end of some window of `windows(messages)`,
    /// the result equals the windows that followed it (indices restart at 0).
    pub fn windows_from<'a>(&self, messages: &'a [Message], from: usize) -> Windows<'a> {
        Windows {
            policy: self.policy,
            messages,
            next_index: 0,
            cursor: from.min(messages.len()),
            prev_start: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Windows iterator
// ---------------------------------------------------------------------------

/// Iterator returned by [`Windower::windows`].
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    policy: WindowPolicy,
    messages: &'a [Message],
    next_index: usize,
    /// First message not yet fresh in any window.
    cursor: usize,
    /// Start of the previously emitted window; overlap never reaches past it.
    prev_start: usize,
}

impl<'a> Iterator for Windows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Window<'a>> {
        if self.cursor >= self.messages.len() {
            return None;
        }

        let (start, end) = match self.policy {
            WindowPolicy::Messages { step, overlap } => self.next_by_count(step, overlap),
            WindowPolicy::Elapsed { step, overlap } => self.next_by_time(step, overlap),
            WindowPolicy::Bytes { step, overlap } => self.next_by_bytes(step, overlap),
        };
        // Always make progress, even on out-of-order input.
        let end = end.max(self.cursor + 1);

        let window = Window::new(
            self.next_index,
            start..end,
            self.cursor - start,
            &self.messages[start..end],
        );
        self.next_index += 1;
        self.prev_start = start;
        self.cursor = end;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.messages.len() - self.cursor.min(self.messages.len());
        (usize::from(remaining > 0), Some(remaining))
    }
}

impl Windows<'_> {
    fn next_by_count(&self, step: usize, overlap: usize) -> (usize, usize) {
        let end = self.cursor.saturating_add(step).min(self.messages.len());
        let start = self.cursor.saturating_sub(overlap).max(self.prev_start);
        (start, end)
    }

    /// Fresh part: every pending message in the cursor's grid cell. Empty
    /// cells never produce a window.
    fn next_by_time(&self, step: TimeDelta, overlap: TimeDelta) -> (usize, usize) {
        let pending = &self.messages[self.cursor..];
        let step_ms = step.num_milliseconds().max(1);
        let cell = cell_start(pending[0].timestamp.timestamp_millis(), step_ms);

        let boundary = cell.saturating_add(step_ms);
        let end = self.cursor + pending.partition_point(|m| m.timestamp.timestamp_millis() < boundary);

        let start = if overlap.is_zero() {
            self.cursor
        } else {
            let from = cell.saturating_sub(overlap.num_milliseconds());
            let carried = &self.messages[self.prev_start..self.cursor];
            self.prev_start + carried.partition_point(|m| m.timestamp.timestamp_millis() < from)
        };
        (start, end)
    }

    /// Fresh part packs messages until their total reaches `step`; the
    /// message that crosses it closes the window.
    fn next_by_bytes(&self, step: usize, overlap: usize) -> (usize, usize) {
        let mut end = self.cursor;
        let mut total = 0usize;
        while end < self.messages.len() && total < step {
            total = total.saturating_add(self.messages[end].byte_size());
            end += 1;
        }

        let mut start = self.cursor;
        if overlap > 0 {
            let mut carried = 0usize;
            while start > self.prev_start {
                let size = self.messages[start - 1].byte_size();
                if carried + size > overlap {
                    break;
                }
                carried += size;
                start -= 1;
            }
        }
        (start, end)
    }
}

/// Epoch milliseconds of the grid cell containing `ts_ms`.
fn cell_start(ts_ms: i64, step_ms: i64) -> i64 {
    ts_ms.div_euclid(step_ms).saturating_mul(step_ms)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use eg_config::StepUnit;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// `n` messages one minute apart with 10-byte texts.
    fn minutes(n: usize) -> Vec<Message> {
        (0..n)
            .map(|i| {
                Message::new(
                    base() + TimeDelta::minutes(i as i64),
                    format!("u{}", i % 3),
                    format!("msg-{i:06}"),
                )
            })
            .collect()
    }

    fn at(offsets_min: &[i64]) -> Vec<Message> {
        offsets_min
            .iter()
            .map(|m| Message::new(base() + TimeDelta::minutes(*m), "u", format!("t{m}")))
            .collect()
    }

    fn ranges(windower: &Windower, msgs: &[Message]) -> Vec<std::ops::Range<usize>> {
        windower.windows(msgs).map(|w| w.range()).collect()
    }

    fn windower(spec: WindowSpec) -> Windower {
        Windower::new(&spec).unwrap()
    }

    /// Fresh parts partition the input, in order, and only the first window
    /// lacks overlap.
    fn assert_partition(windower: &Windower, msgs: &[Message]) {
        let mut next_fresh = 0;
        let mut prev_start = 0;
        for (i, w) in windower.windows(msgs).enumerate() {
            let r = w.range();
            assert_eq!(w.index(), i);
            assert!(w.size() >= 1);
            assert_eq!(r.start + w.overlap(), next_fresh, "window {i}");
            assert!(!w.fresh_messages().is_empty(), "window {i} has no fresh messages");
            assert!(r.start >= prev_start);
            if i == 0 {
                assert_eq!(w.overlap(), 0);
            }
            assert_eq!(w.start_time(), w.messages()[0].timestamp);
            assert_eq!(w.end_time(), w.messages()[w.size() - 1].timestamp);
            next_fresh = r.end;
            prev_start = r.start;
        }
        assert_eq!(next_fresh, msgs.len());
    }

    // -- message unit ------------------------------------------------------

    #[test]
    fn message_windows_with_overlap() {
        let msgs = minutes(100);
        let w = windower(WindowSpec::new(StepUnit::Messages, 10).with_overlap(0.2));
        let got = ranges(&w, &msgs);
        assert_eq!(got.len(), 10);
        assert_eq!(got[0], 0..10);
        assert_eq!(got[1], 8..20);
        assert_eq!(got[2], 18..30);
        assert_eq!(got[9], 88..100);
        assert_partition(&w, &msgs);
    }

    #[test]
    fn message_windows_without_overlap_are_disjoint() {
        let msgs = minutes(25);
        let w = windower(WindowSpec::new(StepUnit::Messages, 10));
        assert_eq!(ranges(&w, &msgs), vec![0..10, 10..20, 20..25]);
    }

    #[test]
    fn message_window_overlap_never_reaches_past_previous_start() {
        let msgs = minutes(5);
        let w = windower(WindowSpec::new(StepUnit::Messages, 1).with_overlap(0.9));
        // overlap floors to 0 for step 1
        assert_eq!(ranges(&w, &msgs), vec![0..1, 1..2, 2..3, 3..4, 4..5]);

        let w = windower(WindowSpec::new(StepUnit::Messages, 2).with_overlap(0.5));
        assert_eq!(ranges(&w, &msgs), vec![0..2, 1..4, 3..5]);
        assert_partition(&w, &msgs);
    }

    #[test]
    fn single_message_single_window() {
        let msgs = minutes(1);
        let w = windower(WindowSpec::new(StepUnit::Messages, 10).with_overlap(0.2));
        let all: Vec<_> = w.windows(&msgs).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].size(), 1);
        assert_eq!(all[0].overlap(), 0);
    }

    #[test]
    fn empty_input_yields_nothing() {
        for unit in [StepUnit::Messages, StepUnit::Hours, StepUnit::Bytes] {
            let w = windower(WindowSpec::new(unit, 3).with_overlap(0.3));
            assert_eq!(w.windows(&[]).count(), 0);
        }
    }

    // -- time unit ---------------------------------------------------------

    #[test]
    fn hour_windows_follow_the_clock_grid() {
        // 0:30 .. 3:29, one message per minute
        let msgs: Vec<_> = (30..210).map(|m| at(&[m]).remove(0)).collect();
        let w = windower(WindowSpec::new(StepUnit::Hours, 1));
        let got: Vec<_> = w.windows(&msgs).collect();
        assert_eq!(got.len(), 4);
        assert_eq!(got[0].range(), 0..30);
        assert_eq!(got[0].start_time(), base() + TimeDelta::minutes(30));
        assert_eq!(got[0].end_time(), base() + TimeDelta::minutes(59));
        assert_eq!(got[1].range(), 30..90);
        assert_eq!(got[1].start_time(), base() + TimeDelta::hours(1));
        assert_eq!(got[3].range(), 150..180);
        assert_partition(&w, &msgs);
    }

    #[test]
    fn day_windows_break_at_utc_midnight() {
        let msgs = at(&[60 * 22, 60 * 23, 60 * 25, 60 * 47]);
        let w = windower(WindowSpec::new(StepUnit::Days, 1));
        assert_eq!(ranges(&w, &msgs), vec![0..2, 2..4]);
    }

    #[test]
    fn time_cells_do_not_depend_on_the_first_message() {
        let msgs = at(&[0, 30, 90, 130]);
        let w = windower(WindowSpec::new(StepUnit::Hours, 1));
        assert_eq!(ranges(&w, &msgs), vec![0..2, 2..3, 3..4]);

        // starting from the third message keeps 1:30 and 2:10 apart
        let tail: Vec<_> = w.windows(&msgs[2..]).map(|w| w.range()).collect();
        assert_eq!(tail, vec![0..1, 1..2]);
    }

    #[test]
    fn huge_time_step_does_not_overflow() {
        let msgs = minutes(5);
        for step in [100_000_000, 100_000_000_000] {
            let w = windower(WindowSpec::new(StepUnit::Days, step).with_overlap(0.5));
            assert_eq!(ranges(&w, &msgs), vec![0..5]);
        }

        let early = vec![Message::new(
            Utc.with_ymd_and_hms(1900, 1, 1, 0, 0, 0).unwrap(),
            "u",
            "old",
        )];
        let w = windower(WindowSpec::new(StepUnit::Days, 100_000_000_000));
        assert_eq!(ranges(&w, &early), vec![0..1]);
    }

    #[test]
    fn hour_windows_carry_time_overlap() {
        let msgs = at(&[0, 10, 40, 50, 70, 100, 130]);
        let w = windower(WindowSpec::new(StepUnit::Hours, 1).with_overlap(0.25));
        let got: Vec<_> = w.windows(&msgs).collect();
        // steps [0,60) [60,120) [120,180); overlap 15 minutes back
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].range(), 0..4);
        assert_eq!(got[1].range(), 3..6); // 50 falls in [45, 60)
        assert_eq!(got[1].overlap(), 1);
        assert_eq!(got[2].range(), 6..7); // nothing in [105, 120)
        assert_eq!(got[2].overlap(), 0);
        assert_partition(&w, &msgs);
    }

    #[test]
    fn gaps_skip_empty_steps() {
        let msgs = at(&[0, 5, 60 * 24 * 3, 60 * 24 * 3 + 1]);
        let w = windower(WindowSpec::new(StepUnit::Hours, 1).with_overlap(0.5));
        let got: Vec<_> = w.windows(&msgs).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].range(), 0..2);
        assert_eq!(got[1].range(), 2..4);
        assert_eq!(got[1].overlap(), 0);
        assert_partition(&w, &msgs);
    }

    #[test]
    fn capped_days_respect_max_window_time() {
        let msgs: Vec<_> = (0..(60 * 24 * 6)).step_by(7).map(|m| at(&[m]).remove(0)).collect();
        let cap = TimeDelta::hours(24);
        let w = windower(
            WindowSpec::new(StepUnit::Days, 2)
                .with_overlap(0.2)
                .with_max_window_time("24h".parse().unwrap()),
        );
        let got: Vec<_> = w.windows(&msgs).collect();
        assert!(got.len() > 3);
        for win in &got {
            assert!(
                win.end_time() - win.start_time() <= cap,
                "window {win} exceeds the cap"
            );
        }
        assert_partition(&w, &msgs);
    }

    #[test]
    fn simultaneous_messages_share_a_window() {
        let msgs = at(&[0, 0, 0, 0]);
        let w = windower(WindowSpec::new(StepUnit::Hours, 1).with_overlap(0.5));
        assert_eq!(ranges(&w, &msgs), vec![0..4]);
    }

    // -- byte unit ---------------------------------------------------------

    #[test]
    fn byte_windows_close_once_step_is_reached() {
        let msgs = minutes(10); // 10 bytes each
        let w = windower(WindowSpec::new(StepUnit::Bytes, 35));
        let got: Vec<_> = w.windows(&msgs).collect();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].range(), 0..4);
        assert_eq!(got[1].range(), 4..8);
        assert_eq!(got[2].range(), 8..10);
        for win in &got[..2] {
            assert_eq!(win.fresh_messages().iter().map(Message::byte_size).sum::<usize>(), 40);
        }

        // exactly reaching the step closes the window
        let w = windower(WindowSpec::new(StepUnit::Bytes, 30));
        assert_eq!(ranges(&w, &msgs), vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn byte_overlap_is_bounded() {
        let msgs = minutes(10);
        let w = windower(WindowSpec::new(StepUnit::Bytes, 30).with_overlap(0.5));
        let got: Vec<_> = w.windows(&msgs).collect();
        assert_eq!(got[0].range(), 0..3);
        // overlap budget 15 bytes fits one 10-byte message
        assert_eq!(got[1].range(), 2..6);
        assert_eq!(got[1].overlap(), 1);
        assert_partition(&w, &msgs);
    }

    #[test]
    fn oversized_message_closes_its_window() {
        let mut msgs = minutes(3);
        msgs[1].text = "y".repeat(500);
        let w = windower(WindowSpec::new(StepUnit::Bytes, 25));
        assert_eq!(ranges(&w, &msgs), vec![0..2, 2..3]);

        let mut msgs = minutes(3);
        msgs[0].text = "y".repeat(500);
        assert_eq!(ranges(&w, &msgs), vec![0..1, 1..3]);

        let single = vec![Message::new(base(), "u", "y".repeat(500))];
        let w = windower(WindowSpec::new(StepUnit::Bytes, 100));
        assert_eq!(ranges(&w, &single), vec![0..1]);
    }

    // -- invariants across units ---------------------------------------------

    #[test]
    fn partition_holds_for_every_unit() {
        let mut msgs: Vec<_> = (0..300usize)
            .map(|i| {
                Message::new(
                    base() + TimeDelta::minutes(((i * i) % 997) as i64),
                    "u",
                    "z".repeat(1 + i % 17),
                )
            })
            .collect();
        crate::message::sort_messages(&mut msgs);

        let specs = [
            WindowSpec::new(StepUnit::Messages, 7).with_overlap(0.4),
            WindowSpec::new(StepUnit::Hours, 2).with_overlap(0.3),
            WindowSpec::new(StepUnit::Days, 1).with_overlap(0.9),
            WindowSpec::new(StepUnit::Bytes, 40).with_overlap(0.5),
        ];
        for spec in specs {
            let w = windower(spec);
            assert_partition(&w, &msgs);
        }
    }

    type Shape = (std::ops::Range<usize>, usize, DateTime<Utc>, DateTime<Utc>);

    fn shapes<'a>(windows: impl Iterator<Item = Window<'a>>) -> Vec<Shape> {
        windows
            .map(|w| (w.range(), w.overlap(), w.start_time(), w.end_time()))
            .collect()
    }

    #[test]
    fn resuming_after_any_window_matches_the_full_run() {
        // irregular gaps and sizes
        let mut offset = 0i64;
        let msgs: Vec<_> = (0..160usize)
            .map(|i| {
                offset += (i as i64 * 7) % 23 + 1;
                Message::new(
                    base() + TimeDelta::minutes(offset * 5),
                    "u",
                    "q".repeat(1 + (i * 13) % 29),
                )
            })
            .collect();

        let specs = [
            WindowSpec::new(StepUnit::Messages, 7).with_overlap(0.3),
            WindowSpec::new(StepUnit::Hours, 1).with_overlap(0.25),
            WindowSpec::new(StepUnit::Days, 1).with_overlap(0.5),
            WindowSpec::new(StepUnit::Bytes, 60).with_overlap(0.4),
        ];
        for spec in specs {
            let w = windower(spec);
            let full = shapes(w.windows(&msgs));
            assert!(full.len() > 3, "{}: {} windows", w.policy(), full.len());
            for k in 0..full.len() {
                let resumed = shapes(w.windows_from(&msgs, full[k].0.end));
                assert_eq!(resumed, full[k + 1..].to_vec(), "{} resumed after window {k}", w.policy());
            }
        }
    }

    #[test]
    fn windows_from_past_the_end_is_empty() {
        let msgs = minutes(4);
        let w = windower(WindowSpec::new(StepUnit::Messages, 2));
        assert_eq!(w.windows_from(&msgs, 4).count(), 0);
        assert_eq!(w.windows_from(&msgs, 9).count(), 0);
    }

    #[test]
    fn windows_are_deterministic() {
        let msgs = minutes(57);
        let w = windower(WindowSpec::new(StepUnit::Messages, 6).with_overlap(0.5));
        let a: Vec<_> = w.windows(&msgs).map(|w| w.fingerprint()).collect();
        let b: Vec<_> = w.windows(&msgs).map(|w| w.fingerprint()).collect();
        assert_eq!(a, b);
    }
}
