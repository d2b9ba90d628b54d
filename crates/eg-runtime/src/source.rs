use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use eg_core::message::{Message, sort_messages};
use orion_error::prelude::*;

use crate::error::{RuntimeReason, RuntimeResult};

/// Read a JSON Lines export: one `{"timestamp", "author_id", "text"}` object
/// per line. Blank lines are skipped; the result is stably sorted by
/// timestamp.
pub fn read_messages(path: &Path) -> RuntimeResult<Vec<Message>> {
    let file = File::open(path).map_err(|e| {
        StructError::from(RuntimeReason::Input).with_detail(format!("open {}: {e}", path.display()))
    })?;

    let mut messages = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            StructError::from(RuntimeReason::Input)
                .with_detail(format!("read {}: {e}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let message: Message = serde_json::from_str(&line).map_err(|e| {
            StructError::from(RuntimeReason::Input)
                .with_detail(format!("{}:{}: {e}", path.display(), idx + 1))
        })?;
        messages.push(message);
    }

    sort_messages(&mut messages);
    eg_debug!(src, path = %path.display(), messages = messages.len(), "input loaded");
    Ok(messages)
}

/// Keep messages whose UTC calendar date falls in `[from, to]`; open bounds
/// are unbounded.
pub fn filter_date_range(
    messages: Vec<Message>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<Message> {
    if from.is_none() && to.is_none() {
        return messages;
    }
    let before = messages.len();
    let kept: Vec<Message> = messages
        .into_iter()
        .filter(|m| {
            let day = m.timestamp.date_naive();
            from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
        })
        .collect();
    eg_debug!(
        src,
        kept = kept.len(),
        dropped = before - kept.len(),
        "date range applied"
    );
    kept
}
