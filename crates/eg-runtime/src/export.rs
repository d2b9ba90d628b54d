use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use eg_core::message::Message;
use eg_core::window::Window;
use serde::Serialize;

use crate::processor::{ProcessError, WindowProcessor};

/// Writes each window as a pretty JSON document to
/// `<out>/<source>/window-<seq>.json`.
///
/// Numbering continues after the highest sequence already in the directory,
/// so resumed runs append instead of overwriting.
pub struct WindowExporter {
    source: String,
    dir: PathBuf,
    next_seq: Option<usize>,
    last_index: Option<usize>,
    part: usize,
    written: Vec<PathBuf>,
}

#[derive(Serialize)]
struct ExportedWindow<'a> {
    source: &'a str,
    window_index: usize,
    part: usize,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    size: usize,
    overlap: usize,
    fingerprint: String,
    messages: &'a [Message],
}

impl WindowExporter {
    pub fn new(out_root: &Path, source: &str) -> Self {
        Self {
            source: source.to_string(),
            dir: out_root.join(source),
            next_seq: None,
            last_index: None,
            part: 0,
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn claim_seq(&mut self) -> anyhow::Result<usize> {
        let seq = match self.next_seq {
            Some(seq) => seq,
            None => {
                fs::create_dir_all(&self.dir)
                    .with_context(|| format!("create export dir {}", self.dir.display()))?;
                next_free_seq(&self.dir)?
            }
        };
        self.next_seq = Some(seq + 1);
        Ok(seq)
    }
}

impl WindowProcessor for WindowExporter {
    fn process(&mut self, window: &Window<'_>) -> Result<(), ProcessError> {
        // Split parts arrive back to back with their parent's index.
        self.part = match self.last_index {
            Some(prev) if prev == window.index() => self.part + 1,
            _ => 0,
        };
        self.last_index = Some(window.index());

        let doc = ExportedWindow {
            source: &self.source,
            window_index: window.index(),
            part: self.part,
            start_time: window.start_time(),
            end_time: window.end_time(),
            size: window.size(),
            overlap: window.overlap(),
            fingerprint: window.fingerprint(),
            messages: window.messages(),
        };
        let json = serde_json::to_vec_pretty(&doc).context("serialize window")?;

        let seq = self.claim_seq()?;
        let path = self.dir.join(format!("window-{seq:05}.json"));
        fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
        eg_debug!(win, path = %path.display(), "window exported");
        self.written.push(path);
        Ok(())
    }
}

/// One past the largest `window-<seq>.json` in `dir`, 0 when there is none.
fn next_free_seq(dir: &Path) -> anyhow::Result<usize> {
    let mut next = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("list {}", dir.display()))? {
        let name = entry?.file_name();
        let seq = name
            .to_str()
            .and_then(|n| n.strip_prefix("window-"))
            .and_then(|n| n.strip_suffix(".json"))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(seq) = seq {
            next = next.max(seq + 1);
        }
    }
    Ok(next)
}
