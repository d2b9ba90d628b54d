use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use eg_config::{PipelineConfig, SourceConfig};
use eg_core::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, resume_filter};
use eg_core::message::Message;
use eg_core::window::Windower;
use orion_error::op_context;
use orion_error::prelude::*;
use serde::Serialize;

use crate::driver::{DriverOptions, RunReport, WindowDriver, window_limit};
use crate::error::{RuntimeReason, RuntimeResult, from_core};
use crate::processor::WindowProcessor;
use crate::source::{filter_date_range, read_messages};

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Validated, path-resolved pipeline: one windower per source plus the
/// shared checkpoint store.
pub struct Pipeline {
    sources: Vec<BoundSource>,
    store: FileCheckpointStore,
    max_window_bytes: Option<usize>,
    max_split_depth: usize,
}

struct BoundSource {
    config: SourceConfig,
    windower: Windower,
}

/// One window as `plan` reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowSummary {
    pub index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub size: usize,
    pub overlap: usize,
    pub bytes: usize,
}

impl Pipeline {
    /// Build every source's windower (surfacing invalid windowing settings
    /// as `InvalidConfiguration`) and resolve relative paths against
    /// `base_dir`, normally the config file's directory.
    #[tracing::instrument(name = "pipeline.bootstrap", skip_all, fields(sources = config.sources.len()))]
    pub fn bootstrap(config: PipelineConfig, base_dir: &Path) -> RuntimeResult<Self> {
        let mut op = op_context!("pipeline-bootstrap").with_auto_log();
        op.record("base_dir", base_dir.display().to_string().as_str());

        let mut sources = Vec::with_capacity(config.sources.len());
        for mut source in config.sources {
            let windower = Windower::new(&source.windowing).map_err(|e| {
                StructError::from(RuntimeReason::Core(e.reason().clone()))
                    .with_detail(format!("source {:?}: {e}", source.name))
            })?;
            source.input = resolve(base_dir, &source.input);
            eg_debug!(
                conf,
                source = %source.name,
                input = %source.input.display(),
                policy = %windower.policy(),
                checkpoint = source.checkpoint_enabled,
                "source bound"
            );
            sources.push(BoundSource {
                config: source,
                windower,
            });
        }

        let checkpoint_dir = resolve(base_dir, &config.pipeline.checkpoint_dir);
        eg_info!(
            sys,
            sources = sources.len(),
            checkpoint_dir = %checkpoint_dir.display(),
            "pipeline bootstrap complete"
        );
        op.mark_suc();
        Ok(Self {
            sources,
            store: FileCheckpointStore::new(checkpoint_dir),
            max_window_bytes: config.pipeline.max_window_bytes.map(|b| b.as_bytes()),
            max_split_depth: config.pipeline.max_split_depth,
        })
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.config.name.as_str())
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.find(name).ok().map(|s| &s.config)
    }

    pub fn store(&self) -> &FileCheckpointStore {
        &self.store
    }

    /// Messages of `name` after date filtering, before resume filtering.
    pub fn load_messages(&self, name: &str) -> RuntimeResult<Vec<Message>> {
        let source = &self.find(name)?.config;
        let messages = read_messages(&source.input)?;
        Ok(filter_date_range(messages, source.from_date, source.to_date))
    }

    /// Windows the next `run_source` would process, without processing
    /// anything or touching the checkpoint.
    pub fn plan(&self, name: &str) -> RuntimeResult<Vec<WindowSummary>> {
        let bound = self.find(name)?;
        let messages = self.load_messages(name)?;
        let checkpoint = if bound.config.checkpoint_enabled {
            self.store.load(name)
        } else {
            None
        };
        let skipped = messages.len() - resume_filter(&messages, checkpoint.as_ref()).len();

        Ok(bound
            .windower
            .windows_from(&messages, skipped)
            .take(window_limit(bound.config.max_windows))
            .map(|w| WindowSummary {
                index: w.index(),
                start_time: w.start_time(),
                end_time: w.end_time(),
                size: w.size(),
                overlap: w.overlap(),
                bytes: w.byte_size(),
            })
            .collect())
    }

    pub fn run_source<P>(&self, name: &str, processor: &mut P) -> RuntimeResult<RunReport>
    where
        P: WindowProcessor + ?Sized,
    {
        let bound = self.find(name)?;
        let messages = self.load_messages(name)?;
        let options = DriverOptions {
            max_windows: bound.config.max_windows,
            max_window_bytes: self.max_window_bytes,
            max_split_depth: self.max_split_depth,
            checkpoint: bound.config.checkpoint_enabled,
        };
        WindowDriver::new(name, bound.windower, options, &self.store).run(&messages, processor)
    }

    /// Run every source in name order, building a processor per source.
    /// Stops at the first failing source.
    pub fn run_all<P, F>(&self, mut make_processor: F) -> RuntimeResult<Vec<RunReport>>
    where
        P: WindowProcessor,
        F: FnMut(&str) -> P,
    {
        let mut reports = Vec::with_capacity(self.sources.len());
        for name in self.source_names() {
            let mut processor = make_processor(name);
            reports.push(self.run_source(name, &mut processor)?);
        }
        Ok(reports)
    }

    pub fn checkpoint(&self, name: &str) -> RuntimeResult<Option<Checkpoint>> {
        self.find(name)?;
        Ok(self.store.load(name))
    }

    /// Delete the checkpoint of `name`; the next run starts from scratch.
    pub fn reset_checkpoint(&self, name: &str) -> RuntimeResult<bool> {
        self.find(name)?;
        let removed = self.store.clear(name).map_err(from_core)?;
        eg_info!(ckpt, source = name, removed, "checkpoint reset");
        Ok(removed)
    }

    fn find(&self, name: &str) -> RuntimeResult<&BoundSource> {
        match self.sources.iter().find(|s| s.config.name == name) {
            Some(source) => Ok(source),
            None => StructError::from(RuntimeReason::Bootstrap)
                .with_detail(format!("unknown source {name:?}"))
                .err(),
        }
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use eg_core::error::CoreReason;

    fn config(toml: &str) -> PipelineConfig {
        toml.parse().unwrap()
    }

    #[test]
    fn bootstrap_resolves_relative_paths() {
        let cfg = config(
            r#"
[pipeline]
checkpoint_dir = "state"

[source.chat]
input = "in/chat.jsonl"

[source.abs]
input = "/data/abs.jsonl"
"#,
        );
        let pipeline = Pipeline::bootstrap(cfg, Path::new("/srv/eg")).unwrap();
        assert_eq!(pipeline.store().root(), Path::new("/srv/eg/state"));
        assert_eq!(
            pipeline.source("chat").unwrap().input,
            PathBuf::from("/srv/eg/in/chat.jsonl")
        );
        assert_eq!(pipeline.source("abs").unwrap().input, PathBuf::from("/data/abs.jsonl"));
        let names: Vec<_> = pipeline.source_names().collect();
        assert_eq!(names, ["abs", "chat"]);
    }

    #[test]
    fn bootstrap_rejects_invalid_windowing() {
        let cfg = config(
            r#"
[windowing]
step_unit = "messages"
step_size = 0

[source.chat]
input = "chat.jsonl"
"#,
        );
        let err = Pipeline::bootstrap(cfg, Path::new(".")).err().unwrap();
        assert_eq!(err.reason(), &RuntimeReason::Core(CoreReason::InvalidConfiguration));
    }

    #[test]
    fn bootstrap_rejects_time_cap_on_message_unit() {
        let cfg = config(
            r#"
[windowing]
step_unit = "messages"
max_window_time = "2h"

[source.chat]
input = "chat.jsonl"
"#,
        );
        let err = Pipeline::bootstrap(cfg, Path::new(".")).err().unwrap();
        assert_eq!(err.reason(), &RuntimeReason::Core(CoreReason::InvalidConfiguration));
    }

    #[test]
    fn unknown_source_is_reported() {
        let cfg = config("[source.chat]\ninput = \"chat.jsonl\"\n");
        let pipeline = Pipeline::bootstrap(cfg, Path::new(".")).unwrap();
        assert!(pipeline.checkpoint("nope").is_err());
        assert!(pipeline.source("nope").is_none());
    }
}
