use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::logging::LoggingConfig;
use crate::source::{SourceConfig, SourceOverride};
use crate::types::ByteSize;
use crate::validate;
use crate::window::WindowSpec;

pub const DEFAULT_CHECKPOINT_DIR: &str = ".egregora/checkpoints";
pub const DEFAULT_MAX_SPLIT_DEPTH: usize = 5;

// ---------------------------------------------------------------------------
// PipelineDefaults: deserialized from [pipeline]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineDefaults {
    /// Directory holding one checkpoint file per source. Relative to the
    /// config file's directory.
    pub checkpoint_dir: PathBuf,
    /// Incremental processing is opt-in; without it every run starts over.
    pub checkpoint_enabled: bool,
    /// Windows handed to the processor per run. `0` means all of them.
    pub max_windows: usize,
    /// Windows larger than this are split before they reach the processor.
    pub max_window_bytes: Option<ByteSize>,
    /// How many times a single window may be split again.
    pub max_split_depth: usize,
}

impl Default for PipelineDefaults {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
            checkpoint_enabled: false,
            max_windows: 0,
            max_window_bytes: None,
            max_split_depth: DEFAULT_MAX_SPLIT_DEPTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw TOML structure (intermediate representation)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PipelineConfigRaw {
    #[serde(default)]
    pipeline: PipelineDefaults,
    #[serde(default)]
    windowing: WindowSpec,
    #[serde(default)]
    source: HashMap<String, SourceOverride>,
    #[serde(default)]
    logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// PipelineConfig (resolved, validated)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub pipeline: PipelineDefaults,
    pub windowing: WindowSpec,
    /// Sorted by name.
    pub sources: Vec<SourceConfig>,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Read and parse an `egregora.toml` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

impl FromStr for PipelineConfig {
    type Err = anyhow::Error;

    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        let raw: PipelineConfigRaw = toml::from_str(toml_str)?;

        let mut sources: Vec<SourceConfig> = raw
            .source
            .into_iter()
            .map(|(name, ovr)| ovr.resolve(name, &raw.windowing, &raw.pipeline))
            .collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));

        let config = PipelineConfig {
            pipeline: raw.pipeline,
            windowing: raw.windowing,
            sources,
            logging: raw.logging,
        };

        validate::validate(&config)?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use crate::types::{HumanDuration, StepUnit};
    use chrono::NaiveDate;

    const FULL_TOML: &str = r#"
[pipeline]
checkpoint_dir = "state/checkpoints"
checkpoint_enabled = true
max_windows = 0
max_window_bytes = "320KB"
max_split_depth = 3

[windowing]
step_unit = "messages"
step_size = 100
overlap_ratio = 0.2

[source.family]
input = "exports/family.jsonl"
step_unit = "days"
step_size = 2
max_window_time = "36h"
from_date = "2024-01-01"
to_date = "2024-06-30"

[source.book_club]
input = "exports/book_club.jsonl"
max_windows = 3
checkpoint_enabled = false

[logging]
level = "debug"
format = "json"
"#;

    #[test]
    fn load_full_toml() {
        let cfg: PipelineConfig = FULL_TOML.parse().unwrap();

        assert_eq!(cfg.pipeline.checkpoint_dir, PathBuf::from("state/checkpoints"));
        assert!(cfg.pipeline.checkpoint_enabled);
        assert_eq!(
            cfg.pipeline.max_window_bytes,
            Some("320KB".parse::<ByteSize>().unwrap()),
        );
        assert_eq!(cfg.pipeline.max_split_depth, 3);

        // sorted by name
        assert_eq!(cfg.sources.len(), 2);
        let book = &cfg.sources[0];
        assert_eq!(book.name, "book_club");
        assert_eq!(book.windowing.step_unit, StepUnit::Messages);
        assert_eq!(book.windowing.step_size, 100);
        assert_eq!(book.max_windows, 3);
        assert!(!book.checkpoint_enabled);

        let family = cfg.source("family").unwrap();
        assert_eq!(family.input, PathBuf::from("exports/family.jsonl"));
        assert_eq!(family.windowing.step_unit, StepUnit::Days);
        assert_eq!(family.windowing.step_size, 2);
        assert_eq!(family.windowing.overlap_ratio, 0.2);
        assert_eq!(
            family.windowing.max_window_time,
            Some("36h".parse::<HumanDuration>().unwrap()),
        );
        assert_eq!(family.from_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(family.checkpoint_enabled);

        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let cfg: PipelineConfig = r#"
[source.only]
input = "only.jsonl"
"#
        .parse()
        .unwrap();
        assert_eq!(cfg.pipeline.checkpoint_dir, PathBuf::from(DEFAULT_CHECKPOINT_DIR));
        assert!(!cfg.pipeline.checkpoint_enabled);
        assert_eq!(cfg.pipeline.max_split_depth, DEFAULT_MAX_SPLIT_DEPTH);
        assert_eq!(cfg.sources[0].windowing, WindowSpec::default());
        assert_eq!(cfg.sources[0].max_windows, 0);
    }

    #[test]
    fn missing_input_fails() {
        let toml = r#"
[source.broken]
step_size = 10
"#;
        assert!(toml.parse::<PipelineConfig>().is_err());
    }

    #[test]
    fn unknown_step_unit_fails() {
        let toml = FULL_TOML.replace(r#"step_unit = "days""#, r#"step_unit = "weeks""#);
        assert!(toml.parse::<PipelineConfig>().is_err());
    }

    #[test]
    fn bad_date_fails() {
        let toml = FULL_TOML.replace("2024-06-30", "2024-06-31");
        assert!(toml.parse::<PipelineConfig>().is_err());
    }

    #[test]
    fn load_from_disk_reports_path() {
        let err = PipelineConfig::load("/definitely/not/here/egregora.toml").unwrap_err();
        assert!(err.to_string().contains("egregora.toml"), "{err}");
    }
}
