use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::pipeline::PipelineDefaults;
use crate::types::{HumanDuration, StepUnit};
use crate::window::WindowSpec;

// ---------------------------------------------------------------------------
// SourceOverride: deserialized from [source.<name>]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceOverride {
    /// JSONL message export. Relative to the config file's directory.
    pub input: PathBuf,
    pub step_unit: Option<StepUnit>,
    pub step_size: Option<i64>,
    pub overlap_ratio: Option<f64>,
    pub max_window_time: Option<HumanDuration>,
    pub max_windows: Option<usize>,
    /// Inclusive, UTC.
    pub from_date: Option<NaiveDate>,
    /// Inclusive, UTC.
    pub to_date: Option<NaiveDate>,
    pub checkpoint_enabled: Option<bool>,
}

// ---------------------------------------------------------------------------
// SourceConfig: fully resolved per-source configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub input: PathBuf,
    pub windowing: WindowSpec,
    /// `0` means no limit.
    pub max_windows: usize,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub checkpoint_enabled: bool,
}

impl SourceOverride {
    /// Resolve against the `[windowing]` spec and `[pipeline]` defaults.
    ///
    /// A source that picks its own `step_unit` does not inherit
    /// `max_window_time`: a time cap carried over into a `messages` or
    /// `bytes` source is an invalid combination, not a default.
    pub fn resolve(
        self,
        name: String,
        windowing: &WindowSpec,
        defaults: &PipelineDefaults,
    ) -> SourceConfig {
        let max_window_time = match self.step_unit {
            Some(_) => self.max_window_time,
            None => self.max_window_time.or(windowing.max_window_time),
        };

        SourceConfig {
            name,
            input: self.input,
            windowing: WindowSpec {
                step_unit: self.step_unit.unwrap_or(windowing.step_unit),
                step_size: self.step_size.unwrap_or(windowing.step_size),
                overlap_ratio: self.overlap_ratio.unwrap_or(windowing.overlap_ratio),
                max_window_time,
            },
            max_windows: self.max_windows.unwrap_or(defaults.max_windows),
            from_date: self.from_date,
            to_date: self.to_date,
            checkpoint_enabled: self
                .checkpoint_enabled
                .unwrap_or(defaults.checkpoint_enabled),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
