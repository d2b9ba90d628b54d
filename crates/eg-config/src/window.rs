use serde::{Deserialize, Serialize};

use crate::types::{HumanDuration, StepUnit};

pub const DEFAULT_STEP_SIZE: i64 = 100;
pub const DEFAULT_OVERLAP_RATIO: f64 = 0.2;

// ---------------------------------------------------------------------------
// WindowSpec: deserialized from [windowing]
// ---------------------------------------------------------------------------

/// Unvalidated windowing settings as written in the config file.
///
/// `step_size` is kept signed so that a negative value reaches the windower
/// and is rejected there as an invalid configuration rather than failing
/// deserialization with an opaque type error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowSpec {
    pub step_unit: StepUnit,
    pub step_size: i64,
    pub overlap_ratio: f64,
    /// Cap on the span of a single window. Only meaningful for `hours` and
    /// `days`.
    pub max_window_time: Option<HumanDuration>,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            step_unit: StepUnit::Messages,
            step_size: DEFAULT_STEP_SIZE,
            overlap_ratio: DEFAULT_OVERLAP_RATIO,
            max_window_time: None,
        }
    }
}

impl WindowSpec {
    pub fn new(step_unit: StepUnit, step_size: i64) -> Self {
        Self {
            step_unit,
            step_size,
            overlap_ratio: 0.0,
            max_window_time: None,
        }
    }

    pub fn with_overlap(mut self, ratio: f64) -> Self {
        self.overlap_ratio = ratio;
        self
    }

    pub fn with_max_window_time(mut self, cap: HumanDuration) -> Self {
        self.max_window_time = Some(cap);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
