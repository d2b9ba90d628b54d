use std::fmt;

use chrono::TimeDelta;
use eg_config::{HumanDuration, StepUnit, WindowSpec};
use orion_error::prelude::*;

use crate::error::{CoreReason, CoreResult};

// Absorbs float noise such as `0.29 * 100.0 == 28.999999999999996`.
const RATIO_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// WindowPolicy
// ---------------------------------------------------------------------------

/// Validated windowing policy: one variant per way of advancing through a
/// message sequence.
///
/// `step` is how far the fresh part of each window reaches; `overlap` is how
/// much of the predecessor is carried into the next window for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// `step` messages per window, `overlap` messages repeated.
    Messages { step: usize, overlap: usize },
    /// `step` of wall-clock time per window, `overlap` of time repeated.
    Elapsed { step: TimeDelta, overlap: TimeDelta },
    /// Up to `step` bytes of fresh text per window, at most `overlap` bytes
    /// repeated.
    Bytes { step: usize, overlap: usize },
}

impl WindowPolicy {
    /// Validate `spec` and derive the concrete step and overlap.
    ///
    /// For `hours` / `days` with a `max_window_time` cap the step is reduced
    /// up front so that `step * (1 + overlap_ratio)` fits in the cap; windows
    /// never need to be split after the fact to honour it.
    pub fn from_spec(spec: &WindowSpec) -> CoreResult<Self> {
        if spec.step_size <= 0 {
            return invalid(format!(
                "step_size must be positive, got {}",
                spec.step_size
            ));
        }

        let ratio = spec.overlap_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return invalid(format!("overlap_ratio must be in [0, 1), got {ratio}"));
        }

        if let Some(cap) = spec.max_window_time {
            if !spec.step_unit.is_elapsed() {
                return invalid(format!(
                    "max_window_time ({cap}) cannot be enforced for step_unit \"{}\"; \
                     use hours or days",
                    spec.step_unit
                ));
            }
            if cap.is_zero() {
                return invalid("max_window_time must be greater than zero");
            }
        }

        match spec.step_unit {
            StepUnit::Messages => {
                let step = count_step(spec.step_size)?;
                Ok(Self::Messages {
                    step,
                    overlap: scale_count(step, ratio),
                })
            }
            StepUnit::Bytes => {
                let step = count_step(spec.step_size)?;
                Ok(Self::Bytes {
                    step,
                    overlap: scale_count(step, ratio),
                })
            }
            StepUnit::Hours | StepUnit::Days => {
                let nominal = if spec.step_unit == StepUnit::Days {
                    TimeDelta::try_days(spec.step_size)
                } else {
                    TimeDelta::try_hours(spec.step_size)
                };
                let nominal = match nominal {
                    Some(d) => d,
                    None => {
                        return invalid(format!(
                            "step_size {} {} is out of range",
                            spec.step_size, spec.step_unit
                        ));
                    }
                };
                let step = match spec.max_window_time {
                    Some(cap) => capped_step(nominal, cap, ratio)?,
                    None => nominal,
                };
                let overlap_ms = scale_millis(step.num_milliseconds(), ratio);
                Ok(Self::Elapsed {
                    step,
                    overlap: TimeDelta::milliseconds(overlap_ms),
                })
            }
        }
    }

    pub fn has_overlap(&self) -> bool {
        match self {
            Self::Messages { overlap, .. } | Self::Bytes { overlap, .. } => *overlap > 0,
            Self::Elapsed { overlap, .. } => !overlap.is_zero(),
        }
    }
}

impl fmt::Display for WindowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Messages { step, overlap } => write!(f, "{step} messages (+{overlap} overlap)"),
            Self::Elapsed { step, overlap } => write!(
                f,
                "{}s elapsed (+{}s overlap)",
                step.num_seconds(),
                overlap.num_seconds()
            ),
            Self::Bytes { step, overlap } => write!(f, "{step} bytes (+{overlap} overlap)"),
        }
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn invalid<T>(detail: impl Into<String>) -> CoreResult<T> {
    StructError::from(CoreReason::InvalidConfiguration)
        .with_detail(detail.into())
        .err()
}

fn count_step(step_size: i64) -> CoreResult<usize> {
    match usize::try_from(step_size) {
        Ok(step) => Ok(step),
        Err(_) => invalid(format!("step_size {step_size} is out of range")),
    }
}

fn scale_count(step: usize, ratio: f64) -> usize {
    (step as f64 * ratio + RATIO_EPSILON).floor() as usize
}

fn scale_millis(step_ms: i64, ratio: f64) -> i64 {
    (step_ms as f64 * ratio + RATIO_EPSILON).floor() as i64
}

/// Shrink `nominal` so that the overlap-extended span fits inside `cap`.
fn capped_step(nominal: TimeDelta, cap: HumanDuration, ratio: f64) -> CoreResult<TimeDelta> {
    let cap_ms = match i64::try_from(cap.as_duration().as_millis()) {
        Ok(ms) => ms,
        Err(_) => return invalid(format!("max_window_time {cap} is out of range")),
    };
    let growth = 1.0 + ratio;
    if nominal.num_milliseconds() as f64 * growth <= cap_ms as f64 {
        return Ok(nominal);
    }

    let effective_ms = (cap_ms as f64 / growth).floor() as i64;
    if effective_ms <= 0 {
        return invalid(format!(
            "max_window_time {cap} leaves no room for a step at overlap_ratio {ratio}"
        ));
    }
    let effective = TimeDelta::milliseconds(effective_ms);
    log::info!(
        "max_window_time {cap} reduces the window step from {}s to {}s",
        nominal.num_seconds(),
        effective.num_seconds()
    );
    Ok(effective)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
