//! The subset of query settings that governs how sets are built.

use clap::{Args, ValueEnum};
use queryplan_errors::{PlanError, PlanResult};
use serde::{Deserialize, Serialize};

/// What to do when a set grows past its configured limits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OverflowMode {
    /// Fail with [`PlanError::SetSizeLimitExceeded`].
    #[default]
    Throw,
    /// Stop inserting, keeping whatever rows made it in before the limit was hit.
    Break,
}

/// Row and byte limits for a single set, with the policy for exceeding them.
///
/// A limit of `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeLimits {
    pub max_rows: u64,
    pub max_bytes: u64,
    pub overflow_mode: OverflowMode,
}

impl SizeLimits {
    pub fn new(max_rows: u64, max_bytes: u64, overflow_mode: OverflowMode) -> Self {
        Self {
            max_rows,
            max_bytes,
            overflow_mode,
        }
    }

    /// Are `rows` and `bytes` both within the limits?
    pub fn soft_check(&self, rows: u64, bytes: u64) -> bool {
        (self.max_rows == 0 || rows <= self.max_rows)
            && (self.max_bytes == 0 || bytes <= self.max_bytes)
    }

    /// Check `rows` and `bytes` against the limits, applying the overflow mode.
    ///
    /// Returns `Ok(true)` if within the limits, and `Ok(false)` if they were exceeded in
    /// [`OverflowMode::Break`].
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::SetSizeLimitExceeded`] if the limits were exceeded in
    /// [`OverflowMode::Throw`].
    pub fn check(&self, rows: u64, bytes: u64) -> PlanResult<bool> {
        if self.soft_check(rows, bytes) {
            return Ok(true);
        }

        match self.overflow_mode {
            OverflowMode::Throw => Err(PlanError::SetSizeLimitExceeded {
                max_rows: self.max_rows,
                rows,
                max_bytes: self.max_bytes,
                bytes,
            }),
            OverflowMode::Break => Ok(false),
        }
    }
}

/// Read-only view of the settings relevant to building sets for `IN`.
///
/// Can be embedded in a command-line parser with `#[command(flatten)]`, or deserialized from a
/// settings document, in which case any missing field takes its default.
#[derive(Debug, Clone, PartialEq, Eq, Args, Serialize, Deserialize)]
#[group(id = "sets")]
#[serde(default)]
pub struct PlannerSettings {
    /// Maximum number of rows in a set built for `IN`. 0 means unlimited.
    #[arg(long, env = "MAX_ROWS_IN_SET", default_value_t = 0)]
    pub max_rows_in_set: u64,

    /// Maximum number of bytes (estimated in-memory size) of a set built for `IN`. 0 means
    /// unlimited.
    #[arg(long, env = "MAX_BYTES_IN_SET", default_value_t = 0)]
    pub max_bytes_in_set: u64,

    /// What to do when a set exceeds `max_rows_in_set` or `max_bytes_in_set`.
    #[arg(long, env = "SET_OVERFLOW_MODE", default_value = "throw", value_enum)]
    pub set_overflow_mode: OverflowMode,

    /// Treat `NULL` as an ordinary value in `IN`, so that `NULL IN (NULL)` is true.
    #[arg(long, env = "TRANSFORM_NULL_IN")]
    pub transform_null_in: bool,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_rows_in_set: 0,
            max_bytes_in_set: 0,
            set_overflow_mode: OverflowMode::Throw,
            transform_null_in: false,
        }
    }
}

impl PlannerSettings {
    pub fn size_limits_for_set(&self) -> SizeLimits {
        SizeLimits::new(
            self.max_rows_in_set,
            self.max_bytes_in_set,
            self.set_overflow_mode,
        )
    }
}
