use std::path::PathBuf;

use chrono::NaiveDate;

/// Error taxonomy for the model, cache, and evaluation pipeline.
///
/// `TeamNotFound` and `PredictionRejected` are per-game failures: the
/// evaluation engine skips the affected game and keeps going. `FetchFailure`
/// is a per-date failure: the orchestrator logs it and moves to the next
/// date. Everything else is fatal to the run that raised it.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("unknown team name: {name}")]
    TeamNotFound { name: String },

    #[error("prediction declined for {away} @ {home}: {reason}")]
    PredictionRejected {
        away: String,
        home: String,
        reason: String,
    },

    /// A cache file exists but cannot be parsed. Deliberately distinct from
    /// a missing file: overwriting a corrupt snapshot could mask an upstream
    /// problem, so the operator has to look at it.
    #[error("corrupt snapshot at {path}: {reason}")]
    SnapshotParse { path: PathBuf, reason: String },

    #[error("fetch failed for {category} on {date}: {reason}")]
    FetchFailure {
        category: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("no schedule data between {start} and {end}")]
    NoScheduleData { start: NaiveDate, end: NaiveDate },

    #[error("test {test_name:?} produced no predictions")]
    NoResults { test_name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Per-game failures the evaluation engine may skip without failing the run.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ModelError::TeamNotFound { .. } | ModelError::PredictionRejected { .. }
        )
    }
}
