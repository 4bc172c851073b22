use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a team's offensive/defensive efficiency numbers come from.
///
/// `Season` reads the season-to-date column only. `Blended` mixes the season
/// column with the last-3-games column; backtests across several window
/// lengths consistently favor a 95/5 blend, so that is the default blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EfficiencySource {
    Season,
    Blended {
        season_weight: f64,
        recent_weight: f64,
    },
}

impl EfficiencySource {
    pub fn blended() -> Self {
        EfficiencySource::Blended {
            season_weight: 0.95,
            recent_weight: 0.05,
        }
    }
}

impl Default for EfficiencySource {
    fn default() -> Self {
        EfficiencySource::Season
    }
}

/// Empirically tuned model constants, named and overridable rather than
/// buried as literals in the prediction formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelTuning {
    /// Points added to the home team's projection on non-neutral courts.
    pub home_advantage: f64,
    /// Exponent for the pythagorean win-probability transform (NCAAB value).
    pub pythagorean_exponent: f64,
    /// League-average points per 100 possessions, used to scale efficiency
    /// matchups back into points.
    pub league_avg_efficiency: f64,
    /// Points docked from the away team per hour of time-zone offset
    /// traveled. Only applied when geographic data is available.
    pub travel_penalty_per_zone: f64,
}

impl Default for ModelTuning {
    fn default() -> Self {
        Self {
            home_advantage: 3.09,
            pythagorean_exponent: 10.25,
            league_avg_efficiency: 104.6,
            travel_penalty_per_zone: 0.4,
        }
    }
}

/// Immutable run configuration, constructed once at startup and passed by
/// reference to every component that needs it.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root of the on-disk data tree (cache snapshots, team maps, results).
    pub data_dir: PathBuf,
    /// Suppress progress and summary printing. Never affects stored results.
    pub quiet: bool,
    /// Print the aggregate summary table at the end of a run.
    pub print_summary: bool,
    /// Optional team filter; empty means every game in the range.
    pub teams: Vec<String>,
    /// Minimum number of predicted games for a run to count as producing
    /// results. 1 by default; stricter callers set 2 so a single-game run
    /// cannot masquerade as a meaningful backtest.
    pub min_predicted_games: usize,
    pub efficiency_source: EfficiencySource,
    pub tuning: ModelTuning,
}

impl RunConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            quiet: false,
            print_summary: true,
            teams: Vec::new(),
            min_predicted_games: 1,
            efficiency_source: EfficiencySource::default(),
            tuning: ModelTuning::default(),
        }
    }

    /// Directory holding the static team name lists and cross-site maps.
    pub fn teams_dir(&self) -> PathBuf {
        self.data_dir.join("teams").join("json")
    }

    /// Root of the scraped snapshot cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("teamrankings")
    }

    /// Directory for backtest result files.
    pub fn backtest_dir(&self) -> PathBuf {
        self.data_dir.join("backtest").join("json")
    }

    /// Directory for forward-test result files.
    pub fn fwdtest_dir(&self) -> PathBuf {
        self.data_dir.join("fwdtest").join("json")
    }
}
