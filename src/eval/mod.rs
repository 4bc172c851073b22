pub mod aggregate;
pub mod backtest;
pub mod forward;

pub use aggregate::{beats_market, summarize, BacktestSummary, DayRecord, MarketSummary};
pub use backtest::{BacktestRun, Backtester};
pub use forward::{ForwardRun, ForwardWindow, Forwardtester};

use crate::cache::{date_stamp, SnapshotCache};
use crate::config::ModelTuning;
use crate::errors::ModelError;
use crate::fetch::{DataFetchOrchestrator, DateRange, FetchSource};
use crate::models::{Category, Game, PredictionResult};
use crate::teams::{NamingSystem, TeamDirectory};
use crate::utils::odds::{probability_to_american, pythagorean_win_pct, round1};

/// Bring every category's snapshots up to date for the whole range.
pub(crate) async fn ensure_all(
    cache: &SnapshotCache,
    range: DateRange,
    source: &dyn FetchSource,
    force: bool,
    quiet: bool,
) -> Result<(), ModelError> {
    let orchestrator = DataFetchOrchestrator::new(cache);
    for category in Category::all() {
        if !quiet {
            println!(
                "Preparing {} data for {} through {}",
                category, range.start, range.end
            );
        }
        orchestrator.ensure(category, range, source, force).await?;
    }
    Ok(())
}

/// Load schedule snapshots for every date in the range, ascending, into one
/// collection of games.
pub(crate) fn load_schedule(
    cache: &SnapshotCache,
    range: DateRange,
) -> Result<Vec<Game>, ModelError> {
    let mut games = Vec::new();
    for date in range.days() {
        let stamp = date_stamp(date);
        let snapshot = cache.read(
            Category::Schedule.as_str(),
            &stamp,
            Category::Schedule.required_field(),
        )?;
        for record in snapshot.records {
            let game: Game =
                serde_json::from_value(record).map_err(|e| ModelError::SnapshotParse {
                    path: cache.path(Category::Schedule.as_str(), &stamp),
                    reason: e.to_string(),
                })?;
            games.push(game);
        }
    }
    Ok(games)
}

/// Normalize a configured team filter to sportsbook names. An unknown team
/// is a fatal error: the caller asked for something that does not exist.
pub(crate) fn normalize_filter(
    directory: &TeamDirectory,
    teams: &[String],
) -> Result<Vec<String>, ModelError> {
    teams
        .iter()
        .map(|team| directory.normalize(team, NamingSystem::Sportsbook))
        .collect()
}

/// Keep a game when no filter is set, or when either side normalizes into
/// the filter set. A side whose name cannot be normalized simply does not
/// match.
pub(crate) fn retained(directory: &TeamDirectory, filter: &[String], game: &Game) -> bool {
    if filter.is_empty() {
        return true;
    }
    [game.away_team.as_str(), game.home_team.as_str()]
        .into_iter()
        .any(|name| {
            directory
                .normalize(name, NamingSystem::Sportsbook)
                .map(|n| filter.contains(&n))
                .unwrap_or(false)
        })
}

/// Attach the derived prediction fields to a game: rounded points, the
/// away spread (home minus away), the total, and moneylines priced off the
/// pythagorean win probability.
pub(crate) fn build_result(
    tuning: &ModelTuning,
    game: Game,
    away_points: f64,
    home_points: f64,
) -> PredictionResult {
    let away_win_pct = pythagorean_win_pct(away_points, home_points, tuning.pythagorean_exponent);
    PredictionResult {
        game,
        predicted_away_points: round1(away_points),
        predicted_home_points: round1(home_points),
        predicted_away_spread: round1(home_points - away_points),
        predicted_total: round1(home_points + away_points),
        predicted_away_moneyline: probability_to_american(away_win_pct),
        predicted_home_moneyline: probability_to_american(1.0 - away_win_pct),
    }
}
