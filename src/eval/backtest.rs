use std::path::PathBuf;

use chrono::Local;

use crate::cache::{date_stamp, SnapshotCache};
use crate::config::RunConfig;
use crate::errors::ModelError;
use crate::eval::aggregate::{summarize, BacktestSummary, MarketSummary};
use crate::eval::{build_result, ensure_all, load_schedule, normalize_filter, retained};
use crate::fetch::{DateRange, FetchSource};
use crate::model::Predictor;
use crate::models::PredictionResult;
use crate::teams::TeamDirectory;
use crate::utils::data::{sanitize_test_name, save_results};

/// Everything a finished backtest hands back: the per-game results as
/// persisted, where they were persisted, and the aggregate statistics.
#[derive(Debug)]
pub struct BacktestRun {
    pub results: Vec<PredictionResult>,
    pub results_path: PathBuf,
    pub summary: BacktestSummary,
    /// Games loaded from the schedule before filtering and prediction.
    pub scheduled: usize,
}

/// Replays a predictor over a historical date range and scores it against
/// the market.
///
/// A run is single-pass: prepare the caches, load the schedule, predict,
/// persist, aggregate. Bad dates and unpredictable games are skipped along
/// the way; only a run that ends with nothing to show fails.
pub struct Backtester<'a, P> {
    config: &'a RunConfig,
    directory: &'a TeamDirectory,
    cache: SnapshotCache,
    predictor: &'a P,
    range: DateRange,
    /// Team filter normalized to sportsbook names at construction.
    team_filter: Vec<String>,
}

impl<'a, P> std::fmt::Debug for Backtester<'a, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backtester")
            .field("team_filter", &self.team_filter)
            .finish_non_exhaustive()
    }
}

impl<'a, P: Predictor> Backtester<'a, P> {
    /// Validates dates and the team filter up front, before any network
    /// activity: a typo'd date or unknown team aborts here.
    pub fn new(
        config: &'a RunConfig,
        directory: &'a TeamDirectory,
        predictor: &'a P,
        start_date: &str,
        end_date: &str,
    ) -> Result<Self, ModelError> {
        let range = DateRange::parse(start_date, end_date)?;
        let team_filter = normalize_filter(directory, &config.teams)?;

        Ok(Self {
            config,
            directory,
            cache: SnapshotCache::new(config.cache_dir()),
            predictor,
            range,
            team_filter,
        })
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Bring every category's snapshots up to date for the whole range.
    /// Idempotent: on a warm cache this issues zero fetches.
    pub async fn prepare(&self, source: &dyn FetchSource, force: bool) -> Result<(), ModelError> {
        ensure_all(&self.cache, self.range, source, force, self.config.quiet).await
    }

    /// Run the backtest: predict every retained game, persist the results
    /// under `test_name`, and aggregate.
    pub fn run(&self, test_name: &str) -> Result<BacktestRun, ModelError> {
        let games = load_schedule(&self.cache, self.range)?;
        if games.is_empty() {
            return Err(ModelError::NoScheduleData {
                start: self.range.start,
                end: self.range.end,
            });
        }

        let mut results = Vec::new();
        for game in &games {
            if !retained(self.directory, &self.team_filter, game) {
                continue;
            }

            let (away_points, home_points) = match self.predictor.predict(game) {
                Ok(points) => points,
                Err(err) if err.is_skippable() => {
                    // First few days of a season have no efficiency data, and
                    // exhibition opponents are not in the name maps.
                    tracing::debug!("skipping {}: {}", game.matchup(), err);
                    continue;
                }
                Err(err) => return Err(err),
            };

            results.push(build_result(
                &self.config.tuning,
                game.clone(),
                away_points,
                home_points,
            ));
        }

        if results.len() < self.config.min_predicted_games.max(1) {
            return Err(ModelError::NoResults {
                test_name: test_name.to_string(),
            });
        }

        let results_path = self.results_path(test_name);
        save_results(&results, &results_path)?;
        if !self.config.quiet {
            println!(
                "Backtest results for {} games written to {}",
                results.len(),
                results_path.display()
            );
        }

        let summary = summarize(&results);
        if self.config.print_summary && !self.config.quiet {
            self.print_summary(test_name, games.len(), &summary);
        }

        Ok(BacktestRun {
            results,
            results_path,
            summary,
            scheduled: games.len(),
        })
    }

    fn results_path(&self, test_name: &str) -> PathBuf {
        let stamp = date_stamp(Local::now().date_naive());
        self.config
            .backtest_dir()
            .join(format!("{}_{}.json", sanitize_test_name(test_name), stamp))
    }

    fn print_summary(&self, test_name: &str, scheduled: usize, summary: &BacktestSummary) {
        println!();
        println!("\t==================================================");
        println!("\tBacktest Summary: {}", test_name);
        println!("\t==================================================");
        println!("\tStart date:\t{}", self.range.start);
        println!("\tEnd date:\t{}", self.range.end);
        let teams = if self.team_filter.is_empty() {
            "(all)".to_string()
        } else {
            self.team_filter.join(", ")
        };
        println!("\tTeams:\t\t{}", teams);
        println!("\tScheduled:\t{}", scheduled);
        println!("\tPredicted:\t{}", summary.predicted);
        print_market("SPREAD", &summary.spread);
        print_market("OVER/UNDER", &summary.total);
        println!();
    }
}

fn print_market(label: &str, market: &MarketSummary) {
    println!();
    println!("\t{} vs market ({} games):", label, market.compared);
    println!("\t  Record:\t{}", market.record());
    println!("\t  ROI:\t\t{:+.1}%", market.roi);
    println!(
        "\t  RMSE:\t\tmodel {:.2}, market {:.2}",
        market.model_rmse, market.market_rmse
    );
    if let Some((date, rec)) = market.best_day() {
        println!("\t  Best day:\t{} ({}-{})", date, rec.wins, rec.losses);
    }
    if let Some((date, rec)) = market.worst_day() {
        println!("\t  Worst day:\t{} ({}-{})", date, rec.wins, rec.losses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Game;
    use crate::utils::data::load_results;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::HashMap;

    /// Predictor scripted per matchup; anything unscripted is rejected the
    /// way a real model rejects a game it has no data for.
    struct ScriptedPredictor {
        scores: HashMap<(String, String), (f64, f64)>,
    }

    impl ScriptedPredictor {
        fn new(entries: &[(&str, &str, f64, f64)]) -> Self {
            let scores = entries
                .iter()
                .map(|(a, h, ap, hp)| ((a.to_string(), h.to_string()), (*ap, *hp)))
                .collect();
            Self { scores }
        }
    }

    impl Predictor for ScriptedPredictor {
        fn predict(&self, game: &Game) -> Result<(f64, f64), ModelError> {
            self.scores
                .get(&(game.away_team.clone(), game.home_team.clone()))
                .copied()
                .ok_or_else(|| ModelError::PredictionRejected {
                    away: game.away_team.clone(),
                    home: game.home_team.clone(),
                    reason: "not scripted".to_string(),
                })
        }
    }

    fn directory(names: &[&str]) -> TeamDirectory {
        let list: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let identity: HashMap<String, String> =
            list.iter().map(|n| (n.clone(), n.clone())).collect();
        TeamDirectory::from_parts(
            list.clone(),
            list.clone(),
            list,
            identity.clone(),
            identity.clone(),
            identity.clone(),
            identity,
        )
    }

    fn quiet_config(data_dir: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::new(data_dir);
        config.quiet = true;
        config.print_summary = false;
        config
    }

    fn write_schedule(config: &RunConfig, stamp: &str, records: &[serde_json::Value]) {
        SnapshotCache::new(config.cache_dir())
            .write("schedule", stamp, records)
            .unwrap();
    }

    #[test]
    fn test_run_with_one_unlined_game() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let directory = directory(&["Team X", "Team Y"]);
        write_schedule(
            &config,
            "20250111",
            &[json!({
                "game_date": "2025-01-11",
                "game_time": "7:00 PM",
                "away_team": "Team Y",
                "home_team": "Team X",
                "neutral_site": false,
                "away_points": null,
                "home_points": null
            })],
        );

        let predictor = ScriptedPredictor::new(&[("Team Y", "Team X", 70.2, 75.8)]);
        let backtester =
            Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11").unwrap();
        let run = backtester.run("one_game").unwrap();

        assert_eq!(run.results.len(), 1);
        let result = &run.results[0];
        assert_eq!(result.predicted_total, 146.0);
        assert_eq!(result.predicted_away_spread, 5.6);

        // No market line: aggregation skips the game without error.
        assert_eq!(run.summary.spread.compared, 0);
        assert_eq!(run.summary.total.compared, 0);

        // The persisted file round-trips.
        let persisted = load_results(&run.results_path).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].predicted_total, 146.0);
    }

    #[test]
    fn test_run_scores_two_wins_on_one_day() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let directory = directory(&["A", "B", "C", "D"]);
        write_schedule(
            &config,
            "20250111",
            &[
                json!({
                    "game_date": "2025-01-11",
                    "game_time": "6:00 PM",
                    "away_team": "A",
                    "home_team": "B",
                    "neutral_site": false,
                    "away_points": 80,
                    "home_points": 70,
                    "odds": {"spread": {"opening": null, "current": -6.0}}
                }),
                json!({
                    "game_date": "2025-01-11",
                    "game_time": "8:00 PM",
                    "away_team": "C",
                    "home_team": "D",
                    "neutral_site": false,
                    "away_points": 70,
                    "home_points": 76,
                    "odds": {"spread": {"opening": null, "current": 2.0}}
                }),
            ],
        );

        // Model spreads: -8 and +4, both landing with the realized outcome.
        let predictor = ScriptedPredictor::new(&[
            ("A", "B", 79.0, 71.0),
            ("C", "D", 70.0, 74.0),
        ]);
        let backtester =
            Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11").unwrap();
        let run = backtester.run("two_wins").unwrap();

        assert_eq!(run.summary.spread.wins, 2);
        assert_eq!(run.summary.spread.losses, 0);
        let day = NaiveDate::from_ymd_opt(2025, 1, 11).unwrap();
        assert_eq!(run.summary.spread.daily[&day].wins, 2);
        assert!((run.summary.spread.roi - 90.909).abs() < 0.01);
    }

    #[test]
    fn test_empty_schedule_is_no_schedule_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let directory = directory(&["A", "B"]);
        write_schedule(&config, "20250111", &[]);

        let predictor = ScriptedPredictor::new(&[]);
        let backtester =
            Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11").unwrap();
        let err = backtester.run("empty").unwrap_err();
        assert!(matches!(err, ModelError::NoScheduleData { .. }));
    }

    #[test]
    fn test_all_rejected_is_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let directory = directory(&["A", "B"]);
        write_schedule(
            &config,
            "20250111",
            &[json!({
                "game_date": "2025-01-11",
                "game_time": "7:00 PM",
                "away_team": "A",
                "home_team": "B",
                "neutral_site": false,
                "away_points": null,
                "home_points": null
            })],
        );

        let predictor = ScriptedPredictor::new(&[]);
        let backtester =
            Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11").unwrap();
        let err = backtester.run("rejected").unwrap_err();
        assert!(matches!(err, ModelError::NoResults { .. }));
    }

    #[test]
    fn test_team_filter_keeps_only_matching_games() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(dir.path());
        config.teams = vec!["A".to_string()];
        let directory = directory(&["A", "B", "C", "D"]);
        write_schedule(
            &config,
            "20250111",
            &[
                json!({
                    "game_date": "2025-01-11", "game_time": "6:00 PM",
                    "away_team": "A", "home_team": "B", "neutral_site": false,
                    "away_points": null, "home_points": null
                }),
                json!({
                    "game_date": "2025-01-11", "game_time": "8:00 PM",
                    "away_team": "C", "home_team": "D", "neutral_site": false,
                    "away_points": null, "home_points": null
                }),
            ],
        );

        let predictor = ScriptedPredictor::new(&[
            ("A", "B", 75.0, 70.0),
            ("C", "D", 75.0, 70.0),
        ]);
        let backtester =
            Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11").unwrap();
        let run = backtester.run("filtered").unwrap();

        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].game.away_team, "A");
        assert_eq!(run.scheduled, 2);
    }

    #[test]
    fn test_unknown_filter_team_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(dir.path());
        config.teams = vec!["Hogwarts".to_string()];
        let directory = directory(&["A", "B"]);

        let predictor = ScriptedPredictor::new(&[]);
        let err = Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11")
            .unwrap_err();
        assert!(matches!(err, ModelError::TeamNotFound { .. }));
    }

    #[test]
    fn test_invalid_range_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let directory = directory(&["A", "B"]);
        let predictor = ScriptedPredictor::new(&[]);

        let err = Backtester::new(&config, &directory, &predictor, "2024-11-01", "2025-03-01")
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration { .. }));
    }

    #[test]
    fn test_strict_minimum_rejects_single_game_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(dir.path());
        config.min_predicted_games = 2;
        let directory = directory(&["A", "B"]);
        write_schedule(
            &config,
            "20250111",
            &[json!({
                "game_date": "2025-01-11", "game_time": "7:00 PM",
                "away_team": "A", "home_team": "B", "neutral_site": false,
                "away_points": null, "home_points": null
            })],
        );

        let predictor = ScriptedPredictor::new(&[("A", "B", 75.0, 70.0)]);
        let backtester =
            Backtester::new(&config, &directory, &predictor, "2025-01-11", "2025-01-11").unwrap();
        let err = backtester.run("strict").unwrap_err();
        assert!(matches!(err, ModelError::NoResults { .. }));
    }
}
