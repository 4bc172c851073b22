use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};

use crate::cache::{date_stamp, SnapshotCache};
use crate::config::RunConfig;
use crate::errors::ModelError;
use crate::eval::{build_result, ensure_all, load_schedule, normalize_filter, retained};
use crate::fetch::{DateRange, FetchSource};
use crate::model::Predictor;
use crate::models::PredictionResult;
use crate::teams::TeamDirectory;
use crate::utils::data::{sanitize_test_name, save_results};

/// Which upcoming slate a forward test covers, anchored on the local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardWindow {
    Today,
    Tomorrow,
    Both,
}

impl ForwardWindow {
    pub fn range_from(&self, anchor: NaiveDate) -> DateRange {
        let tomorrow = anchor + Days::new(1);
        let (start, end) = match self {
            ForwardWindow::Today => (anchor, anchor),
            ForwardWindow::Tomorrow => (tomorrow, tomorrow),
            ForwardWindow::Both => (anchor, tomorrow),
        };
        // A one- or two-day window is always a valid range.
        DateRange::new(start, end).expect("forward window spans at most two days")
    }
}

/// A finished forward test: the slate of predictions and where it was
/// persisted. There is no summary — nothing has settled yet, so there is
/// nothing to score.
#[derive(Debug)]
pub struct ForwardRun {
    pub results: Vec<PredictionResult>,
    pub results_path: PathBuf,
}

/// Predicts the upcoming slate. The pipeline is the backtester's up through
/// prediction; the scoring phase does not exist here because future games
/// have no outcomes to score against. Output is grouped by tip-off time
/// instead.
pub struct Forwardtester<'a, P> {
    config: &'a RunConfig,
    directory: &'a TeamDirectory,
    cache: SnapshotCache,
    predictor: &'a P,
    range: DateRange,
    team_filter: Vec<String>,
}

impl<'a, P: Predictor> Forwardtester<'a, P> {
    pub fn new(
        config: &'a RunConfig,
        directory: &'a TeamDirectory,
        predictor: &'a P,
        window: ForwardWindow,
    ) -> Result<Self, ModelError> {
        Self::anchored(config, directory, predictor, window, Local::now().date_naive())
    }

    /// Like `new`, with an explicit anchor date instead of the local clock.
    pub fn anchored(
        config: &'a RunConfig,
        directory: &'a TeamDirectory,
        predictor: &'a P,
        window: ForwardWindow,
        anchor: NaiveDate,
    ) -> Result<Self, ModelError> {
        let team_filter = normalize_filter(directory, &config.teams)?;
        Ok(Self {
            config,
            directory,
            cache: SnapshotCache::new(config.cache_dir()),
            predictor,
            range: window.range_from(anchor),
            team_filter,
        })
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub async fn prepare(&self, source: &dyn FetchSource, force: bool) -> Result<(), ModelError> {
        ensure_all(&self.cache, self.range, source, force, self.config.quiet).await
    }

    /// Predict the slate and persist it under `test_name`.
    pub fn run(&self, test_name: &str) -> Result<ForwardRun, ModelError> {
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

        if results.is_empty() {
            return Err(ModelError::NoResults {
                test_name: test_name.to_string(),
            });
        }

        let results_path = self.results_path(test_name);
        save_results(&results, &results_path)?;
        if !self.config.quiet {
            println!(
                "Forward test results for {} games written to {}",
                results.len(),
                results_path.display()
            );
        }

        if self.config.print_summary && !self.config.quiet {
            self.print_slate(test_name, &results);
        }

        Ok(ForwardRun {
            results,
            results_path,
        })
    }

    fn results_path(&self, test_name: &str) -> PathBuf {
        let stamp = date_stamp(Local::now().date_naive());
        self.config
            .fwdtest_dir()
            .join(format!("{}_{}.json", sanitize_test_name(test_name), stamp))
    }

    /// Print the slate grouped by tip-off time: the underdog's moneyline
    /// and spread, and the projected total, per game.
    fn print_slate(&self, test_name: &str, results: &[PredictionResult]) {
        println!();
        println!("\t==================================================");
        println!("\tPredictions Summary: {}", test_name);
        println!("\t==================================================");
        println!("\tStart date:\t{}", self.range.start);
        println!("\tEnd date:\t{}", self.range.end);
        let teams = if self.team_filter.is_empty() {
            "(all)".to_string()
        } else {
            self.team_filter.join(", ")
        };
        println!("\tTeams:\t\t{}", teams);

        let mut times: Vec<&str> = results.iter().map(|r| r.game.game_time.as_str()).collect();
        times.sort_unstable();
        times.dedup();

        for time in times {
            println!();
            println!("{}:", time);
            println!("--------------");

            let mut window: Vec<&PredictionResult> = results
                .iter()
                .filter(|r| r.game.game_time == time)
                .collect();
            window.sort_by(|a, b| a.game.away_team.cmp(&b.game.away_team));

            for result in window {
                let game = &result.game;
                let matchup = format!("{} @ {}:", game.away_team, game.home_team);

                let (dog_spread, dog_moneyline) =
                    if result.predicted_away_points < result.predicted_home_points {
                        (
                            format!("{} (+{})", game.away_team, result.predicted_away_spread),
                            format!("{} ({:+})", game.away_team, result.predicted_away_moneyline),
                        )
                    } else {
                        (
                            format!("{} (+{})", game.home_team, -result.predicted_away_spread),
                            format!("{} ({:+})", game.home_team, result.predicted_home_moneyline),
                        )
                    };

                println!(
                    "{:28}\t| {:24}\t| {:24}\t| T: {}",
                    matchup, dog_moneyline, dog_spread, result.predicted_total
                );
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Game;
    use serde_json::json;
    use std::collections::HashMap;

    struct FixedPredictor(f64, f64);

    impl Predictor for FixedPredictor {
        fn predict(&self, _game: &Game) -> Result<(f64, f64), ModelError> {
            Ok((self.0, self.1))
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

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 11).unwrap()
    }

    #[test]
    fn test_window_ranges() {
        let a = anchor();
        let tomorrow = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();

        let today = ForwardWindow::Today.range_from(a);
        assert_eq!((today.start, today.end), (a, a));

        let tom = ForwardWindow::Tomorrow.range_from(a);
        assert_eq!((tom.start, tom.end), (tomorrow, tomorrow));

        let both = ForwardWindow::Both.range_from(a);
        assert_eq!((both.start, both.end), (a, tomorrow));
    }

    #[test]
    fn test_run_predicts_unsettled_slate() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::new(dir.path());
        config.quiet = true;
        config.print_summary = false;
        let directory = directory(&["Duke", "Kansas"]);

        SnapshotCache::new(config.cache_dir())
            .write(
                "schedule",
                "20250111",
                &[json!({
                    "game_date": "2025-01-11",
                    "game_time": "9:30 PM",
                    "away_team": "Duke",
                    "home_team": "Kansas",
                    "neutral_site": true,
                    "away_points": null,
                    "home_points": null
                })],
            )
            .unwrap();

        let predictor = FixedPredictor(74.3, 71.9);
        let tester = Forwardtester::anchored(
            &config,
            &directory,
            &predictor,
            ForwardWindow::Today,
            anchor(),
        )
        .unwrap();
        let run = tester.run("slate").unwrap();

        assert_eq!(run.results.len(), 1);
        let result = &run.results[0];
        assert_eq!(result.predicted_away_points, 74.3);
        assert_eq!(result.predicted_away_spread, -2.4);
        // Away side projects higher, so the home side is the dog.
        assert!(result.predicted_home_moneyline > 0);
        assert!(run
            .results_path
            .starts_with(config.fwdtest_dir()));
    }

    #[test]
    fn test_empty_slate_is_no_schedule_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::new(dir.path());
        config.quiet = true;
        let directory = directory(&["Duke", "Kansas"]);
        SnapshotCache::new(config.cache_dir())
            .write("schedule", "20250112", &[])
            .unwrap();

        let predictor = FixedPredictor(70.0, 70.0);
        let tester = Forwardtester::anchored(
            &config,
            &directory,
            &predictor,
            ForwardWindow::Tomorrow,
            anchor(),
        )
        .unwrap();
        let err = tester.run("slate").unwrap_err();
        assert!(matches!(err, ModelError::NoScheduleData { .. }));
    }
}
