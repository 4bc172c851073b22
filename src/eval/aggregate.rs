use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::PredictionResult;
use crate::utils::odds::fixed_vig_roi;

/// Win/loss tally for a single day of decided bets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayRecord {
    pub wins: u32,
    pub losses: u32,
}

/// How the model did against one market (spread or total) over a run.
#[derive(Debug, Clone, Default)]
pub struct MarketSummary {
    /// Games that had both a market line and a settled outcome.
    pub compared: usize,
    /// Root-mean-square error of the market line vs the realized outcome.
    pub market_rmse: f64,
    /// Root-mean-square error of the model's prediction vs the outcome.
    pub model_rmse: f64,
    pub wins: u32,
    pub losses: u32,
    pub daily: BTreeMap<NaiveDate, DayRecord>,
    /// Return on investment at fixed vig over every decided bet.
    pub roi: f64,
}

impl MarketSummary {
    /// Day with the most wins; ties go to the earliest date.
    pub fn best_day(&self) -> Option<(NaiveDate, DayRecord)> {
        self.daily
            .iter()
            .fold(None, |best: Option<(NaiveDate, DayRecord)>, (date, rec)| {
                match best {
                    Some((_, b)) if rec.wins <= b.wins => best,
                    _ => Some((*date, *rec)),
                }
            })
    }

    /// Day with the most losses; ties go to the earliest date.
    pub fn worst_day(&self) -> Option<(NaiveDate, DayRecord)> {
        self.daily
            .iter()
            .fold(None, |worst: Option<(NaiveDate, DayRecord)>, (date, rec)| {
                match worst {
                    Some((_, w)) if rec.losses <= w.losses => worst,
                    _ => Some((*date, *rec)),
                }
            })
    }

    pub fn record(&self) -> String {
        format!("{}-{}", self.wins, self.losses)
    }
}

/// Whether the model beat the market on one decided bet: the model's pick
/// wins iff the model and the realized outcome land on the same side of the
/// market line. A model sitting exactly on the line has no pick, and an
/// outcome exactly on the line is a push; neither is a decided bet.
pub fn beats_market(market: f64, model: f64, actual: f64) -> Option<bool> {
    let model_diff = market - model;
    let actual_diff = market - actual;
    if model_diff == 0.0 || actual_diff == 0.0 {
        return None;
    }
    Some(model_diff.signum() == actual_diff.signum())
}

#[derive(Default)]
struct MarketAccum {
    sq_market: f64,
    sq_model: f64,
    compared: usize,
    wins: u32,
    losses: u32,
    daily: BTreeMap<NaiveDate, DayRecord>,
}

impl MarketAccum {
    fn add(&mut self, date: NaiveDate, market: f64, model: f64, actual: f64) {
        self.compared += 1;
        self.sq_market += (market - actual) * (market - actual);
        self.sq_model += (model - actual) * (model - actual);

        if let Some(win) = beats_market(market, model, actual) {
            let day = self.daily.entry(date).or_default();
            if win {
                self.wins += 1;
                day.wins += 1;
            } else {
                self.losses += 1;
                day.losses += 1;
            }
        }
    }

    fn finish(self) -> MarketSummary {
        let rmse = |sq: f64| {
            if self.compared == 0 {
                0.0
            } else {
                (sq / self.compared as f64).sqrt()
            }
        };
        MarketSummary {
            compared: self.compared,
            market_rmse: rmse(self.sq_market),
            model_rmse: rmse(self.sq_model),
            wins: self.wins,
            losses: self.losses,
            roi: fixed_vig_roi(self.wins, self.losses),
            daily: self.daily,
        }
    }
}

/// Aggregate statistics for one evaluation run.
#[derive(Debug, Clone, Default)]
pub struct BacktestSummary {
    pub predicted: usize,
    pub spread: MarketSummary,
    pub total: MarketSummary,
}

/// Score every predicted game that has a market line and a settled outcome.
/// Games missing either contribute nothing, by design: a forward test's
/// unsettled games and odds-less small-conference games flow through here
/// without error.
pub fn summarize(results: &[PredictionResult]) -> BacktestSummary {
    let mut spread = MarketAccum::default();
    let mut total = MarketAccum::default();

    for result in results {
        let game = &result.game;
        let Some(odds) = game.odds else { continue };

        if let (Some(line), Some(actual)) = (
            odds.spread.and_then(|l| l.value()),
            game.final_spread(),
        ) {
            spread.add(game.game_date, line, result.predicted_away_spread, actual);
        }

        if let (Some(line), Some(actual)) = (
            odds.over_under.and_then(|l| l.value()),
            game.final_total(),
        ) {
            total.add(game.game_date, line, result.predicted_total, actual);
        }
    }

    BacktestSummary {
        predicted: results.len(),
        spread: spread.finish(),
        total: total.finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, GameOdds, MarketLine};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn line(value: f64) -> Option<MarketLine> {
        Some(MarketLine {
            opening: None,
            current: Some(value),
        })
    }

    fn result(
        day: u32,
        spread_line: Option<f64>,
        total_line: Option<f64>,
        away: u32,
        home: u32,
        pred_away: f64,
        pred_home: f64,
    ) -> PredictionResult {
        let odds = if spread_line.is_some() || total_line.is_some() {
            Some(GameOdds {
                spread: spread_line.and_then(line),
                over_under: total_line.and_then(line),
                moneyline: None,
            })
        } else {
            None
        };
        PredictionResult {
            game: Game {
                game_date: date(day),
                game_time: "7:00 PM".to_string(),
                away_team: "Away".to_string(),
                home_team: "Home".to_string(),
                neutral_site: false,
                away_points: Some(away),
                home_points: Some(home),
                odds,
            },
            predicted_away_points: pred_away,
            predicted_home_points: pred_home,
            predicted_away_spread: pred_home - pred_away,
            predicted_total: pred_home + pred_away,
            predicted_away_moneyline: -110,
            predicted_home_moneyline: -110,
        }
    }

    #[test]
    fn test_beats_market_sign_rule() {
        // Model and outcome under the line together: win.
        assert_eq!(beats_market(2.0, 4.0, 6.0), Some(true));
        // Model under, outcome over: loss.
        assert_eq!(beats_market(0.0, -5.0, 5.0), Some(false));
        // Model above the line, outcome below it: loss.
        assert_eq!(beats_market(-6.0, -4.0, -10.0), Some(false));
        // Model exactly on the line: no pick.
        assert_eq!(beats_market(-6.0, -6.0, -10.0), None);
        // Outcome exactly on the line: push.
        assert_eq!(beats_market(-6.0, -4.0, -6.0), None);
    }

    #[test]
    fn test_two_spread_wins_same_day() {
        // Game 1: market -6, model -8, realized -10. Game 2: market +2,
        // model +4, realized +6. Both picks land with the outcome.
        let results = vec![
            result(11, Some(-6.0), None, 80, 70, 79.0, 71.0),
            result(11, Some(2.0), None, 70, 76, 70.0, 74.0),
        ];
        let summary = summarize(&results);

        assert_eq!(summary.spread.wins, 2);
        assert_eq!(summary.spread.losses, 0);
        assert_eq!(
            summary.spread.daily[&date(11)],
            DayRecord { wins: 2, losses: 0 }
        );
        // ROI = 100 * (2*210 - 2*110) / (2*110)
        assert!((summary.spread.roi - 90.909).abs() < 0.01);

        // RMSE: market misses by 4 on both games, the model by 2.
        assert!((summary.spread.market_rmse - 4.0).abs() < 1e-9);
        assert!((summary.spread.model_rmse - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_game_without_market_data_is_skipped() {
        let mut no_odds = result(11, None, None, 0, 0, 70.2, 75.8);
        no_odds.game.away_points = None;
        no_odds.game.home_points = None;

        let summary = summarize(&[no_odds]);
        assert_eq!(summary.predicted, 1);
        assert_eq!(summary.spread.compared, 0);
        assert_eq!(summary.total.compared, 0);
        assert_eq!(summary.spread.roi, 0.0);
    }

    #[test]
    fn test_unsettled_game_with_odds_is_skipped() {
        let mut unsettled = result(11, Some(-3.0), Some(140.0), 0, 0, 70.0, 75.0);
        unsettled.game.away_points = None;
        unsettled.game.home_points = None;

        let summary = summarize(&[unsettled]);
        assert_eq!(summary.spread.compared, 0);
        assert_eq!(summary.total.compared, 0);
    }

    #[test]
    fn test_totals_use_the_same_rule() {
        // Market total 145, model 150, realized 150: model called the over.
        let summary = summarize(&[result(11, None, Some(145.0), 80, 70, 79.0, 71.0)]);
        assert_eq!(summary.total.wins, 1);
        assert_eq!(summary.total.losses, 0);
        // Realized total exactly on the line is a push.
        let summary = summarize(&[result(11, None, Some(150.0), 80, 70, 79.0, 71.0)]);
        assert_eq!(summary.total.wins + summary.total.losses, 0);
        assert_eq!(summary.total.compared, 1);
    }

    #[test]
    fn test_best_and_worst_days() {
        let results = vec![
            // Day 11: 1 win.
            result(11, Some(-6.0), None, 80, 70, 79.0, 71.0),
            // Day 12: 2 wins.
            result(12, Some(-6.0), None, 80, 70, 79.0, 71.0),
            result(12, Some(2.0), None, 70, 76, 70.0, 74.0),
            // Day 13: 1 loss (model above the line, outcome below).
            result(13, Some(-6.0), None, 70, 60, 71.0, 67.0),
        ];
        let summary = summarize(&results);

        let (best_date, best) = summary.spread.best_day().unwrap();
        assert_eq!(best_date, date(12));
        assert_eq!(best, DayRecord { wins: 2, losses: 0 });

        let (worst_date, worst) = summary.spread.worst_day().unwrap();
        assert_eq!(worst_date, date(13));
        assert_eq!(worst, DayRecord { wins: 0, losses: 1 });
    }

    #[test]
    fn test_empty_run_summarizes_cleanly() {
        let summary = summarize(&[]);
        assert_eq!(summary.predicted, 0);
        assert_eq!(summary.spread.market_rmse, 0.0);
        assert!(summary.spread.best_day().is_none());
    }
}
