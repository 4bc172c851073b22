use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

use crate::cache::{date_stamp, Completeness, SnapshotCache};
use crate::config::{EfficiencySource, ModelTuning, RunConfig};
use crate::errors::ModelError;
use crate::models::{Category, Game};
use crate::teams::{NamingSystem, TeamDirectory};

/// Degrees of longitude per time zone, for the travel adjustment buckets.
const LONGITUDE_DEGREES_PER_ZONE: f64 = 15.0;

/// A score projection model. Returns projected (away_points, home_points).
///
/// `TeamNotFound` and `PredictionRejected` mean this particular game cannot
/// be projected; batch callers skip the game and move on.
pub trait Predictor {
    fn predict(&self, game: &Game) -> Result<(f64, f64), ModelError>;
}

/// Tempo-adjusted efficiency model.
///
/// Expected possessions are the mean of both teams' tempo; each side's
/// points are possessions times its offensive efficiency discounted by the
/// opponent's defensive efficiency relative to league average. Home teams
/// on non-neutral courts get the home-advantage bump, and away teams are
/// docked per time zone traveled when geographic data is available.
pub struct EfficiencyModel<'a> {
    cache: &'a SnapshotCache,
    directory: &'a TeamDirectory,
    tuning: ModelTuning,
    source: EfficiencySource,
    /// Sportsbook team name -> (latitude, longitude). Empty when no geo
    /// file was present; the travel adjustment is then a no-op.
    geo: HashMap<String, (f64, f64)>,
    /// Per-run memo of parsed stat tables, keyed by (category, date).
    tables: Mutex<HashMap<(Category, NaiveDate), HashMap<String, Value>>>,
}

/// Season label used in stat column names: the 2024-25 season's column is
/// `2025`, covering games from July onward through the spring.
pub fn season_label(date: NaiveDate) -> i32 {
    if date.month() >= 7 {
        date.year() + 1
    } else {
        date.year()
    }
}

impl<'a> EfficiencyModel<'a> {
    pub fn new(
        cache: &'a SnapshotCache,
        directory: &'a TeamDirectory,
        config: &RunConfig,
    ) -> Self {
        Self {
            cache,
            directory,
            tuning: config.tuning,
            source: config.efficiency_source,
            geo: load_geo(&config.teams_dir()),
            tables: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_geo(mut self, geo: HashMap<String, (f64, f64)>) -> Self {
        self.geo = geo;
        self
    }

    /// Look up one stat value for a team (TeamRankings name) on the game
    /// date, applying the configured efficiency source. Tempo always uses
    /// the season column; blending only applies to the efficiency stats.
    fn stat(&self, category: Category, game: &Game, team: &str) -> Result<f64, ModelError> {
        let record = self.team_record(category, game, team)?;
        let prefix = category.as_str();

        let season_col = format!("{}_{}", prefix, season_label(game.game_date));
        let season = number_field(&record, &season_col).ok_or_else(|| {
            reject(game, format!("no {} value for {}", season_col, team))
        })?;

        let source = if category == Category::Tempo {
            EfficiencySource::Season
        } else {
            self.source
        };

        match source {
            EfficiencySource::Season => Ok(season),
            EfficiencySource::Blended {
                season_weight,
                recent_weight,
            } => {
                // Early in the season there is no last-3 column yet; fall
                // back to the season value rather than refusing to predict.
                let recent =
                    number_field(&record, &format!("{}_last_3", prefix)).unwrap_or(season);
                Ok(season_weight * season + recent_weight * recent)
            }
        }
    }

    fn team_record(
        &self,
        category: Category,
        game: &Game,
        team: &str,
    ) -> Result<Value, ModelError> {
        let key = (category, game.game_date);
        let mut tables = self.tables.lock().unwrap();

        if !tables.contains_key(&key) {
            let snapshot =
                self.cache
                    .read(category.as_str(), &date_stamp(game.game_date), None)?;
            if snapshot.completeness == Completeness::Missing {
                return Err(reject(
                    game,
                    format!("no {} snapshot for {}", category, game.game_date),
                ));
            }

            let team_col = format!("{}_team", category.as_str());
            let mut by_team = HashMap::new();
            for record in snapshot.records {
                if let Some(name) = record.get(&team_col).and_then(Value::as_str) {
                    by_team.insert(name.to_string(), record.clone());
                }
            }
            tables.insert(key, by_team);
        }

        tables[&key].get(team).cloned().ok_or_else(|| {
            reject(
                game,
                format!("no {} row for {} on {}", category, team, game.game_date),
            )
        })
    }

    /// Points docked from the away side per time zone crossed getting to
    /// the game. Zero unless both teams have geo data.
    fn travel_penalty(&self, game: &Game) -> f64 {
        if self.geo.is_empty() || self.tuning.travel_penalty_per_zone == 0.0 {
            return 0.0;
        }
        let locate = |name: &str| {
            self.directory
                .normalize(name, NamingSystem::Sportsbook)
                .ok()
                .and_then(|n| self.geo.get(&n).copied())
        };
        let (Some(away), Some(home)) = (locate(&game.away_team), locate(&game.home_team)) else {
            return 0.0;
        };
        let zones = ((away.1 - home.1).abs() / LONGITUDE_DEGREES_PER_ZONE).floor();
        zones * self.tuning.travel_penalty_per_zone
    }
}

impl Predictor for EfficiencyModel<'_> {
    fn predict(&self, game: &Game) -> Result<(f64, f64), ModelError> {
        let away = self
            .directory
            .normalize(&game.away_team, NamingSystem::TeamRankings)?;
        let home = self
            .directory
            .normalize(&game.home_team, NamingSystem::TeamRankings)?;

        let tempo_away = self.stat(Category::Tempo, game, &away)?;
        let tempo_home = self.stat(Category::Tempo, game, &home)?;
        let off_away = self.stat(Category::OffensiveEfficiency, game, &away)?;
        let off_home = self.stat(Category::OffensiveEfficiency, game, &home)?;
        let def_away = self.stat(Category::DefensiveEfficiency, game, &away)?;
        let def_home = self.stat(Category::DefensiveEfficiency, game, &home)?;

        let possessions = (tempo_away + tempo_home) / 2.0;
        let league = self.tuning.league_avg_efficiency;

        let mut away_points = possessions * off_away * def_home / (100.0 * league);
        let mut home_points = possessions * off_home * def_away / (100.0 * league);

        if !game.neutral_site {
            home_points += self.tuning.home_advantage;
        }
        away_points -= self.travel_penalty(game);

        Ok((away_points, home_points))
    }
}

fn reject(game: &Game, reason: String) -> ModelError {
    ModelError::PredictionRejected {
        away: game.away_team.clone(),
        home: game.home_team.clone(),
        reason,
    }
}

fn number_field(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(Value::as_f64)
}

fn load_geo(teams_dir: &Path) -> HashMap<String, (f64, f64)> {
    let path = teams_dir.join("geo_latlong.json");
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(geo) => geo,
            Err(e) => {
                tracing::warn!("ignoring unparseable geo file {}: {}", path.display(), e);
                HashMap::new()
            }
        },
        Err(_) => HashMap::new(),
    }
}
