use serde::{Deserialize, Serialize};
use chrono::NaiveDate;

/// A data category fetched from the outside world and cached per date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Tempo,
    OffensiveEfficiency,
    DefensiveEfficiency,
    Schedule,
}

impl Category {
    /// Stable short name, used as the cache file prefix and as the column
    /// prefix inside stat records (`tempo_team`, `off_eff_2025`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tempo => "tempo",
            Category::OffensiveEfficiency => "off_eff",
            Category::DefensiveEfficiency => "def_eff",
            Category::Schedule => "schedule",
        }
    }

    /// Sub-field a snapshot must carry to count as Complete. Schedule
    /// snapshots are written in two passes (games first, odds attached
    /// after), so they are only Complete once odds are present.
    pub fn required_field(&self) -> Option<&'static str> {
        match self {
            Category::Schedule => Some("odds"),
            _ => None,
        }
    }

    /// The per-team statistic categories the efficiency model consumes.
    pub fn stats() -> [Category; 3] {
        [
            Category::Tempo,
            Category::OffensiveEfficiency,
            Category::DefensiveEfficiency,
        ]
    }

    pub fn all() -> [Category; 4] {
        [
            Category::Tempo,
            Category::OffensiveEfficiency,
            Category::DefensiveEfficiency,
            Category::Schedule,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One market line with its opening and most recent values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MarketLine {
    pub opening: Option<f64>,
    pub current: Option<f64>,
}

impl MarketLine {
    /// The value to score against: current when the book has moved, opening
    /// otherwise. None means no usable line.
    pub fn value(&self) -> Option<f64> {
        self.current.or(self.opening)
    }
}

/// Moneyline prices (American odds) for both sides of a game.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MoneylinePair {
    pub away: MarketLine,
    pub home: MarketLine,
}

/// Market odds attached to a schedule record. Spread values are quoted from
/// the away team's perspective: positive means the away team is the underdog.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GameOdds {
    pub spread: Option<MarketLine>,
    pub over_under: Option<MarketLine>,
    pub moneyline: Option<MoneylinePair>,
}

/// One scheduled (or settled) game as stored in a schedule snapshot.
/// Team names are in the sportsbook naming system; the identity resolver
/// translates them for stat lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub game_date: NaiveDate,
    pub game_time: String,
    pub away_team: String,
    pub home_team: String,
    pub neutral_site: bool,
    pub away_points: Option<u32>,
    pub home_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub odds: Option<GameOdds>,
}

impl Game {
    pub fn matchup(&self) -> String {
        format!("{} @ {} ({})", self.away_team, self.home_team, self.game_date)
    }

    /// Realized away spread (home minus away), once both scores are in.
    pub fn final_spread(&self) -> Option<f64> {
        match (self.away_points, self.home_points) {
            (Some(a), Some(h)) => Some(h as f64 - a as f64),
            _ => None,
        }
    }

    /// Realized combined score, once both scores are in.
    pub fn final_total(&self) -> Option<f64> {
        match (self.away_points, self.home_points) {
            (Some(a), Some(h)) => Some((a + h) as f64),
            _ => None,
        }
    }
}

/// A game plus the model's projection for it. Serialized flat so a results
/// file reads as schedule records with `predicted_*` columns appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(flatten)]
    pub game: Game,
    pub predicted_away_points: f64,
    pub predicted_home_points: f64,
    /// Predicted home minus away.
    pub predicted_away_spread: f64,
    pub predicted_total: f64,
    pub predicted_away_moneyline: i32,
    pub predicted_home_moneyline: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(away: u32, home: u32) -> Game {
        Game {
            game_date: NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(),
            game_time: "1900".to_string(),
            away_team: "Gonzaga".to_string(),
            home_team: "Santa Clara".to_string(),
            neutral_site: false,
            away_points: Some(away),
            home_points: Some(home),
            odds: None,
        }
    }

    #[test]
    fn test_final_spread_is_home_minus_away() {
        let g = game(70, 80);
        assert_eq!(g.final_spread(), Some(10.0));
        assert_eq!(g.final_total(), Some(150.0));
    }

    #[test]
    fn test_unsettled_game_has_no_final_values() {
        let mut g = game(0, 0);
        g.away_points = None;
        g.home_points = None;
        assert_eq!(g.final_spread(), None);
        assert_eq!(g.final_total(), None);
    }

    #[test]
    fn test_market_line_prefers_current() {
        let line = MarketLine {
            opening: Some(-4.5),
            current: Some(-6.0),
        };
        assert_eq!(line.value(), Some(-6.0));

        let opening_only = MarketLine {
            opening: Some(-4.5),
            current: None,
        };
        assert_eq!(opening_only.value(), Some(-4.5));
        assert_eq!(MarketLine::default().value(), None);
    }
}
