use std::collections::HashMap;

use chrono::NaiveDate;
use scraper::{Html, Selector};
use serde_json::Value;

use crate::errors::ModelError;
use crate::models::{Game, GameOdds, MarketLine, MoneylinePair};
use crate::scrapers::team_rankings::REQUEST_TIMEOUT;

const SCHEDULE_URL: &str = "https://www.scoresandodds.com/ncaab/schedule";
const ODDS_URL: &str = "https://www.scoresandodds.com/ncaab/odds";

/// Scrapes the daily slate (matchups, tip-off times, final scores once
/// settled) and the sportsbook lines for it.
///
/// A schedule snapshot is written in two logical passes: the games
/// themselves, then odds attached per matchup. Odds attachment is
/// best-effort — a game with no matched odds row simply lacks the `odds`
/// field and leaves the snapshot Partial.
pub struct ScoresAndOddsClient {
    client: reqwest::Client,
}

impl ScoresAndOddsClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap(),
        }
    }

    /// Fetch the full slate for one date, with odds attached where the odds
    /// page has a matching row.
    pub async fn fetch_games(&self, date: NaiveDate) -> Result<Vec<Value>, ModelError> {
        let fetch_err = |reason: String| ModelError::FetchFailure {
            category: "schedule".to_string(),
            date,
            reason,
        };

        let schedule_html = self
            .get_page(&format!("{}?date={}", SCHEDULE_URL, date.format("%Y-%m-%d")))
            .await
            .map_err(&fetch_err)?;
        let mut games = parse_schedule(&schedule_html, date).map_err(&fetch_err)?;

        // Odds live on a sibling page. Losing them degrades the snapshot to
        // Partial rather than failing the date.
        match self
            .get_page(&format!("{}?date={}", ODDS_URL, date.format("%Y-%m-%d")))
            .await
            .and_then(|html| parse_odds(&html))
        {
            Ok(odds) => attach_odds(&mut games, &odds),
            Err(reason) => {
                tracing::warn!("no odds for {}: {}; keeping bare schedule", date, reason);
            }
        }

        Ok(games
            .iter()
            .map(|g| serde_json::to_value(g).expect("games serialize to plain JSON"))
            .collect())
    }

    async fn get_page(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("status {}", response.status()));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

impl Default for ScoresAndOddsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the schedule page. Row cells: time, away team, away score, home
/// team, home score, site marker ("N" for neutral courts). Scores are empty
/// until the game settles.
pub fn parse_schedule(html: &str, date: NaiveDate) -> Result<Vec<Game>, String> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table.schedule-table tbody tr")
        .map_err(|_| "invalid row selector".to_string())?;
    let cell_sel = Selector::parse("td").map_err(|_| "invalid cell selector".to_string())?;

    let mut games = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 5 {
            continue;
        }

        let away_team = cells[1].clone();
        let home_team = cells[3].clone();
        if away_team.is_empty() || home_team.is_empty() {
            continue;
        }

        games.push(Game {
            game_date: date,
            game_time: cells[0].clone(),
            away_team,
            home_team,
            neutral_site: cells.get(5).map(|s| s == "N").unwrap_or(false),
            away_points: cells[2].parse::<u32>().ok(),
            home_points: cells[4].parse::<u32>().ok(),
            odds: None,
        });
    }

    if games.is_empty() && !document.select(&row_sel).any(|_| true) {
        return Err("schedule table not found in page".to_string());
    }
    Ok(games)
}

/// Parse the odds page into lines keyed by (away, home). Row cells: away,
/// home, spread open, spread current, total open, total current, away ML
/// open, away ML current, home ML open, home ML current. Spread and total
/// values are quoted from the away team's perspective.
pub fn parse_odds(html: &str) -> Result<HashMap<(String, String), GameOdds>, String> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("table.odds-table tbody tr")
        .map_err(|_| "invalid row selector".to_string())?;
    let cell_sel = Selector::parse("td").map_err(|_| "invalid cell selector".to_string())?;

    let mut odds = HashMap::new();
    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 10 {
            continue;
        }

        let key = (cells[0].to_lowercase(), cells[1].to_lowercase());
        let line = |open: &String, current: &String| -> Option<MarketLine> {
            let parsed = MarketLine {
                opening: parse_line(open),
                current: parse_line(current),
            };
            parsed.value().map(|_| parsed)
        };

        let moneyline = match (line(&cells[6], &cells[7]), line(&cells[8], &cells[9])) {
            (Some(away), Some(home)) => Some(MoneylinePair { away, home }),
            _ => None,
        };

        odds.insert(
            key,
            GameOdds {
                spread: line(&cells[2], &cells[3]),
                over_under: line(&cells[4], &cells[5]),
                moneyline,
            },
        );
    }
    Ok(odds)
}

fn attach_odds(games: &mut [Game], odds: &HashMap<(String, String), GameOdds>) {
    for game in games.iter_mut() {
        let key = (game.away_team.to_lowercase(), game.home_team.to_lowercase());
        if let Some(game_odds) = odds.get(&key) {
            game.odds = Some(*game_odds);
        }
    }
}

/// Parse one quoted line value. Empty cells and dashes mean no line; "PK"
/// is a pick'em, i.e. a zero spread.
fn parse_line(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "-" || cell == "--" {
        return None;
    }
    if cell.eq_ignore_ascii_case("pk") {
        return Some(0.0);
    }
    cell.trim_start_matches('+').parse::<f64>().ok()
}
