use std::time::Duration;

use chrono::{Local, NaiveDate};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::errors::ModelError;
use crate::models::Category;

/// Per-page fetch deadline. A hung page is abandoned, not retried: over a
/// 90-day range, retries would turn one slow date into an unbounded run.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const BASE_URL: &str = "https://www.teamrankings.com/ncaa-basketball/stat";

/// Scrapes the per-team statistic tables (possessions per game, offensive
/// and defensive efficiency) and turns them into snapshot records with
/// category-prefixed column names.
pub struct TeamRankingsClient {
    client: reqwest::Client,
}

impl TeamRankingsClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap(),
        }
    }

    fn stat_path(category: Category) -> Option<&'static str> {
        match category {
            Category::Tempo => Some("possessions-per-game"),
            Category::OffensiveEfficiency => Some("offensive-efficiency"),
            Category::DefensiveEfficiency => Some("defensive-efficiency"),
            Category::Schedule => None,
        }
    }

    /// Fetch one stat table as of `date`. The site serves the current table
    /// at the bare URL and historical tables behind a `?date=` query.
    pub async fn fetch_table(
        &self,
        category: Category,
        date: NaiveDate,
    ) -> Result<Vec<Value>, ModelError> {
        let path = Self::stat_path(category).ok_or_else(|| ModelError::FetchFailure {
            category: category.as_str().to_string(),
            date,
            reason: "not a team-rankings stat category".to_string(),
        })?;

        let mut url = format!("{}/{}", BASE_URL, path);
        if date != Local::now().date_naive() {
            url = format!("{}?date={}", url, date.format("%Y-%m-%d"));
        }

        let fetch_err = |reason: String| ModelError::FetchFailure {
            category: category.as_str().to_string(),
            date,
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_err(format!("status {}", response.status())));
        }
        let html = response.text().await.map_err(|e| fetch_err(e.to_string()))?;

        parse_stat_table(&html, category.as_str()).map_err(fetch_err)
    }
}

impl Default for TeamRankingsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a stat page into one record per table row. Column headers are
/// lowercased, space-to-underscore, and prefixed with the category
/// (`tempo_rank`, `tempo_team`, `tempo_2025`, `tempo_last_3`, ...).
/// Column 0 is an integer rank, column 1 the team name, everything after is
/// a float or null when the site shows a placeholder.
pub fn parse_stat_table(html: &str, prefix: &str) -> Result<Vec<Value>, String> {
    let document = Html::parse_document(html);

    let table_sel = Selector::parse("table#DataTables_Table_0")
        .map_err(|_| "invalid table selector".to_string())?;
    let header_sel =
        Selector::parse("thead th").map_err(|_| "invalid header selector".to_string())?;
    let row_sel = Selector::parse("tbody tr").map_err(|_| "invalid row selector".to_string())?;
    let cell_sel = Selector::parse("td").map_err(|_| "invalid cell selector".to_string())?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| "data table not found in page".to_string())?;

    let headers: Vec<String> = table
        .select(&header_sel)
        .map(|th| {
            let text = th.text().collect::<String>();
            format!("{}_{}", prefix, text.trim().to_lowercase().replace(' ', "_"))
        })
        .collect();
    if headers.is_empty() {
        return Err("data table has no header row".to_string());
    }

    let mut records = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();

        // Spacer and ad rows carry no rank; skip them.
        let Some(Ok(rank)) = cells.first().map(|c| c.parse::<i64>()) else {
            continue;
        };

        let mut record = serde_json::Map::new();
        for (j, (header, cell)) in headers.iter().zip(cells.iter()).enumerate() {
            let value = match j {
                0 => Value::from(rank),
                1 => Value::from(cell.clone()),
                _ => cell
                    .parse::<f64>()
                    .map(Value::from)
                    .unwrap_or(Value::Null),
            };
            record.insert(header.clone(), value);
        }
        records.push(Value::Object(record));
    }

    Ok(records)
}
