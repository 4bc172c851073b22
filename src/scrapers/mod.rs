pub mod schedule;
pub mod team_rankings;

pub use schedule::ScoresAndOddsClient;
pub use team_rankings::TeamRankingsClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::ModelError;
use crate::fetch::FetchSource;
use crate::models::Category;

/// The live fetch capability: one object that knows how to pull everything
/// the model needs, dispatching each category to the right scraper.
pub struct WebDataSource {
    stats: TeamRankingsClient,
    schedule: ScoresAndOddsClient,
}

impl WebDataSource {
    pub fn new() -> Self {
        Self {
            stats: TeamRankingsClient::new(),
            schedule: ScoresAndOddsClient::new(),
        }
    }
}

impl Default for WebDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchSource for WebDataSource {
    async fn fetch(&self, category: Category, date: NaiveDate) -> Result<Vec<Value>, ModelError> {
        match category {
            Category::Schedule => self.schedule.fetch_games(date).await,
            _ => self.stats.fetch_table(category, date).await,
        }
    }
}
