use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::cache::{date_stamp, SnapshotCache};
use crate::errors::ModelError;
use crate::models::Category;

/// Hard ceiling on a single run's date span. Every date is at least one
/// page fetch against a rate- and bot-sensitive source, so an oversized
/// range is rejected up front as a configuration mistake.
pub const MAX_RANGE_DAYS: i64 = 90;

/// Pause between consecutive network fetches. Backpressure, not politeness
/// theater: the sources this pulls from ban aggressive clients.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(500);

/// An inclusive, validated date range. Construction enforces ordering and
/// the span ceiling, so an orchestrator holding a `DateRange` never has to
/// re-check either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelError> {
        if end < start {
            return Err(ModelError::Configuration {
                reason: format!("end date {} is before start date {}", end, start),
            });
        }
        let span = (end - start).num_days();
        if span > MAX_RANGE_DAYS {
            return Err(ModelError::Configuration {
                reason: format!(
                    "date range spans {} days; more than {} days of data per run is not allowed",
                    span, MAX_RANGE_DAYS
                ),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` endpoints.
    pub fn parse(start: &str, end: &str) -> Result<Self, ModelError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| ModelError::Configuration {
                reason: format!("invalid date {:?}: {}", s, e),
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// Dates in ascending order, both endpoints included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

/// The external fetch capability: given a category and date, produce the
/// records for that snapshot. How it does so (page rendering, HTTP, a test
/// double) is its own business.
#[async_trait]
pub trait FetchSource: Send + Sync {
    async fn fetch(&self, category: Category, date: NaiveDate) -> Result<Vec<Value>, ModelError>;
}

/// What one `ensure` pass actually did, date by date. Exists so callers and
/// tests can observe idempotence instead of trusting it.
#[derive(Debug, Default)]
pub struct EnsureReport {
    /// Dates fetched and written this pass.
    pub fetched: Vec<NaiveDate>,
    /// Dates whose snapshot was already Complete.
    pub skipped: Vec<NaiveDate>,
    /// Dates whose fetch failed; the pass continued without them.
    pub failed: Vec<NaiveDate>,
    /// Dates fetched but still Partial afterwards, accepted as best-effort
    /// (e.g. the first days of a season, before any statistical history).
    pub incomplete: Vec<NaiveDate>,
}

impl EnsureReport {
    pub fn fetch_count(&self) -> usize {
        self.fetched.len() + self.failed.len()
    }
}

/// Makes scraping idempotent: walks a date range, reads the cache for each
/// date, and only invokes the fetch capability for Missing or Partial
/// snapshots. Strictly sequential by date with a fixed inter-fetch delay.
pub struct DataFetchOrchestrator<'a> {
    cache: &'a SnapshotCache,
    fetch_delay: Duration,
}

impl<'a> DataFetchOrchestrator<'a> {
    pub fn new(cache: &'a SnapshotCache) -> Self {
        Self {
            cache,
            fetch_delay: DEFAULT_FETCH_DELAY,
        }
    }

    pub fn with_delay(cache: &'a SnapshotCache, fetch_delay: Duration) -> Self {
        Self { cache, fetch_delay }
    }

    /// Bring every date in `range` up to a Complete snapshot for `category`,
    /// fetching only what is Missing or Partial (or everything, under
    /// `force`).
    ///
    /// A `FetchFailure` skips that date and the pass continues; the date is
    /// recorded in the report. A snapshot that is still Partial after a
    /// fresh fetch is accepted as best-effort rather than retried. A corrupt
    /// cache file aborts the pass: re-fetching over it would mask whatever
    /// corrupted it.
    pub async fn ensure(
        &self,
        category: Category,
        range: DateRange,
        source: &dyn FetchSource,
        force: bool,
    ) -> Result<EnsureReport, ModelError> {
        let required = category.required_field();
        let mut report = EnsureReport::default();

        for date in range.days() {
            let stamp = date_stamp(date);

            if !force {
                let snapshot = self.cache.read(category.as_str(), &stamp, required)?;
                if snapshot.is_complete() {
                    report.skipped.push(date);
                    continue;
                }
            }

            if report.fetch_count() > 0 && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }

            match source.fetch(category, date).await {
                Ok(records) => {
                    self.cache.write(category.as_str(), &stamp, &records)?;
                    if !SnapshotCache::is_complete(&records, required) {
                        tracing::info!(
                            "snapshot {}/{} still partial after fetch; keeping best-effort result",
                            category,
                            date
                        );
                        report.incomplete.push(date);
                    }
                    report.fetched.push(date);
                }
                Err(err @ ModelError::FetchFailure { .. }) => {
                    tracing::warn!("skipping {} on {}: {}", category, date, err);
                    report.failed.push(date);
                }
                Err(other) => return Err(other),
            }
        }

        if !report.failed.is_empty() {
            tracing::warn!(
                "{} dates for {} remain unfetched: {:?}",
                report.failed.len(),
                category,
                report.failed
            );
        }
        Ok(report)
    }
}
