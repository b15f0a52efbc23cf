//! Pipeline orchestrator: ties scraper → storage together.
//!
//! `run()`:
//!   1. Fetch the index page → list of country names (fatal on failure)
//!   2. Build one result-page URL per country
//!   3. Fetch each country page in turn, spaced by the request pacer.
//!      A failing country is logged and contributes zero records.
//!   4. Hand every record to the sink; an empty run writes nothing.

use crate::models::Record;
use crate::scraper::error::ScrapeError;
use crate::scraper::throttle::RequestPacer;
use crate::scraper::{PropertyDataSource, plan_targets};
use crate::storage::RecordSink;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

pub struct Pipeline<D, P> {
    source: D,
    pacer: P,
}

impl<D: PropertyDataSource, P: RequestPacer> Pipeline<D, P> {
    pub fn new(source: D, pacer: P) -> Self {
        Self { source, pacer }
    }

    pub async fn run(&mut self, sink: &mut dyn RecordSink) -> Result<PipelineStats> {
        let mut stats = PipelineStats::started();

        // ── 1. Discover countries ─────────────────────────────────────────────
        info!("=== Step 1: Discovering countries ===");
        let discovered = self.source.discover_countries().await;
        self.pacer.completed();

        let countries = match discovered {
            Ok(countries) => countries,
            Err(ScrapeError::Structure { url, selector }) => {
                error!("Country list `{}` missing on {}; nothing to scrape", selector, url);
                return Ok(stats.finish());
            }
            Err(e) => return Err(e).context("Country discovery failed"),
        };

        stats.countries_discovered = countries.len();
        if countries.is_empty() {
            warn!("No countries discovered, stopping");
            return Ok(stats.finish());
        }

        // ── 2. Plan requests ──────────────────────────────────────────────────
        let targets = plan_targets(self.source.country_base_url(), &countries);

        // ── 3. Fetch every country, one request at a time ─────────────────────
        info!("=== Step 2: Fetching {} country pages ===", targets.len());
        let mut records: Vec<Record> = Vec::new();

        for (idx, target) in targets.iter().enumerate() {
            self.pacer.ready().await;
            info!("[{}/{}] {}", idx + 1, targets.len(), target.name);

            let fetched = self.source.fetch_country(target).await;
            self.pacer.completed();

            match fetched {
                Ok(rows) if rows.is_empty() => {
                    info!("  {}: no rows", target.name);
                    stats.countries_scraped += 1;
                }
                Ok(rows) => {
                    info!("  {}: {} rows", target.name, rows.len());
                    stats.countries_scraped += 1;
                    records.extend(rows);
                }
                Err(e) => {
                    warn!("  {}: {:#}", target.name, e);
                    stats.countries_failed += 1;
                }
            }
        }

        // ── 4. Persist ────────────────────────────────────────────────────────
        stats.records = records.len();
        if records.is_empty() {
            warn!("No rows collected, nothing written");
        } else {
            stats.records_written = sink.persist(&records).context("Failed to persist rows")?;
        }

        let stats = stats.finish();
        info!(
            "=== Done: {} countries | {} ok | {} failed | {} rows written ===",
            stats.countries_discovered,
            stats.countries_scraped,
            stats.countries_failed,
            stats.records_written,
        );
        Ok(stats)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub countries_discovered: usize,
    pub countries_scraped: usize,
    pub countries_failed: usize,
    pub records: usize,
    pub records_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineStats {
    fn started() -> Self {
        Self {
            countries_discovered: 0,
            countries_scraped: 0,
            countries_failed: 0,
            records: 0,
            records_written: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchTarget;
    use crate::scraper::error::FetchError;
    use crate::scraper::throttle::NoDelay;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Countries with a fixed number of rows, or `None` to fail the fetch.
    struct FakeSource {
        discovery: Mutex<Option<Result<Vec<String>, ScrapeError>>>,
        rows: HashMap<String, Option<usize>>,
        fetched: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(countries: &[(&str, Option<usize>)]) -> Self {
            Self {
                discovery: Mutex::new(Some(Ok(countries.iter().map(|(n, _)| n.to_string()).collect()))),
                rows: countries.iter().map(|(n, r)| (n.to_string(), *r)).collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn failing_discovery(err: ScrapeError) -> Self {
            let source = Self::new(&[]);
            *source.discovery.lock().unwrap() = Some(Err(err));
            source
        }
    }

    #[async_trait]
    impl PropertyDataSource for FakeSource {
        async fn discover_countries(&self) -> Result<Vec<String>, ScrapeError> {
            self.discovery.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
        }

        fn country_base_url(&self) -> &str {
            "https://x/y"
        }

        async fn fetch_country(&self, target: &FetchTarget) -> Result<Vec<Record>, ScrapeError> {
            self.fetched.lock().unwrap().push(target.name.clone());
            match self.rows.get(&target.name).copied().flatten() {
                Some(n) => Ok((0..n)
                    .map(|i| Record {
                        country: target.name.clone(),
                        category: Some("Rent".into()),
                        item: format!("item {i}"),
                        value: format!("{i} €"),
                        range: String::new(),
                    })
                    .collect()),
                None => Err(FetchError::Timeout { url: target.url.clone() }.into()),
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        calls: usize,
        rows: Vec<Record>,
    }

    impl RecordSink for MemorySink {
        fn persist(&mut self, records: &[Record]) -> Result<usize> {
            self.calls += 1;
            self.rows.extend_from_slice(records);
            Ok(records.len())
        }
    }

    /// Counts pacer calls to check every request is paced.
    #[derive(Default)]
    struct CountingPacer {
        ready: usize,
        completed: usize,
    }

    #[async_trait]
    impl RequestPacer for CountingPacer {
        async fn ready(&mut self) {
            self.ready += 1;
        }
        fn completed(&mut self) {
            self.completed += 1;
        }
    }

    #[tokio::test]
    async fn one_failing_country_does_not_abort_the_run() {
        let source = FakeSource::new(&[("France", Some(3)), ("Germany", None), ("Italy", Some(2))]);
        let mut sink = MemorySink::default();
        let mut pipeline = Pipeline::new(source, NoDelay);

        let stats = pipeline.run(&mut sink).await.unwrap();

        assert_eq!(stats.countries_discovered, 3);
        assert_eq!(stats.countries_scraped, 2);
        assert_eq!(stats.countries_failed, 1);
        assert_eq!(stats.records_written, 5);
        assert_eq!(sink.calls, 1);
        assert_eq!(
            *pipeline.source.fetched.lock().unwrap(),
            vec!["France", "Germany", "Italy"]
        );

        let countries: Vec<&str> = sink.rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(countries, vec!["France", "France", "France", "Italy", "Italy"]);
    }

    #[tokio::test]
    async fn no_countries_means_no_fetches_and_no_write() {
        let mut sink = MemorySink::default();
        let mut pipeline = Pipeline::new(FakeSource::new(&[]), NoDelay);

        let stats = pipeline.run(&mut sink).await.unwrap();

        assert_eq!(stats.countries_discovered, 0);
        assert!(pipeline.source.fetched.lock().unwrap().is_empty());
        assert_eq!(sink.calls, 0);
        assert!(stats.finished_at.is_some());
    }

    #[tokio::test]
    async fn empty_pages_are_reported_not_written() {
        let source = FakeSource::new(&[("Atlantis", Some(0))]);
        let mut sink = MemorySink::default();
        let mut pipeline = Pipeline::new(source, NoDelay);

        let stats = pipeline.run(&mut sink).await.unwrap();

        assert_eq!(stats.countries_scraped, 1);
        assert_eq!(stats.records, 0);
        assert_eq!(sink.calls, 0);
    }

    #[tokio::test]
    async fn missing_country_list_ends_the_run_early() {
        let source = FakeSource::failing_discovery(ScrapeError::Structure {
            url: "https://x/".into(),
            selector: "table.related_links".into(),
        });
        let mut sink = MemorySink::default();
        let mut pipeline = Pipeline::new(source, NoDelay);

        let stats = pipeline.run(&mut sink).await.unwrap();

        assert_eq!(stats.countries_discovered, 0);
        assert_eq!(sink.calls, 0);
    }

    #[tokio::test]
    async fn index_fetch_failure_is_fatal() {
        let source = FakeSource::failing_discovery(
            FetchError::Status { url: "https://x/".into(), status: 403 }.into(),
        );
        let mut sink = MemorySink::default();
        let mut pipeline = Pipeline::new(source, NoDelay);

        let err = pipeline.run(&mut sink).await.unwrap_err();

        assert!(format!("{:#}", err).contains("HTTP 403"));
        assert_eq!(sink.calls, 0);
    }

    #[tokio::test]
    async fn every_country_request_is_paced() {
        let source = FakeSource::new(&[("A", Some(1)), ("B", None), ("C", Some(1))]);
        let mut sink = MemorySink::default();
        let mut pipeline = Pipeline::new(source, CountingPacer::default());

        pipeline.run(&mut sink).await.unwrap();

        assert_eq!(pipeline.pacer.ready, 3);
        // index request + one per country
        assert_eq!(pipeline.pacer.completed, 4);
    }
}
