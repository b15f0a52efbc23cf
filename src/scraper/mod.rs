pub mod cleaner;
pub mod error;
pub mod http_client;
pub mod parsers;
pub mod throttle;

use crate::config::ScraperConfig;
use crate::models::{FetchTarget, Record};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::form_urlencoded;

use self::error::{FetchError, ScrapeError};
use self::http_client::HttpClient;
use self::parsers::{DATA_TABLE, parse_country_index, parse_country_page};

/// Currency every country page is requested in.
pub const DISPLAY_CURRENCY: &str = "EUR";

// ── Source traits ─────────────────────────────────────────────────────────────

/// Raw page retrieval. `HttpClient` in production, canned pages in tests.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Swappable data source abstraction.
#[async_trait]
pub trait PropertyDataSource: Send + Sync {
    /// Country names from the index page, in page order.
    async fn discover_countries(&self) -> Result<Vec<String>, ScrapeError>;

    /// Base URL the per-country targets are built on.
    fn country_base_url(&self) -> &str;

    /// Every data row of one country page.
    async fn fetch_country(&self, target: &FetchTarget) -> Result<Vec<Record>, ScrapeError>;
}

// ── Request planning ──────────────────────────────────────────────────────────

/// Result-page URL for one country.
/// e.g. "Bosnia And Herzegovina" → `{base}?country=Bosnia+And+Herzegovina&displayCurrency=EUR`
pub fn country_url(base_url: &str, country: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(country.as_bytes()).collect();
    format!("{}?country={}&displayCurrency={}", base_url, encoded, DISPLAY_CURRENCY)
}

/// One target per country, same order, duplicates included.
pub fn plan_targets(base_url: &str, countries: &[String]) -> Vec<FetchTarget> {
    countries
        .iter()
        .map(|name| FetchTarget {
            name: name.clone(),
            url: country_url(base_url, name),
        })
        .collect()
}

// ── numbeo scraper ────────────────────────────────────────────────────────────

pub struct NumbeoScraper<S = HttpClient> {
    source: S,
    index_url: String,
    country_url: String,
}

impl NumbeoScraper<HttpClient> {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self::with_source(HttpClient::new(config)?, config))
    }
}

impl<S: PageSource> NumbeoScraper<S> {
    pub fn with_source(source: S, config: &ScraperConfig) -> Self {
        Self {
            source,
            index_url: config.index_url.clone(),
            country_url: config.country_url.clone(),
        }
    }
}

#[async_trait]
impl<S: PageSource> PropertyDataSource for NumbeoScraper<S> {
    async fn discover_countries(&self) -> Result<Vec<String>, ScrapeError> {
        info!("Fetching country index ({})", self.index_url);

        let html = self.source.get_text(&self.index_url).await?;
        let countries = parse_country_index(&html, &self.index_url)?;

        info!("{} countries found", countries.len());
        for name in countries.iter().take(10) {
            debug!("  {}", name);
        }
        Ok(countries)
    }

    fn country_base_url(&self) -> &str {
        &self.country_url
    }

    async fn fetch_country(&self, target: &FetchTarget) -> Result<Vec<Record>, ScrapeError> {
        debug!("Fetching country page: {}", target.url);

        let html = self.source.get_text(&target.url).await?;
        let page = parse_country_page(&html, &target.name)?;

        if page.tables == 0 {
            warn!("{}: no `{}` table on page", target.name, DATA_TABLE.css());
        } else {
            debug!("{}: {} tables, {} rows", target.name, page.tables, page.records.len());
        }

        Ok(page.records)
    }
}
