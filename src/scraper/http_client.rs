use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

use super::PageSource;
use super::error::FetchError;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub struct HttpClient {
    inner: reqwest::Client,
    max_retries: usize,
    retry_base_ms: u64,
    min_gap: Duration,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("Invalid Accept-Language header")?,
        );

        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            max_retries: config.max_retries,
            retry_base_ms: config.retry_base_ms,
            min_gap: Duration::from_millis(config.request_delay_ms),
        })
    }

    /// Backoff schedule: base, 2×base, 4×base… each scaled by random jitter.
    /// A retry never comes sooner than the request spacing.
    fn retry_strategy(&self) -> impl Iterator<Item = Duration> + Send {
        let min_gap = self.min_gap;
        ExponentialBackoff::from_millis(2)
            .factor((self.retry_base_ms / 2).max(1))
            .max_delay(Duration::from_secs(30))
            .map(jitter)
            .map(move |d| d.max(min_gap))
            .take(self.max_retries)
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let resp = self.inner.get(url).send().await.map_err(|e| transport(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let err = FetchError::Status { url: url.to_string(), status: status.as_u16() };
            if err.is_transient() {
                warn!("{} answered {}, backing off", url, status);
            }
            return Err(err);
        }

        resp.text().await.map_err(|e| transport(url, e))
    }
}

fn transport(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Transport { url: url.to_string(), source: Box::new(e) }
    }
}

#[async_trait]
impl PageSource for HttpClient {
    /// Fetch a URL as text, retrying transient failures.
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        RetryIf::spawn(
            self.retry_strategy(),
            || self.get_once(url),
            FetchError::is_transient,
        )
        .await
    }
}
