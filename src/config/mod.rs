use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Page listing every country (the `related_links` table).
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Per-country result page; `country` and `displayCurrency` are appended.
    #[serde(default = "default_country_url")]
    pub country_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum spacing between the end of one request and the start of the next.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    #[serde(default)]
    pub jitter_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

/// Output files and column labels
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_raw_csv")]
    pub raw_csv: PathBuf,

    #[serde(default = "default_clean_csv")]
    pub clean_csv: PathBuf,

    #[serde(default)]
    pub headers: ColumnLabels,
}

/// Header labels written to the CSV files. Presentation only; columns are
/// always written in this order.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnLabels {
    pub country: String,
    pub category: String,
    pub item: String,
    pub value: String,
    pub range: String,
}

/// Regression demo configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_target_item")]
    pub target_item: String,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_index_url() -> String {
    "https://www.numbeo.com/property-investment/".to_string()
}
fn default_country_url() -> String {
    "https://www.numbeo.com/property-investment/country_result.jsp".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_max_retries() -> usize {
    2
}
fn default_retry_base_ms() -> u64 {
    500
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
        .to_string()
}
fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}
fn default_raw_csv() -> PathBuf {
    PathBuf::from("data/numbeo_property_raw.csv")
}
fn default_clean_csv() -> PathBuf {
    PathBuf::from("data/numbeo_property_clean.csv")
}
fn default_test_ratio() -> f64 {
    0.2
}
fn default_seed() -> u64 {
    42
}
fn default_target_item() -> String {
    "price per square meter to buy apartment in city centre".to_string()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            country_url: default_country_url(),
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            jitter_ms: 0,
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_csv: default_raw_csv(),
            clean_csv: default_clean_csv(),
            headers: ColumnLabels::default(),
        }
    }
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            country: "Country".to_string(),
            category: "Category".to_string(),
            item: "Item".to_string(),
            value: "Value".to_string(),
            range: "Range".to_string(),
        }
    }
}

impl ColumnLabels {
    pub fn as_row(&self) -> [&str; 5] {
        [
            self.country.as_str(),
            self.category.as_str(),
            self.item.as_str(),
            self.value.as_str(),
            self.range.as_str(),
        ]
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            test_ratio: default_test_ratio(),
            seed: default_seed(),
            target_item: default_target_item(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("NUMBEO").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        cfg.try_deserialize()
            .context("Invalid configuration")
    }
}
