use serde::Serialize;

// ── Fetch target ──────────────────────────────────────────────────────────────

/// One country and the fully-qualified URL of its result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub name: String,
    pub url: String,
}

// ── Scraped row ───────────────────────────────────────────────────────────────

/// One data row of a country page, values kept exactly as displayed.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Record {
    pub country: String,
    /// `None` for rows that precede the first category header of a table.
    pub category: Option<String>,
    pub item: String,
    pub value: String,
    pub range: String,
}

// ── Cleaned row ───────────────────────────────────────────────────────────────

/// A record after numeric normalisation; only rows with a usable value survive.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CleanRecord {
    pub country: String,
    pub category: Option<String>,
    pub item: String,
    pub value: String,
    pub range: String,
    pub value_clean: f64,
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
}
