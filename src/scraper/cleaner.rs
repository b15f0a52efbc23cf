use crate::models::{CleanRecord, Record};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

// ── Patterns ──────────────────────────────────────────────────────────────────

/// A number with optional space / comma / dot grouping: "1 300", "1,234.56", "3,5".
const NUMBER: &str = r"[-+]?\d+(?:[ \u{a0}.,]\d+)*";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NUMBER).expect("number pattern compiles"));

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({NUMBER})\s*-\s*({NUMBER})")).expect("range pattern compiles")
});

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Drop currency symbols so they cannot split or glue numeric tokens.
fn strip_currency(s: &str) -> String {
    s.chars()
        .filter(|&c| !matches!(c, '€' | '$' | '£' | '¥' | '₹' | '₽' | '₺'))
        .collect()
}

/// Turn one matched token into an f64, deciding which separator is decimal.
/// "1 000" → 1000 | "1,234.56" → 1234.56 | "1.234,56" → 1234.56
/// "3,5" → 3.5 | "12,000" → 12000 | "4.50" → 4.5
fn parse_token(token: &str) -> Option<f64> {
    let compact: String = token.chars().filter(|&c| !matches!(c, ' ' | '\u{a0}')).collect();

    let last_comma = compact.rfind(',');
    let last_dot = compact.rfind('.');

    let normalised = match (last_comma, last_dot) {
        (Some(c), Some(d)) => {
            // Whichever comes last is the decimal mark.
            let mark = c.max(d);
            let int_part: String =
                compact[..mark].chars().filter(|&ch| !matches!(ch, '.' | ',')).collect();
            format!("{}.{}", int_part, &compact[mark + 1..])
        }
        (Some(_), None) => resolve_single_separator(&compact, ','),
        (None, Some(_)) => resolve_single_separator(&compact, '.'),
        (None, None) => compact,
    };

    normalised.parse().ok()
}

/// Only one kind of separator present. Repeated, or followed by exactly three
/// digits when it is a comma, means grouping; otherwise it is the decimal mark.
fn resolve_single_separator(s: &str, sep: char) -> String {
    let count = s.matches(sep).count();
    let tail_len = s.rsplit(sep).next().map(str::len).unwrap_or(0);

    let grouping = count > 1 || (sep == ',' && tail_len == 3);
    if grouping {
        s.replace(sep, "")
    } else {
        s.replace(sep, ".")
    }
}

/// First number of a displayed value.
/// "1 000 €" → 1000.0 | "800 € - 1 300 €" → 800.0 | "?" → None
pub fn clean_value(raw: &str) -> Option<f64> {
    let s = strip_currency(raw);
    let token = NUMBER_RE.find(s.trim())?;
    parse_token(token.as_str())
}

/// "min - max" bounds of a displayed range.
/// "800 € - 1 300 €" → (800.0, 1300.0) | "" → None
pub fn clean_range(raw: &str) -> Option<(f64, f64)> {
    let s = strip_currency(raw);
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let caps = RANGE_RE.captures(s)?;
    let min = parse_token(caps.get(1)?.as_str())?;
    let max = parse_token(caps.get(2)?.as_str())?;
    Some((min, max))
}

fn normalise_label(s: &str) -> String {
    s.trim().to_lowercase()
}

// ── Record → CleanRecord ──────────────────────────────────────────────────────

pub fn clean_record(record: &Record) -> Option<CleanRecord> {
    let value_clean = clean_value(&record.value)?;
    let range = clean_range(&record.range);

    Some(CleanRecord {
        country: normalise_label(&record.country),
        category: record.category.as_deref().map(normalise_label),
        item: normalise_label(&record.item),
        value: record.value.clone(),
        range: record.range.clone(),
        value_clean,
        range_min: range.map(|(min, _)| min),
        range_max: range.map(|(_, max)| max),
    })
}

/// Clean every record, dropping those without a numeric value.
pub fn clean_records(records: &[Record]) -> Vec<CleanRecord> {
    let cleaned: Vec<CleanRecord> = records.iter().filter_map(clean_record).collect();
    debug!("cleaned {} of {} records", cleaned.len(), records.len());
    cleaned
}

// ── Tests ─────────────────────────────────────────────────────────────────────
