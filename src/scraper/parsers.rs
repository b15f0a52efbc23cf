use crate::models::Record;
use scraper::{ElementRef, Html, Selector};

use super::error::ScrapeError;

// ── Markup contract ───────────────────────────────────────────────────────────

/// A tag name plus the classes an element must all carry.
#[derive(Debug, Clone, Copy)]
pub struct TagClass {
    pub tag: &'static str,
    pub classes: &'static [&'static str],
}

impl TagClass {
    pub const fn new(tag: &'static str, classes: &'static [&'static str]) -> Self {
        Self { tag, classes }
    }

    /// `table` + `["a", "b"]` → `table.a.b`
    pub fn css(&self) -> String {
        let mut css = self.tag.to_string();
        for class in self.classes {
            css.push('.');
            css.push_str(class);
        }
        css
    }

    pub fn selector(&self) -> Result<Selector, ScrapeError> {
        selector(&self.css())
    }
}

/// Country list on the index page.
pub const COUNTRY_LIST: TagClass = TagClass::new("table", &["related_links"]);
/// Data tables on a country page.
pub const DATA_TABLE: TagClass = TagClass::new("table", &["data_wide_table", "new_bar_table"]);
/// Header cell that opens a new category.
pub const CATEGORY_HEADER: TagClass = TagClass::new("th", &["highlighted_th"]);
/// Title element inside a category header cell.
pub const CATEGORY_TITLE: TagClass = TagClass::new("div", &["category_title"]);

const COUNTRY_LINK: &str = "a[href]";
const ROW: &str = "tr";
const DATA_CELL: &str = "td";

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{}: {:?}", css, e)))
}

// ── Parsed document ───────────────────────────────────────────────────────────

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// First element (document order) matching `target`.
    pub fn find_first(&self, target: &TagClass) -> Result<Option<ElementRef<'_>>, ScrapeError> {
        let sel = target.selector()?;
        Ok(self.html.select(&sel).next())
    }

    /// Every element matching `target`, in document order.
    pub fn find_all(&self, target: &TagClass) -> Result<Vec<ElementRef<'_>>, ScrapeError> {
        let sel = target.selector()?;
        Ok(self.html.select(&sel).collect())
    }
}

/// Visible text of an element: each text node trimmed, empty ones dropped,
/// the rest concatenated.
pub fn visible_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Visible text with non-breaking spaces turned into ordinary spaces.
fn display_text(el: ElementRef<'_>) -> String {
    visible_text(el).replace('\u{a0}', " ")
}

// ── Index page ────────────────────────────────────────────────────────────────

/// Country names from the `related_links` table, in link order.
/// Duplicates are kept.
pub fn parse_country_index(html: &str, url: &str) -> Result<Vec<String>, ScrapeError> {
    let doc = Document::parse(html);

    let Some(table) = doc.find_first(&COUNTRY_LIST)? else {
        return Err(ScrapeError::Structure {
            url: url.to_string(),
            selector: COUNTRY_LIST.css(),
        });
    };

    let link_sel = selector(COUNTRY_LINK)?;
    Ok(table
        .select(&link_sel)
        .map(visible_text)
        .filter(|name| !name.is_empty())
        .collect())
}

// ── Country page ──────────────────────────────────────────────────────────────

/// Result of scanning one country page.
#[derive(Debug, Default)]
pub struct CountryPage {
    /// Number of data tables found. Zero means the page carries no data.
    pub tables: usize,
    pub records: Vec<Record>,
}

enum RowKind {
    /// Category header; the title is absent or blank on some decorative headers.
    Category(Option<String>),
    Data { item: String, value: String, range: String },
    Skip,
}

struct RowSelectors {
    row: Selector,
    header: Selector,
    title: Selector,
    cell: Selector,
}

impl RowSelectors {
    fn new() -> Result<Self, ScrapeError> {
        Ok(Self {
            row: selector(ROW)?,
            header: CATEGORY_HEADER.selector()?,
            title: CATEGORY_TITLE.selector()?,
            cell: selector(DATA_CELL)?,
        })
    }

    fn classify(&self, row: ElementRef<'_>) -> RowKind {
        if let Some(th) = row.select(&self.header).next() {
            let title = th
                .select(&self.title)
                .next()
                .map(visible_text)
                .filter(|t| !t.is_empty());
            return RowKind::Category(title);
        }

        let cells: Vec<ElementRef<'_>> = row.select(&self.cell).collect();
        if cells.len() < 2 {
            return RowKind::Skip;
        }

        RowKind::Data {
            item: visible_text(cells[0]),
            value: display_text(cells[1]),
            range: cells.get(2).map(|c| display_text(*c)).unwrap_or_default(),
        }
    }
}

/// Scan every data table of a country page, in document order.
pub fn parse_country_page(html: &str, country: &str) -> Result<CountryPage, ScrapeError> {
    let doc = Document::parse(html);
    let tables = doc.find_all(&DATA_TABLE)?;
    let sels = RowSelectors::new()?;

    let records = tables
        .iter()
        .flat_map(|table| scan_table(country, *table, &sels))
        .collect();

    Ok(CountryPage { tables: tables.len(), records })
}

/// Single pass over the rows of one table, carrying the current category.
/// The category starts unset for every table.
fn scan_table(country: &str, table: ElementRef<'_>, sels: &RowSelectors) -> Vec<Record> {
    let (_, records) = table.select(&sels.row).fold(
        (None::<String>, Vec::new()),
        |(category, mut records), row| match sels.classify(row) {
            RowKind::Category(Some(title)) => (Some(title), records),
            RowKind::Category(None) | RowKind::Skip => (category, records),
            RowKind::Data { item, value, range } => {
                records.push(Record {
                    country: country.to_string(),
                    category: category.clone(),
                    item,
                    value,
                    range,
                });
                (category, records)
            }
        },
    );
    records
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn page(tables: &[&str]) -> String {
        let body: String = tables
            .iter()
            .map(|rows| format!("<table class=\"data_wide_table new_bar_table\">{}</table>", rows))
            .collect();
        format!("<html><body>{}</body></html>", body)
    }

    fn header(title: &str) -> String {
        format!("<tr><th class=\"highlighted_th\" colspan=\"3\"><div class=\"category_title\">{}</div></th></tr>", title)
    }

    fn row(cells: &[&str]) -> String {
        let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        format!("<tr>{}</tr>", tds)
    }

    #[test]
    fn index_collects_links_in_order_with_duplicates() {
        let html = r#"<html><body>
            <table class="related_links"><tr>
              <td><a href="/a">France</a></td>
              <td><a href="/b"> Germany </a></td>
              <td><a href="/c">   </a></td>
              <td><a>No href</a></td>
              <td><a href="/a">France</a></td>
            </tr></table>
            <a href="/outside">Elsewhere</a>
        </body></html>"#;

        let names = parse_country_index(html, "https://x/").unwrap();
        assert_eq!(names, vec!["France", "Germany", "France"]);
    }

    #[test]
    fn index_without_country_table_is_a_structure_error() {
        let err = parse_country_index("<html><body><table></table></body></html>", "https://x/")
            .unwrap_err();
        match err {
            ScrapeError::Structure { url, selector } => {
                assert_eq!(url, "https://x/");
                assert_eq!(selector, "table.related_links");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn page_without_data_tables_is_empty_not_an_error() {
        let parsed = parse_country_page("<html><body><p>No data</p></body></html>", "Atlantis").unwrap();
        assert_eq!(parsed.tables, 0);
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn leading_rows_have_no_category_and_headers_are_inherited() {
        let rows = format!(
            "{}{}{}{}",
            row(&["Gross Rental Yield", "4.5 %"]),
            header("Rent"),
            row(&["Apartment (1 bedroom) in City Centre", "1 000 €", "800 € - 1 300 €"]),
            row(&["Apartment (3 bedrooms) in City Centre", "2 000 €", "1 500 € - 2 500 €"]),
        );
        let parsed = parse_country_page(&page(&[rows.as_str()]), "France").unwrap();

        let categories: Vec<Option<&str>> =
            parsed.records.iter().map(|r| r.category.as_deref()).collect();
        assert_eq!(categories, vec![None, Some("Rent"), Some("Rent")]);
    }

    #[test]
    fn reference_row_is_extracted_verbatim() {
        let rows = format!(
            "{}{}",
            header("Rent"),
            row(&["Apartment (1 bedroom) in City Centre", "1 000 €", "800 € - 1 300 €"]),
        );
        let parsed = parse_country_page(&page(&[rows.as_str()]), "France").unwrap();

        assert_eq!(
            parsed.records,
            vec![Record {
                country: "France".into(),
                category: Some("Rent".into()),
                item: "Apartment (1 bedroom) in City Centre".into(),
                value: "1 000 €".into(),
                range: "800 € - 1 300 €".into(),
            }]
        );
    }

    #[test]
    fn cell_count_decides_drop_and_range() {
        let rows = format!(
            "{}{}{}{}",
            row(&["Lonely cell"]),
            row(&["Two cells", "10 €"]),
            row(&["Three cells", "20 €", "15 € - 25 €"]),
            row(&["Four cells", "30 €", "25 € - 35 €", "ignored"]),
        );
        let parsed = parse_country_page(&page(&[rows.as_str()]), "Spain").unwrap();

        let got: Vec<(&str, &str)> =
            parsed.records.iter().map(|r| (r.item.as_str(), r.range.as_str())).collect();
        assert_eq!(
            got,
            vec![("Two cells", ""), ("Three cells", "15 € - 25 €"), ("Four cells", "25 € - 35 €")]
        );
    }

    #[test]
    fn non_breaking_spaces_are_normalised() {
        let rows = row(&["Price", "1&nbsp;234,50&nbsp;€", "1&nbsp;000&nbsp;€ - 2&nbsp;000&nbsp;€"]);
        let parsed = parse_country_page(&page(&[rows.as_str()]), "Belgium").unwrap();

        let rec = &parsed.records[0];
        assert_eq!(rec.value, "1 234,50 €");
        assert_eq!(rec.range, "1 000 € - 2 000 €");
        assert!(!rec.value.contains('\u{a0}'));
        assert!(!rec.range.contains('\u{a0}'));
    }

    #[test]
    fn category_resets_between_tables() {
        let first = format!("{}{}", header("Rent"), row(&["A", "1 €"]));
        let second = row(&["B", "2 €"]);
        let parsed = parse_country_page(&page(&[first.as_str(), second.as_str()]), "Italy").unwrap();

        assert_eq!(parsed.tables, 2);
        assert_eq!(parsed.records[0].category.as_deref(), Some("Rent"));
        assert_eq!(parsed.records[1].category, None);
    }

    #[test]
    fn header_without_title_keeps_previous_category() {
        let rows = format!(
            "{}{}{}",
            header("Buy"),
            "<tr><th class=\"highlighted_th\">&nbsp;</th></tr>",
            row(&["Price per m2", "5 000 €"]),
        );
        let parsed = parse_country_page(&page(&[rows.as_str()]), "Austria").unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].category.as_deref(), Some("Buy"));
    }

    #[test]
    fn blank_title_keeps_previous_category() {
        let rows = format!(
            "{}{}{}{}",
            header("Rent"),
            header(""),
            header("  "),
            row(&["Gross rental yield", "4,50 %"]),
        );
        let parsed = parse_country_page(&page(&[rows.as_str()]), "Greece").unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].category.as_deref(), Some("Rent"));
    }

    #[test]
    fn blank_title_on_first_header_leaves_rows_uncategorised() {
        let rows = format!("{}{}", header(""), row(&["Gross rental yield", "4,50 %"]));
        let parsed = parse_country_page(&page(&[rows.as_str()]), "Greece").unwrap();

        assert_eq!(parsed.records[0].category, None);
    }

    #[test]
    fn tables_without_both_marker_classes_are_ignored() {
        let html = format!(
            "<html><body><table class=\"data_wide_table\">{}</table></body></html>",
            row(&["A", "1 €"])
        );
        let parsed = parse_country_page(&html, "Malta").unwrap();
        assert_eq!(parsed.tables, 0);
    }

    #[test]
    fn tag_class_renders_compound_selector() {
        assert_eq!(DATA_TABLE.css(), "table.data_wide_table.new_bar_table");
        assert_eq!(CATEGORY_TITLE.css(), "div.category_title");
    }
}
