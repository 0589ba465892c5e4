use crate::error::ParseError;
use crate::facility::FacilityDirectory;
use intouch_core::ScrapedRecord;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Number of cells in a data row: number, name, date of birth, facility.
const ROW_CELLS: usize = 4;

fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("valid static selector"))
}

fn table_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    selector(&SELECTOR, "table")
}

fn row_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    selector(&SELECTOR, "tr")
}

fn cell_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    selector(&SELECTOR, "td")
}

/// Turns a results table into scraped records with resolved facilities.
pub struct RosterParser<'a> {
    facilities: &'a FacilityDirectory,
}

impl<'a> RosterParser<'a> {
    pub fn new(facilities: &'a FacilityDirectory) -> Self {
        Self { facilities }
    }

    /// Parse the serialized results table.
    ///
    /// Rows without exactly four data cells (headers, spacers, pagination)
    /// are skipped, as are rows whose facility text matches no known
    /// facility. Output preserves row order.
    pub fn parse(&self, markup: &str) -> Result<Vec<ScrapedRecord>, ParseError> {
        let fragment = Html::parse_fragment(markup);
        if fragment.select(table_selector()).next().is_none() {
            return Err(ParseError::MissingTable);
        }

        let mut records = Vec::new();
        for row in fragment.select(row_selector()) {
            let cells: Vec<String> = row.select(cell_selector()).map(cell_text).collect();
            let [number, name, dob, facility_text] = match <[String; ROW_CELLS]>::try_from(cells) {
                Ok(cells) => cells,
                Err(_) => continue,
            };

            let Some(facility) = self.facilities.resolve(&facility_text) else {
                tracing::debug!(
                    inmate_number = number.trim(),
                    facility = facility_text.trim(),
                    "Dropping row with unknown facility"
                );
                continue;
            };

            let (first_name, last_name) = format_name(&name);
            records.push(ScrapedRecord {
                inmate_number: number.trim().to_string(),
                first_name,
                last_name,
                date_of_birth: dob.trim().to_string(),
                facility: facility.name.clone(),
            });
        }

        Ok(records)
    }
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect()
}

/// Split a `"LAST,FIRST"` cell into title-cased `(first, last)`.
///
/// Without a comma the whole cell is the last name.
fn format_name(raw: &str) -> (String, String) {
    let (last, first) = raw.split_once(',').unwrap_or((raw, ""));
    (style_name(first), style_name(last))
}

fn style_name(name: &str) -> String {
    title_case(&normalize_ws(name).to_lowercase())
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Upper-case the first letter of every word. A word starts after any
/// character that is not alphanumeric or `_`, so `o'brien` becomes `O'Brien`.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = !(ch.is_alphanumeric() || ch == '_');
    }
    out
}
