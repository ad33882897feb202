//! Column layouts for the campaign tables and conversions to and from records.

use std::path::Path;

use chrono::NaiveDate;

use crate::error::PersistenceError;
use crate::parser::text::parse_date;
use crate::records::{split_list, CampaignUrl, RawCampaignRecord, UniqueCampaignRecord, LIST_SEP, UNKNOWN};
use crate::table::{Cell, Table};

pub const TITLE: &str = "Title";
pub const DAYS_TO_GO: &str = "Days to Go";
pub const AMOUNT_RAISED: &str = "Amount Raised";
pub const TARGET_AMOUNT: &str = "Target Amount";
pub const CATEGORIES: &str = "Categories";
pub const URL: &str = "URL";
pub const SOURCE_CATEGORY: &str = "Source Category";
pub const CATEGORY_APPEARANCES: &str = "Category Appearances";
pub const COMPLETION_PERCENTAGE: &str = "Completion Percentage";
pub const START_DATE: &str = "Start Date";
pub const END_DATE: &str = "End Date";
pub const NUMBER_OF_DONORS: &str = "Number of Donors";
pub const PERCENTAGE_COMPLETION: &str = "Percentage Completion";
pub const DAYS_LEFT: &str = "Days Left";
pub const DAYS_ACTIVE: &str = "Days Active";

const LISTING_COLUMNS: &[&str] = &[TITLE, DAYS_TO_GO, AMOUNT_RAISED, TARGET_AMOUNT, CATEGORIES, URL, SOURCE_CATEGORY];
const DETAIL_COLUMNS: &[&str] = &[
    START_DATE,
    END_DATE,
    NUMBER_OF_DONORS,
    PERCENTAGE_COMPLETION,
    DAYS_LEFT,
    DAYS_ACTIVE,
];
const REQUIRED: &[&str] = &[TITLE, URL, SOURCE_CATEGORY];

/// Every sighting, one row each, in traversal order.
pub fn all_table(raw: &[RawCampaignRecord]) -> Table {
    let mut headers = LISTING_COLUMNS.to_vec();
    headers.push(COMPLETION_PERCENTAGE);
    let mut table = Table::new(&headers);
    for r in raw {
        table.push(vec![
            Cell::text(r.title.as_str()),
            Cell::opt_int(r.days_to_go),
            Cell::opt_number(r.amount_raised),
            Cell::opt_number(r.target_amount),
            Cell::text(r.category_tags.join(LIST_SEP)),
            Cell::text(r.url.to_string()),
            Cell::text(r.source_label.as_str()),
            Cell::opt_number(r.completion_percentage()),
        ]);
    }
    table
}

pub fn unique_table(records: &[UniqueCampaignRecord]) -> Table {
    build(records, false)
}

/// Unique table plus the detail columns filled in by enrichment.
pub fn detailed_table(records: &[UniqueCampaignRecord]) -> Table {
    build(records, true)
}

fn build(records: &[UniqueCampaignRecord], detail: bool) -> Table {
    let mut headers = LISTING_COLUMNS.to_vec();
    headers.extend([CATEGORY_APPEARANCES, COMPLETION_PERCENTAGE]);
    if detail {
        headers.extend_from_slice(DETAIL_COLUMNS);
    }
    let mut table = Table::new(&headers);
    for r in records {
        let mut row = vec![
            Cell::text(r.title.as_str()),
            Cell::opt_int(r.days_to_go),
            Cell::opt_number(r.amount_raised),
            Cell::opt_number(r.target_amount),
            Cell::text(r.category_tags.join(LIST_SEP)),
            Cell::text(r.url.to_string()),
            Cell::text(r.source_labels.join(LIST_SEP)),
            Cell::Int(r.sighting_count as i64),
            Cell::opt_number(r.completion_percentage),
        ];
        if detail {
            row.extend([
                date_cell(r.start_date),
                date_cell(r.end_date),
                Cell::opt_int(r.number_of_donors),
                Cell::opt_number(r.percentage_completion),
                Cell::opt_int(r.days_left),
                Cell::opt_int(r.days_active),
            ]);
        }
        table.push(row);
    }
    table
}

fn date_cell(date: Option<NaiveDate>) -> Cell {
    date.map(|d| Cell::text(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Cell::Empty)
}

/// Rebuild records from a persisted unique (or detailed) table.
///
/// Detail columns are read when present so a detailed table can be enriched
/// again. Completion is recomputed from the amounts.
pub fn records_from_table(table: &Table, path: &Path) -> Result<Vec<UniqueCampaignRecord>, PersistenceError> {
    for &column in REQUIRED {
        if table.column(column).is_none() {
            return Err(PersistenceError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    let cols = Columns::locate(table);
    let records = table.rows.iter().map(|row| cols.record(row)).collect();
    Ok(records)
}

struct Columns {
    title: Option<usize>,
    days_to_go: Option<usize>,
    amount_raised: Option<usize>,
    target_amount: Option<usize>,
    categories: Option<usize>,
    url: Option<usize>,
    source_category: Option<usize>,
    appearances: Option<usize>,
    start_date: Option<usize>,
    end_date: Option<usize>,
    donors: Option<usize>,
    percentage: Option<usize>,
    days_left: Option<usize>,
    days_active: Option<usize>,
}

impl Columns {
    fn locate(table: &Table) -> Self {
        Columns {
            title: table.column(TITLE),
            days_to_go: table.column(DAYS_TO_GO),
            amount_raised: table.column(AMOUNT_RAISED),
            target_amount: table.column(TARGET_AMOUNT),
            categories: table.column(CATEGORIES),
            url: table.column(URL),
            source_category: table.column(SOURCE_CATEGORY),
            appearances: table.column(CATEGORY_APPEARANCES),
            start_date: table.column(START_DATE),
            end_date: table.column(END_DATE),
            donors: table.column(NUMBER_OF_DONORS),
            percentage: table.column(PERCENTAGE_COMPLETION),
            days_left: table.column(DAYS_LEFT),
            days_active: table.column(DAYS_ACTIVE),
        }
    }

    fn record(&self, row: &[Cell]) -> UniqueCampaignRecord {
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i));
        let text = |idx| cell(idx).map(Cell::as_text).unwrap_or_default();
        let int = |idx| cell(idx).and_then(Cell::as_i64);
        let num = |idx| cell(idx).and_then(Cell::as_f64);
        let date = |idx| cell(idx).and_then(|c| parse_date(&c.as_text()));

        let title = text(self.title);
        let mut record = UniqueCampaignRecord {
            title: if title.is_empty() { UNKNOWN.to_string() } else { title },
            url: CampaignUrl::from_cell(&text(self.url)),
            days_to_go: int(self.days_to_go),
            amount_raised: num(self.amount_raised),
            target_amount: num(self.target_amount),
            category_tags: split_list(&text(self.categories)),
            source_labels: split_list(&text(self.source_category)),
            sighting_count: int(self.appearances).filter(|n| *n >= 1).unwrap_or(1) as usize,
            completion_percentage: None,
            start_date: date(self.start_date),
            end_date: date(self.end_date),
            number_of_donors: int(self.donors),
            percentage_completion: num(self.percentage),
            days_left: int(self.days_left),
            days_active: int(self.days_active),
        };
        record.refresh_completion();
        record
    }
}
