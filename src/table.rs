//! In-memory operations over the record table.
//!
//! Every function here expects and preserves the table invariant: rows sorted
//! ascending by date, at most one row per date.

use crate::models::DailyRecord;
use chrono::NaiveDate;
use serde::Deserialize;

/// Insert or replace the row for `record.date`. Returns `true` when a new row
/// was inserted.
pub fn upsert_record(records: &mut Vec<DailyRecord>, record: DailyRecord) -> bool {
    match records.binary_search_by_key(&record.date, |row| row.date) {
        Ok(idx) => {
            records[idx] = record;
            false
        }
        Err(idx) => {
            records.insert(idx, record);
            true
        }
    }
}

/// Remove the row for `date`. Returns `false` if there was none.
pub fn remove_record(records: &mut Vec<DailyRecord>, date: NaiveDate) -> bool {
    match records.binary_search_by_key(&date, |row| row.date) {
        Ok(idx) => {
            records.remove(idx);
            true
        }
        Err(_) => false,
    }
}

pub fn find_record(records: &[DailyRecord], date: NaiveDate) -> Option<&DailyRecord> {
    records
        .binary_search_by_key(&date, |row| row.date)
        .ok()
        .map(|idx| &records[idx])
}

/// Rows whose date lies in `[from, to]`; a missing bound is open on that side.
pub fn filter_range(
    records: &[DailyRecord],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<DailyRecord> {
    records
        .iter()
        .filter(|row| from.is_none_or(|from| row.date >= from))
        .filter(|row| to.is_none_or(|to| row.date <= to))
        .cloned()
        .collect()
}

/// Category narrowing used by the filter view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    All,
    WithOpened,
    WithClosed,
    WithInProgress,
}

impl Category {
    pub fn matches(self, record: &DailyRecord) -> bool {
        match self {
            Category::All => true,
            Category::WithOpened => record.opened > 0,
            Category::WithClosed => record.closed > 0,
            Category::WithInProgress => record.in_progress > 0,
        }
    }
}

pub fn filter_category(records: Vec<DailyRecord>, category: Category) -> Vec<DailyRecord> {
    records
        .into_iter()
        .filter(|row| category.matches(row))
        .collect()
}
