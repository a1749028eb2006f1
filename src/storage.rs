//! Spreadsheet-backed record store.
//!
//! Every operation re-reads the backing file, works on the table in memory and
//! rewrites the whole file. Nothing here locks the file: callers must ensure a
//! single writer (the server does so through [`crate::state::AppState`]).
//! Two processes writing the same file will lose updates.

use crate::errors::StoreError;
use crate::models::DailyRecord;
use crate::table::{filter_range, remove_record, upsert_record};
use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rust_xlsxwriter::Workbook;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const COL_DATE: &str = "data";
pub const COL_OPENED: &str = "tickets_iniciados";
pub const COL_CLOSED: &str = "tickets_finalizados";
pub const COL_IN_PROGRESS: &str = "tickets_andamento";
pub const COL_LINKS: &str = "links_chamados";

pub const HEADERS: [&str; 5] = [COL_DATE, COL_OPENED, COL_CLOSED, COL_IN_PROGRESS, COL_LINKS];

const SHEET_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Backups keep this prefix whatever the data file is called.
pub const BACKUP_PREFIX: &str = "backup_dados_tickets_";

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the backing file with just a header row if it is missing.
    pub fn initialize(&self) -> bool {
        match self.try_initialize() {
            Ok(_) => true,
            Err(err) => {
                error!("failed to create {}: {err}", self.path.display());
                false
            }
        }
    }

    /// Returns `true` when the file had to be created.
    pub fn try_initialize(&self) -> Result<bool, StoreError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.save(&[])?;
        info!("created data file {}", self.path.display());
        Ok(true)
    }

    /// The whole table, sorted by date. Failures are logged and yield an
    /// empty table.
    pub fn load(&self) -> Vec<DailyRecord> {
        match self.try_load() {
            Ok(records) => records,
            Err(err) => {
                error!("failed to load {}: {err}", self.path.display());
                Vec::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<Vec<DailyRecord>, StoreError> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() == 0 => return Ok(Vec::new()),
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        }

        let mut workbook: Xlsx<_> = open_workbook(&self.path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(StoreError::MissingSheet)??;
        parse_sheet(&range)
    }

    /// Insert or overwrite the row for `record.date`.
    pub fn upsert(&self, record: DailyRecord) -> bool {
        let date = record.date;
        match self.try_upsert(record) {
            Ok(_) => true,
            Err(err) => {
                error!("failed to save record for {date}: {err}");
                false
            }
        }
    }

    /// Returns `true` when a new row was created rather than replaced.
    pub fn try_upsert(&self, record: DailyRecord) -> Result<bool, StoreError> {
        let mut records = self.try_load()?;
        let created = upsert_record(&mut records, record);
        self.save(&records)?;
        Ok(created)
    }

    /// Remove the row for `date`. `false` when there is no such row or the
    /// file could not be rewritten.
    pub fn delete(&self, date: NaiveDate) -> bool {
        match self.try_delete(date) {
            Ok(removed) => removed,
            Err(err) => {
                error!("failed to delete record for {date}: {err}");
                false
            }
        }
    }

    pub fn try_delete(&self, date: NaiveDate) -> Result<bool, StoreError> {
        let mut records = self.try_load()?;
        if !remove_record(&mut records, date) {
            return Ok(false);
        }
        self.save(&records)?;
        Ok(true)
    }

    pub fn filter(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<DailyRecord> {
        filter_range(&self.load(), from, to)
    }

    /// CSV rendering with `DD/MM/YYYY` dates; empty string for an empty table.
    pub fn export_text(&self) -> String {
        match self.try_export_text() {
            Ok(text) => text,
            Err(err) => {
                error!("failed to export {}: {err}", self.path.display());
                String::new()
            }
        }
    }

    pub fn try_export_text(&self) -> Result<String, StoreError> {
        export_csv(&self.try_load()?)
    }

    /// Copy the backing file to a timestamped sibling.
    pub fn snapshot(&self) -> bool {
        match self.try_snapshot() {
            Ok(_) => true,
            Err(err) => {
                error!("failed to back up {}: {err}", self.path.display());
                false
            }
        }
    }

    pub fn try_snapshot(&self) -> Result<PathBuf, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::NotFound(self.path.display().to_string()));
        }
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let target = self
            .path
            .with_file_name(format!("{BACKUP_PREFIX}{timestamp}.xlsx"));
        fs::copy(&self.path, &target)?;
        info!("backup written to {}", target.display());
        Ok(target)
    }

    /// Rewrite the whole file. The workbook is rendered to a sibling temp
    /// file first and renamed over the target.
    fn save(&self, records: &[DailyRecord]) -> Result<(), StoreError> {
        let payload = render_sheet(records)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, payload)?;
        if let Err(err) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

/// `tickets_data_<YYYYMMDD>.csv`
pub fn export_file_name(day: NaiveDate) -> String {
    format!("tickets_data_{}.csv", day.format("%Y%m%d"))
}

pub fn export_csv(records: &[DailyRecord]) -> Result<String, StoreError> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADERS)?;
    for record in records {
        wtr.write_record([
            record.date.format(DISPLAY_DATE_FORMAT).to_string(),
            record.opened.to_string(),
            record.closed.to_string(),
            record.in_progress.to_string(),
            record.links.clone(),
        ])?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|err| StoreError::Io(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn render_sheet(records: &[DailyRecord]) -> Result<Vec<u8>, StoreError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }
    for (idx, record) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        worksheet.write_string(row, 0, record.date.format(SHEET_DATE_FORMAT).to_string())?;
        worksheet.write_number(row, 1, f64::from(record.opened))?;
        worksheet.write_number(row, 2, f64::from(record.closed))?;
        worksheet.write_number(row, 3, f64::from(record.in_progress))?;
        if !record.links.is_empty() {
            worksheet.write_string(row, 4, record.links.as_str())?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

static EMPTY_CELL: Data = Data::Empty;

struct Columns {
    date: usize,
    opened: usize,
    closed: usize,
    in_progress: usize,
    links: Option<usize>,
}

impl Columns {
    fn locate(header: &[Data]) -> Result<Self, StoreError> {
        let find = |name: &str| {
            header
                .iter()
                .position(|cell| cell.to_string().trim() == name)
        };
        let require =
            |name: &'static str| find(name).ok_or(StoreError::MissingColumn(name));

        Ok(Self {
            date: require(COL_DATE)?,
            opened: require(COL_OPENED)?,
            closed: require(COL_CLOSED)?,
            in_progress: require(COL_IN_PROGRESS)?,
            links: find(COL_LINKS),
        })
    }
}

/// Malformed rows are skipped with a warning; when a date repeats the later
/// row wins.
fn parse_sheet(range: &Range<Data>) -> Result<Vec<DailyRecord>, StoreError> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns = Columns::locate(header)?;

    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        match parse_row(row, &columns) {
            Ok(record) => {
                upsert_record(&mut records, record);
            }
            Err(reason) => warn!("skipping sheet row {}: {reason}", offset + 2),
        }
    }
    Ok(records)
}

fn parse_row(row: &[Data], columns: &Columns) -> Result<DailyRecord, String> {
    let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);

    let links = match columns.links.map(cell) {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };

    Ok(DailyRecord {
        date: parse_date(cell(columns.date))?,
        opened: parse_count(cell(columns.opened), COL_OPENED)?,
        closed: parse_count(cell(columns.closed), COL_CLOSED)?,
        in_progress: parse_count(cell(columns.in_progress), COL_IN_PROGRESS)?,
        links,
    })
}

fn parse_date(cell: &Data) -> Result<NaiveDate, String> {
    match cell {
        Data::String(text) | Data::DateTimeIso(text) => parse_date_text(text),
        Data::DateTime(_) => cell
            .as_date()
            .ok_or_else(|| format!("invalid date '{cell}'")),
        Data::Empty => Err("missing date".to_string()),
        other => Err(format!("invalid date '{other}'")),
    }
}

pub fn parse_date_text(text: &str) -> Result<NaiveDate, String> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, SHEET_DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, DISPLAY_DATE_FORMAT))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
        .or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date())
        })
        .map_err(|_| format!("invalid date '{text}'"))
}

fn parse_count(cell: &Data, column: &str) -> Result<u32, String> {
    match cell {
        Data::Int(value) => {
            u32::try_from(*value).map_err(|_| format!("{column} out of range: {value}"))
        }
        Data::Float(value)
            if value.fract() == 0.0 && *value >= 0.0 && *value <= f64::from(u32::MAX) =>
        {
            Ok(*value as u32)
        }
        Data::String(text) => text
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("{column} is not a count: '{text}'")),
        Data::Empty => Err(format!("{column} is empty")),
        other => Err(format!("{column} is not a count: '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn temp_store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("dados_tickets.xlsx"));
        (dir, store)
    }

    fn counts(records: &[DailyRecord]) -> Vec<(NaiveDate, u32, u32, u32)> {
        records
            .iter()
            .map(|r| (r.date, r.opened, r.closed, r.in_progress))
            .collect()
    }

    fn write_raw_sheet(path: &Path, rows: &[&[&str]]) {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if let Ok(number) = value.parse::<f64>() {
                    sheet.write_number(r as u32, c as u16, number).unwrap();
                } else if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        workbook.save(path).unwrap();
    }

    #[test]
    fn scenario_upsert_replace_and_delete() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_empty());

        assert!(store.upsert(DailyRecord::new(day(2025, 1, 1), 10, 5, 3)));
        assert_eq!(counts(&store.load()), vec![(day(2025, 1, 1), 10, 5, 3)]);

        assert!(store.upsert(DailyRecord::new(day(2025, 1, 1), 12, 5, 3)));
        assert_eq!(counts(&store.load()), vec![(day(2025, 1, 1), 12, 5, 3)]);

        assert!(store.upsert(DailyRecord::new(day(2025, 1, 2), 1, 1, 1)));
        let dates: Vec<_> = store.load().iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2025, 1, 1), day(2025, 1, 2)]);

        assert!(store.delete(day(2025, 1, 1)));
        assert_eq!(counts(&store.load()), vec![(day(2025, 1, 2), 1, 1, 1)]);
    }

    #[test]
    fn repeated_upsert_keeps_one_row() {
        let (_dir, store) = temp_store();
        let record = DailyRecord::new(day(2025, 3, 4), 7, 2, 9).with_links("https://a\nhttps://b");
        assert!(store.try_upsert(record.clone()).unwrap());
        assert!(!store.try_upsert(record.clone()).unwrap());

        assert_eq!(store.load(), vec![record]);
    }

    #[test]
    fn out_of_order_upserts_load_sorted() {
        let (_dir, store) = temp_store();
        for d in [5, 1, 3, 2, 4, 3] {
            assert!(store.upsert(DailyRecord::new(day(2025, 2, d), d, 0, 0)));
        }
        assert!(store.delete(day(2025, 2, 4)));

        let dates: Vec<_> = store.load().iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2025-02-01", "2025-02-02", "2025-02-03", "2025-02-05"]);
    }

    #[test]
    fn delete_missing_date_leaves_table_unchanged() {
        let (_dir, store) = temp_store();
        assert!(!store.delete(day(2025, 1, 1)));

        store.upsert(DailyRecord::new(day(2025, 1, 2), 1, 2, 3));
        assert!(!store.delete(day(2025, 1, 1)));
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("nested").join("dados_tickets.xlsx"));
        assert!(store.try_initialize().unwrap());
        assert!(store.path().exists());
        assert!(store.load().is_empty());

        store.upsert(DailyRecord::new(day(2025, 1, 1), 1, 0, 0));
        assert!(!store.try_initialize().unwrap());
        assert!(store.initialize());
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn empty_file_loads_as_empty_table() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), b"").unwrap();
        assert!(store.try_load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty_and_refuses_writes() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), b"not a spreadsheet").unwrap();

        assert!(store.try_load().is_err());
        assert!(store.load().is_empty());
        assert!(!store.upsert(DailyRecord::new(day(2025, 1, 1), 1, 1, 1)));
        assert_eq!(fs::read(store.path()).unwrap(), b"not a spreadsheet");
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let (_dir, store) = temp_store();
        write_raw_sheet(
            store.path(),
            &[
                &["data", "tickets_iniciados", "tickets_finalizados", "tickets_andamento"],
                &["2025-01-03", "4", "2", "1"],
                &["yesterday", "1", "1", "1"],
                &["2025-01-04", "-2", "1", "1"],
                &["2025-01-05", "many", "1", "1"],
                &["01/01/2025", "3", "3", "3"],
            ],
        );

        let records = store.load();
        assert_eq!(
            counts(&records),
            vec![(day(2025, 1, 1), 3, 3, 3), (day(2025, 1, 3), 4, 2, 1)]
        );
        assert!(records.iter().all(|r| r.links.is_empty()));
    }

    #[test]
    fn missing_required_column_fails_load() {
        let (_dir, store) = temp_store();
        write_raw_sheet(store.path(), &[&["data", "tickets_iniciados"], &["2025-01-01", "1"]]);

        match store.try_load() {
            Err(StoreError::MissingColumn(name)) => assert_eq!(name, COL_CLOSED),
            other => panic!("expected missing column, got {other:?}"),
        }
        assert!(store.load().is_empty());
    }

    #[test]
    fn filter_returns_closed_interval() {
        let (_dir, store) = temp_store();
        for d in 1..=6 {
            store.upsert(DailyRecord::new(day(2025, 1, d), d, 0, 0));
        }

        let picked = store.filter(Some(day(2025, 1, 2)), Some(day(2025, 1, 4)));
        let dates: Vec<_> = picked.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2025, 1, 2), day(2025, 1, 3), day(2025, 1, 4)]);
        assert_eq!(store.filter(None, None).len(), 6);
        assert!(store.filter(Some(day(2025, 2, 1)), None).is_empty());
    }

    #[test]
    fn export_parses_back_to_loaded_rows() {
        let (_dir, store) = temp_store();
        assert_eq!(store.export_text(), "");

        store.upsert(DailyRecord::new(day(2025, 1, 9), 3, 4, 5).with_links("a, b"));
        store.upsert(DailyRecord::new(day(2025, 1, 8), 1, 0, 2));
        let text = store.export_text();
        assert!(text.starts_with("data,tickets_iniciados,tickets_finalizados,tickets_andamento,links_chamados\n"));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let parsed: Vec<_> = reader
            .records()
            .map(|row| {
                let row = row.unwrap();
                (
                    NaiveDate::parse_from_str(&row[0], DISPLAY_DATE_FORMAT).unwrap(),
                    row[1].parse::<u32>().unwrap(),
                    row[2].parse::<u32>().unwrap(),
                    row[3].parse::<u32>().unwrap(),
                )
            })
            .collect();
        assert_eq!(parsed, counts(&store.load()));
        assert!(text.contains("08/01/2025"));
    }

    #[test]
    fn snapshot_copies_backing_file() {
        let (dir, store) = temp_store();
        assert!(!store.snapshot());

        store.upsert(DailyRecord::new(day(2025, 1, 1), 1, 2, 3));
        let backup = store.try_snapshot().unwrap();
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("backup_dados_tickets_"));
        assert!(name.ends_with(".xlsx"));
        assert_eq!(backup.parent().unwrap(), dir.path());
        assert_eq!(RecordStore::new(&backup).load(), store.load());
    }

    #[test]
    fn snapshot_name_ignores_data_file_name() {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("other.xlsx"));
        store.upsert(DailyRecord::new(day(2025, 2, 1), 1, 0, 0));

        let backup = store.try_snapshot().unwrap();
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(BACKUP_PREFIX));
        assert_eq!(name.len(), BACKUP_PREFIX.len() + "YYYYMMDD_HHMMSS.xlsx".len());
    }

    #[test]
    fn native_date_cells_load() {
        use rust_xlsxwriter::{ExcelDateTime, Format};

        let (_dir, store) = temp_store();
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (c, header) in HEADERS.iter().enumerate() {
            sheet.write_string(0, c as u16, *header).unwrap();
        }
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let when = ExcelDateTime::from_ymd(2025, 1, 7).unwrap();
        sheet.write_datetime_with_format(1, 0, &when, &date_format).unwrap();
        sheet.write_number(1, 1, 5.0).unwrap();
        sheet.write_number(1, 2, 2.0).unwrap();
        sheet.write_number(1, 3, 1.0).unwrap();
        sheet.write_string(1, 4, "INC-7").unwrap();
        workbook.save(store.path()).unwrap();

        let records = store.try_load().unwrap();
        assert_eq!(counts(&records), vec![(day(2025, 1, 7), 5, 2, 1)]);
        assert_eq!(records[0].links, "INC-7");
    }

    #[test]
    fn integer_count_cells() {
        assert_eq!(parse_count(&Data::Int(5), COL_OPENED), Ok(5));
        assert_eq!(parse_count(&Data::Int(0), COL_OPENED), Ok(0));
        assert!(parse_count(&Data::Int(-1), COL_OPENED).is_err());
        assert!(parse_count(&Data::Int(i64::from(u32::MAX) + 1), COL_OPENED).is_err());
        assert_eq!(parse_count(&Data::Float(3.0), COL_CLOSED), Ok(3));
        assert!(parse_count(&Data::Float(2.5), COL_CLOSED).is_err());
    }

    #[test]
    fn duplicate_dates_on_disk_keep_last_row() {
        let (_dir, store) = temp_store();
        write_raw_sheet(
            store.path(),
            &[
                &["data", "tickets_iniciados", "tickets_finalizados", "tickets_andamento"],
                &["2025-01-02", "1", "1", "1"],
                &["2025-01-01", "9", "9", "9"],
                &["2025-01-02", "7", "6", "5"],
            ],
        );

        assert_eq!(
            counts(&store.load()),
            vec![(day(2025, 1, 1), 9, 9, 9), (day(2025, 1, 2), 7, 6, 5)]
        );

        assert!(store.upsert(DailyRecord::new(day(2025, 1, 3), 1, 0, 0)));
        assert_eq!(store.load().len(), 3);
    }

    #[test]
    fn export_file_name_uses_compact_date() {
        assert_eq!(export_file_name(day(2025, 7, 30)), "tickets_data_20250730.csv");
    }

    #[test]
    fn parses_timestamp_text_dates() {
        assert_eq!(parse_date_text("2025-01-05 00:00:00").unwrap(), day(2025, 1, 5));
        assert_eq!(parse_date_text(" 05/01/2025 ").unwrap(), day(2025, 1, 5));
        assert!(parse_date_text("2025-13-01").is_err());
    }
}
