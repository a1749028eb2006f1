use crate::models::{DailyRecord, StatsResponse};
use crate::storage::DISPLAY_DATE_FORMAT;
use chrono::NaiveDate;
use serde::Serialize;

const TREND_WINDOW: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub mean_opened: f64,
    pub mean_closed: f64,
    pub mean_in_progress: f64,
    pub total_opened: u64,
    pub total_closed: u64,
    pub total_in_progress: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    /// closed / opened, in percent.
    pub resolution_rate: f64,
    /// Percent change of the last 7 rows' mean against the 7 rows before.
    pub trend_opened: f64,
    pub trend_closed: f64,
    /// closed / (opened + in progress), in percent.
    pub efficiency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub period: String,
    pub days: usize,
    pub total_opened: u64,
    pub total_closed: u64,
    pub mean_in_progress: f64,
    pub busiest_day: NaiveDate,
    pub peak_opened: u32,
    pub peak_closed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent below two rows.
    pub std: Option<f64>,
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    pub opened: Option<FieldStats>,
    pub closed: Option<FieldStats>,
    pub in_progress: Option<FieldStats>,
}

pub fn build_stats(records: &[DailyRecord]) -> StatsResponse {
    StatsResponse {
        summary: summary(records),
        kpis: kpis(records),
        describe: describe(records),
        last_7_days: last_days(records, TREND_WINDOW).to_vec(),
    }
}

pub fn summary(records: &[DailyRecord]) -> Summary {
    Summary {
        count: records.len(),
        first_date: records.first().map(|r| r.date),
        last_date: records.last().map(|r| r.date),
        mean_opened: mean(records, |r| r.opened),
        mean_closed: mean(records, |r| r.closed),
        mean_in_progress: mean(records, |r| r.in_progress),
        total_opened: total(records, |r| r.opened),
        total_closed: total(records, |r| r.closed),
        total_in_progress: total(records, |r| r.in_progress),
    }
}

pub fn kpis(records: &[DailyRecord]) -> Kpis {
    let opened = total(records, |r| r.opened);
    let closed = total(records, |r| r.closed);
    let in_progress = total(records, |r| r.in_progress);

    let (trend_opened, trend_closed) = if records.len() >= TREND_WINDOW * 2 {
        let split = records.len() - TREND_WINDOW;
        let recent = &records[split..];
        let previous = &records[split - TREND_WINDOW..split];
        (
            percent_change(mean(previous, |r| r.opened), mean(recent, |r| r.opened)),
            percent_change(mean(previous, |r| r.closed), mean(recent, |r| r.closed)),
        )
    } else {
        (0.0, 0.0)
    };

    Kpis {
        resolution_rate: ratio_percent(closed, opened),
        trend_opened,
        trend_closed,
        efficiency: ratio_percent(closed, opened + in_progress),
    }
}

/// Aggregates over `[from, to]`; `None` when no rows fall in the range.
pub fn period_report(
    records: &[DailyRecord],
    from: NaiveDate,
    to: NaiveDate,
) -> Option<PeriodReport> {
    let rows: Vec<&DailyRecord> = records
        .iter()
        .filter(|r| r.date >= from && r.date <= to)
        .collect();

    // First row wins on ties.
    let busiest = rows
        .iter()
        .copied()
        .reduce(|best, r| if r.activity() > best.activity() { r } else { best })?;

    Some(PeriodReport {
        period: format!(
            "{} a {}",
            from.format(DISPLAY_DATE_FORMAT),
            to.format(DISPLAY_DATE_FORMAT)
        ),
        days: rows.len(),
        total_opened: rows.iter().map(|r| u64::from(r.opened)).sum(),
        total_closed: rows.iter().map(|r| u64::from(r.closed)).sum(),
        mean_in_progress: rows.iter().map(|r| f64::from(r.in_progress)).sum::<f64>()
            / rows.len() as f64,
        busiest_day: busiest.date,
        peak_opened: rows.iter().map(|r| r.opened).max().unwrap_or(0),
        peak_closed: rows.iter().map(|r| r.closed).max().unwrap_or(0),
    })
}

pub fn describe(records: &[DailyRecord]) -> Description {
    Description {
        opened: field_stats(records, |r| r.opened),
        closed: field_stats(records, |r| r.closed),
        in_progress: field_stats(records, |r| r.in_progress),
    }
}

pub fn last_days(records: &[DailyRecord], n: usize) -> &[DailyRecord] {
    &records[records.len().saturating_sub(n)..]
}

/// `1.2M`, `3.4K` or the plain integer.
pub fn format_compact(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

fn field_stats(records: &[DailyRecord], field: impl Fn(&DailyRecord) -> u32) -> Option<FieldStats> {
    let values: Vec<u32> = records.iter().map(&field).collect();
    let min = *values.iter().min()?;
    let max = *values.iter().max()?;
    let mean = mean(records, &field);
    let std = (values.len() > 1).then(|| {
        let sum_sq: f64 = values
            .iter()
            .map(|v| (f64::from(*v) - mean).powi(2))
            .sum();
        (sum_sq / (values.len() - 1) as f64).sqrt()
    });

    Some(FieldStats {
        count: values.len(),
        mean,
        std,
        min,
        max,
    })
}

fn total(records: &[DailyRecord], field: impl Fn(&DailyRecord) -> u32) -> u64 {
    records.iter().map(|r| u64::from(field(r))).sum()
}

fn mean(records: &[DailyRecord], field: impl Fn(&DailyRecord) -> u32) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    total(records, field) as f64 / records.len() as f64
}

fn percent_change(before: f64, after: f64) -> f64 {
    if before > 0.0 {
        (after - before) / before * 100.0
    } else {
        0.0
    }
}

fn ratio_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64 * 100.0
    }
}
