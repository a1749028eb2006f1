use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's ticket counts. `date` is the table key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub opened: u32,
    pub closed: u32,
    pub in_progress: u32,
    #[serde(default)]
    pub links: String,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, opened: u32, closed: u32, in_progress: u32) -> Self {
        Self {
            date,
            opened,
            closed,
            in_progress,
            links: String::new(),
        }
    }

    pub fn with_links(mut self, links: impl Into<String>) -> Self {
        self.links = links.into();
        self
    }

    /// Opened plus closed, used to rank the busiest day of a period.
    pub fn activity(&self) -> u64 {
        u64::from(self.opened) + u64::from(self.closed)
    }
}

/// Body of `PUT /api/records/:date`.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub opened: u32,
    pub closed: u32,
    pub in_progress: u32,
    #[serde(default)]
    pub links: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodayResponse {
    pub date: NaiveDate,
    pub recorded: bool,
    pub opened: u32,
    pub closed: u32,
    pub in_progress: u32,
    pub links: Vec<crate::entry::Link>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<DailyRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub date: NaiveDate,
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupResponse {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub summary: crate::stats::Summary,
    pub kpis: crate::stats::Kpis,
    pub describe: crate::stats::Description,
    pub last_7_days: Vec<DailyRecord>,
}
