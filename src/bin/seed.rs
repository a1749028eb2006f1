//! Fill the backing file with 30 days of plausible ticket counts.
//!
//! Usage: `seed [rng-seed]`. The data file comes from `TICKETS_DATA_PATH`.

use chrono::{Datelike, Duration, Local, Weekday};
use ticket_dashboard::storage::DISPLAY_DATE_FORMAT;
use ticket_dashboard::{Config, DailyRecord, RecordStore};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DAYS: i64 = 30;
const WEEKEND_FACTOR: f64 = 0.3;

/// Minimal deterministic PRNG (xorshift64*).
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(6364136223846793005).wrapping_add(1) | 1,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform in `[low, high]`.
    fn range(&mut self, low: u32, high: u32) -> u32 {
        low + (self.next_u64() % u64::from(high - low + 1)) as u32
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let seed = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => 42,
    };
    let config = Config::from_env();
    let store = RecordStore::new(&config.data_path);
    store.try_initialize()?;

    let mut rng = SimpleRng::new(seed);
    let first = Local::now().date_naive() - Duration::days(DAYS);
    let mut failures = 0;

    for offset in 0..DAYS {
        let date = first + Duration::days(offset);
        let factor = match date.weekday() {
            Weekday::Sat | Weekday::Sun => WEEKEND_FACTOR,
            _ => 1.0,
        };
        let scaled = |value: u32| (f64::from(value) * factor) as u32;

        let record = DailyRecord::new(
            date,
            scaled(rng.range(5, 25)),
            scaled(rng.range(3, 20)),
            scaled(rng.range(10, 40)),
        );
        let summary = describe_record(&record);

        if store.upsert(record) {
            info!("{summary}");
        } else {
            error!("could not write record for {date}");
            failures += 1;
        }
    }

    info!(
        "seeded {} days into {}",
        DAYS - failures,
        config.data_path.display()
    );
    Ok(())
}

fn describe_record(record: &DailyRecord) -> String {
    format!(
        "{}: {} opened, {} closed, {} in progress",
        record.date.format(DISPLAY_DATE_FORMAT),
        record.opened,
        record.closed,
        record.in_progress
    )
}
