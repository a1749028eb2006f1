pub mod app;
pub mod config;
pub mod entry;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod stats;
pub mod storage;
pub mod table;
pub mod ui;
pub mod state;

pub use app::router;
pub use config::Config;
pub use models::DailyRecord;
pub use state::AppState;
pub use storage::RecordStore;
