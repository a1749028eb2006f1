use serde::Serialize;
use std::{env, net::SocketAddr, path::PathBuf};

pub const DEFAULT_DATA_FILE: &str = "dados_tickets.xlsx";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_path: PathBuf,
    pub port: u16,
    pub dashboard: DashboardConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            data_path: resolve_data_path(),
            port: resolve_port(),
            dashboard: DashboardConfig::default(),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

pub fn resolve_data_path() -> PathBuf {
    if let Ok(path) = env::var("TICKETS_DATA_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_DATA_FILE)
}

fn resolve_port() -> u16 {
    env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Chart colours and sizing handed to the page renderer.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardConfig {
    pub title: String,
    pub chart_height: u32,
    pub palette: Palette,
}

#[derive(Debug, Clone, Serialize)]
pub struct Palette {
    pub opened: String,
    pub closed: String,
    pub in_progress: String,
    pub background: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: "Support Ticket Dashboard".to_string(),
            chart_height: 400,
            palette: Palette {
                opened: "#1f77b4".to_string(),
                closed: "#2ca02c".to_string(),
                in_progress: "#ff7f0e".to_string(),
                background: "#f0f2f6".to_string(),
            },
        }
    }
}
