use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post, put}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/today", post(handlers::save_today))
        .route("/today/delete", post(handlers::delete_today))
        .route("/api/today", get(handlers::get_today))
        .route("/api/records", get(handlers::list_records))
        .route(
            "/api/records/:date",
            put(handlers::put_record).delete(handlers::delete_record),
        )
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/report", get(handlers::get_report))
        .route("/api/export", get(handlers::export))
        .route("/api/backup", post(handlers::backup))
        .with_state(state)
}
