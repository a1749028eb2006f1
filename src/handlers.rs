use crate::entry::{parse_links, validate_entry};
use crate::errors::{AppError, StoreError};
use crate::models::{
    BackupResponse, DailyRecord, EntryRequest, MutationResponse, RecordsResponse, StatsResponse,
    TodayResponse,
};
use crate::state::AppState;
use crate::stats::{build_stats, period_report, PeriodReport};
use crate::storage::export_file_name;
use crate::table::{filter_category, find_record, Category};
use crate::ui::render_index;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub category: Category,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let date = today();
    let records = state.with_store(|store| store.load()).await?;
    let current = find_record(&records, date);
    Ok(Html(render_index(&state.dashboard, date, current, &records)))
}

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodayResponse>, AppError> {
    let date = today();
    let records = state.with_store(|store| store.load()).await?;

    let response = match find_record(&records, date) {
        Some(record) => TodayResponse {
            date,
            recorded: true,
            opened: record.opened,
            closed: record.closed,
            in_progress: record.in_progress,
            links: parse_links(&record.links),
        },
        None => TodayResponse {
            date,
            recorded: false,
            opened: 0,
            closed: 0,
            in_progress: 0,
            links: Vec::new(),
        },
    };
    Ok(Json(response))
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, AppError> {
    let RecordsQuery { from, to, category } = query;
    let records = state.with_store(move |store| store.filter(from, to)).await?;
    let records = filter_category(records, category);

    Ok(Json(RecordsResponse {
        count: records.len(),
        records,
    }))
}

pub async fn put_record(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(payload): Json<EntryRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    let created = save_entry(&state, date, payload).await?;
    Ok(Json(MutationResponse { date, created }))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<MutationResponse>, AppError> {
    remove_entry(&state, date).await?;
    Ok(Json(MutationResponse {
        date,
        created: false,
    }))
}

pub async fn save_today(
    State(state): State<AppState>,
    Form(payload): Form<EntryRequest>,
) -> Result<Redirect, AppError> {
    save_entry(&state, today(), payload).await?;
    Ok(Redirect::to("/"))
}

pub async fn delete_today(State(state): State<AppState>) -> Result<Redirect, AppError> {
    remove_entry(&state, today()).await?;
    Ok(Redirect::to("/"))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let records = state.with_store(|store| store.load()).await?;
    Ok(Json(build_stats(&records)))
}

pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PeriodReport>, AppError> {
    if query.from > query.to {
        return Err(AppError::bad_request("'from' must not be after 'to'"));
    }
    let records = state.with_store(|store| store.load()).await?;
    period_report(&records, query.from, query.to)
        .map(Json)
        .ok_or_else(|| AppError::not_found("no records in the selected period"))
}

pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let text = state.with_store(|store| store.try_export_text()).await??;
    let disposition = format!("attachment; filename=\"{}\"", export_file_name(today()));

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        text,
    ))
}

pub async fn backup(State(state): State<AppState>) -> Result<Json<BackupResponse>, AppError> {
    let path = state
        .with_store(|store| store.try_snapshot())
        .await?
        .map_err(|err| match err {
            StoreError::NotFound(_) => AppError::not_found(err.to_string()),
            other => AppError::from(other),
        })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Json(BackupResponse { file_name }))
}

async fn save_entry(state: &AppState, date: NaiveDate, payload: EntryRequest) -> Result<bool, AppError> {
    validate_entry(payload.opened, payload.closed, payload.in_progress)
        .map_err(AppError::bad_request)?;

    let record = DailyRecord::new(date, payload.opened, payload.closed, payload.in_progress)
        .with_links(payload.links.trim());
    let created = state
        .with_store(move |store| store.try_upsert(record))
        .await??;

    info!(%date, created, "record saved");
    Ok(created)
}

async fn remove_entry(state: &AppState, date: NaiveDate) -> Result<(), AppError> {
    let removed = state
        .with_store(move |store| store.try_delete(date))
        .await??;
    if !removed {
        return Err(AppError::not_found(format!("no record for {date}")));
    }

    info!(%date, "record deleted");
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
