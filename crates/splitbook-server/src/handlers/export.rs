//! CSV export handler

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState};
use splitbook_core::ExportOptions;

/// Query parameters for the split export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Start date (YYYY-MM-DD)
    pub start: Option<String>,
    /// End date (YYYY-MM-DD)
    pub end: Option<String>,
    /// Restrict to these account IDs (comma-separated)
    pub accounts: Option<String>,
}

/// GET /api/export - Download qualifying splits as CSV
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportQuery>,
) -> Result<Response<Body>, AppError> {
    let start = params
        .start
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request("Invalid 'start' date format (use YYYY-MM-DD)"))?;

    let end = params
        .end
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request("Invalid 'end' date format (use YYYY-MM-DD)"))?;

    let account_ids = params.accounts.map(|s| {
        s.split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .collect::<Vec<_>>()
    });

    let opts = ExportOptions {
        start,
        end,
        account_ids,
    };

    let csv = state.db.export_splits_csv(&opts)?;
    let rows = csv.lines().count().saturating_sub(1);
    info!(rows, "Exported splits to CSV");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"export.csv\"",
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::internal(&e.to_string()))
}
