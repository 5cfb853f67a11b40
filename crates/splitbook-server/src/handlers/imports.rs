//! Import flow handlers: upload, review, confirm
//!
//! Uploading parses the statement once and stores the annotated rows on
//! the session. Review and confirmation both work from those stored
//! rows; the file itself is never parsed again.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use splitbook_core::models::{ConfirmRow, ImportRow, ImportSession, Recurrence};
use splitbook_core::{confirm_rows, dedup, ConfirmSummary, ImporterKind};

/// The annotated batch shown for review
#[derive(Debug, Serialize)]
pub struct ImportReview {
    pub session: ImportSession,
    pub rows: Vec<ImportRow>,
    /// Recurrence templates selectable per row
    pub recurrences: Vec<Recurrence>,
}

/// POST /api/imports - Upload a statement and open a review session
///
/// Expects multipart form with:
/// - file: statement file (required, max 1 MiB)
/// - account_id: personal account the statement belongs to (required)
/// - importer: registry key selecting the dialect (required)
pub async fn upload_statement(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ImportReview>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut account_id: Option<i64> = None;
    let mut importer: Option<ImporterKind> = None;

    // Extract fields from multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} KiB",
                        MAX_UPLOAD_SIZE / 1024
                    )));
                }

                file_data = Some(bytes.to_vec());
            }
            "account_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read account_id"))?;
                account_id = Some(value.parse().map_err(|_| {
                    AppError::bad_request(&format!("Invalid account_id: {}", value))
                })?);
            }
            "importer" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read importer"))?;
                importer = Some(value.parse().map_err(|_| {
                    AppError::bad_request(&format!("Unknown importer: {}", value))
                })?);
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing 'file' field"))?;
    let account_id =
        account_id.ok_or_else(|| AppError::bad_request("Missing 'account_id' field"))?;
    let importer = importer.ok_or_else(|| AppError::bad_request("Missing 'importer' field"))?;

    if state.db.get_account(account_id)?.is_none() {
        return Err(AppError::not_found("Account not found"));
    }

    let records = importer
        .importer()
        .import_transactions(&file_data)
        .map_err(|e| AppError::bad_request(&format!("Failed to parse statement: {}", e)))?;

    // Match each row's counterparty IBAN against known accounts
    let iban_map = state.db.iban_account_map()?;
    let matches: Vec<Option<i64>> = records
        .iter()
        .map(|r| r.iban.as_ref().and_then(|iban| iban_map.get(iban).copied()))
        .collect();

    let flags = dedup::detect_duplicates(&state.db, &records, &matches)?;

    let rows: Vec<ImportRow> = records
        .into_iter()
        .zip(matches.iter().zip(&flags))
        .enumerate()
        .map(|(position, (record, (matched, flagged)))| ImportRow {
            session_id: 0,
            position: position as i64,
            book_date: record.book_date,
            transaction_date: record.transaction_date,
            amount: record.amount,
            title: record.title,
            iban: record.iban,
            matched_account_id: *matched,
            suggested_ignore: *flagged,
        })
        .collect();

    let session_id =
        state
            .db
            .create_import_session(account_id, importer.as_str(), filename.as_deref(), &rows)?;

    info!(
        session_id,
        account_id,
        importer = %importer,
        rows = rows.len(),
        "Opened import session"
    );

    review_payload(&state, session_id)
}

/// GET /api/imports/:id - The annotated batch for review
pub async fn get_import_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ImportReview>, AppError> {
    review_payload(&state, id)
}

fn review_payload(state: &AppState, session_id: i64) -> Result<Json<ImportReview>, AppError> {
    let session = state
        .db
        .get_import_session(session_id)?
        .ok_or_else(|| AppError::not_found("Import session not found"))?;
    let rows = state.db.list_session_rows(session_id)?;
    let recurrences = state.db.list_active_recurrences()?;

    Ok(Json(ImportReview {
        session,
        rows,
        recurrences,
    }))
}

/// Request body for confirmation, one entry per session row in order
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub rows: Vec<ConfirmRow>,
}

/// POST /api/imports/:id/confirm - Book the reviewed rows
pub async fn confirm_import(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmSummary>, AppError> {
    let session = state
        .db
        .get_import_session(id)?
        .ok_or_else(|| AppError::not_found("Import session not found"))?;
    let rows = state.db.list_session_rows(id)?;

    let summary = confirm_rows(&state.db, &session, &rows, &req.rows).map_err(|e| match e {
        splitbook_core::Error::InvalidData(msg) => AppError::bad_request(&msg),
        other => AppError::from(other),
    })?;

    Ok(Json(summary))
}
