//! Account handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState};
use splitbook_core::models::{Account, AccountType};

/// GET /api/accounts - List all accounts
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Account>>, AppError> {
    let accounts = state.db.list_accounts()?;
    Ok(Json(accounts))
}

/// Request body for account creation
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub name: String,
    pub iban: Option<String>,
    #[serde(default = "default_account_type")]
    pub account_type: AccountType,
}

fn default_account_type() -> AccountType {
    AccountType::Personal
}

/// POST /api/accounts - Create an account
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Account>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Account name must not be empty"));
    }

    let id = state
        .db
        .create_account(name, req.iban.as_deref(), req.account_type)?;
    let account = state
        .db
        .get_account(id)?
        .ok_or_else(|| AppError::internal("Account missing after insert"))?;

    Ok(Json(account))
}

/// GET /api/accounts/:id - Get an account
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Account>, AppError> {
    let account = state
        .db
        .get_account(id)?
        .ok_or_else(|| AppError::not_found("Account not found"))?;

    Ok(Json(account))
}
