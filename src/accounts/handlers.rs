// src/accounts/handlers.rs
//! Account profile handlers

use axum::{
    extract::Extension,
    http::HeaderMap,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{
    Account, DeleteAccountRequest, MessageResponse, RosterResponse, UpdateAccountRequest,
};
use super::validators::AccountValidator;
use crate::auth::extractors::sid_from_headers;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, Validator};
use crate::services::FlashMessage;

/// GET /api/account
/// Returns the caller's account profile
pub async fn get_account(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Account>, ApiError> {
    let state = state_lock.read().await.clone();

    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = ?")
        .bind(&authed.id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))?;

    Ok(Json(account))
}

/// PUT /api/account
/// Updates the caller's account profile
pub async fn update_account(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    let state = state_lock.read().await.clone();

    let validation = AccountValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let updated = sqlx::query(
        r#"
        UPDATE accounts
        SET name = ?, email = ?, phone = ?, address = ?,
            is_public = ?, notes = ?, updated_at = datetime('now')
        WHERE user_id = ?
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.email.as_deref())
    .bind(payload.phone.as_deref())
    .bind(payload.address.as_deref())
    .bind(payload.is_public.unwrap_or(false) as i64)
    .bind(payload.notes.as_deref().unwrap_or(""))
    .bind(&authed.id)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("account not found".to_string()));
    }

    info!(user_id = %authed.id, "Account profile saved");

    let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE user_id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(account))
}

/// DELETE /api/account
/// Deletes the caller's user record (account and memberships cascade).
/// Requires an explicit confirmation flag.
pub async fn delete_account(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    headers: HeaderMap,
    Json(payload): Json<DeleteAccountRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    if !payload.confirm {
        warn!(user_id = %authed.id, "Account deletion without confirmation");
        return Err(ApiError::ValidationError(
            "confirm: Deletion must be confirmed".to_string(),
        ));
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&authed.id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if let Some(sid) = sid_from_headers(&headers) {
        state.sessions.logout(&sid).await;
        state
            .sessions
            .push_flash(&sid, FlashMessage::error("Account Deleted!"))
            .await;
    }

    info!(user_id = %authed.id, "User deleted their account");

    Ok(Json(MessageResponse {
        message: "Account Deleted!".to_string(),
    }))
}

/// GET /api/roster
/// Public roster: names of volunteers who opted in, newest first, plus the
/// total number of registered accounts
pub async fn roster(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Json<RosterResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let names: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM accounts WHERE is_public = 1 ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(RosterResponse {
        volunteers: names.into_iter().map(|(n,)| n).collect(),
        total,
    }))
}
