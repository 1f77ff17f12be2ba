// src/schools/handlers.rs
//! School directory and membership handlers

use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{
    level_label, CreateSchoolRequest, MembershipResponse, School, SchoolListQuery, SchoolResponse,
};
use super::validators::SchoolValidator;
use crate::accounts::models::MessageResponse;
use crate::auth::AuthedUser;
use crate::common::id_generator::{generate_member_id, generate_school_id};
use crate::common::{ApiError, AppState, Validator};

const LIST_LIMIT: i64 = 100;

/// GET /api/schools
/// School directory with optional name search and level filter
pub async fn list_schools(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Query(params): Query<SchoolListQuery>,
) -> Result<Json<Vec<School>>, ApiError> {
    let state = state_lock.read().await.clone();

    let mut sql = String::from("SELECT * FROM schools WHERE 1=1");
    if params.q.is_some() {
        sql.push_str(" AND name LIKE ?");
    }
    if params.level.is_some() {
        sql.push_str(" AND level = ?");
    }
    sql.push_str(" ORDER BY name LIMIT ?");

    let mut query = sqlx::query_as::<_, School>(&sql);
    if let Some(q) = &params.q {
        query = query.bind(format!("%{}%", q));
    }
    if let Some(level) = params.level {
        query = query.bind(level);
    }
    let schools = query
        .bind(LIST_LIMIT)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(schools))
}

/// GET /api/schools/:id
pub async fn get_school(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(school_id): Path<String>,
) -> Result<Json<SchoolResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let school = fetch_school(&state.db, &school_id).await?;

    let (member_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM members WHERE school_id = ?")
            .bind(&school_id)
            .fetch_one(&state.db)
            .await
            .map_err(ApiError::DatabaseError)?;

    let label = school.level.and_then(level_label);
    Ok(Json(SchoolResponse {
        school,
        level_label: label,
        member_count,
    }))
}

/// POST /api/schools
/// Admin-only: add a school to the directory
pub async fn create_school(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(payload): Json<CreateSchoolRequest>,
) -> Result<Json<School>, ApiError> {
    let state = state_lock.read().await.clone();

    if !authed.is_admin {
        warn!(user_id = %authed.id, "Non-admin attempted to create a school");
        return Err(ApiError::Forbidden("admin privileges required".to_string()));
    }

    let validation = SchoolValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let school_id = generate_school_id();
    let inserted = sqlx::query(
        r#"
        INSERT INTO schools (id, name, level, nces_id, address, phone, website)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&school_id)
    .bind(payload.name.trim())
    .bind(payload.level)
    .bind(payload.nces_id.as_deref())
    .bind(payload.address.as_deref())
    .bind(payload.phone.as_deref().unwrap_or(""))
    .bind(payload.website.as_deref().unwrap_or(""))
    .execute(&state.db)
    .await;

    if let Err(e) = inserted {
        if is_unique_violation(&e) {
            return Err(ApiError::Conflict(
                "A school with this NCES id already exists".to_string(),
            ));
        }
        return Err(ApiError::DatabaseError(e));
    }

    info!(school_id = %school_id, admin_id = %authed.id, "School created");

    let school = fetch_school(&state.db, &school_id).await?;
    Ok(Json(school))
}

/// PUT /api/schools/:id
/// Admin-only: update directory details
pub async fn update_school(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(school_id): Path<String>,
    Json(payload): Json<CreateSchoolRequest>,
) -> Result<Json<School>, ApiError> {
    let state = state_lock.read().await.clone();

    if !authed.is_admin {
        warn!(user_id = %authed.id, "Non-admin attempted to update a school");
        return Err(ApiError::Forbidden("admin privileges required".to_string()));
    }

    let validation = SchoolValidator.validate(&payload);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let updated = sqlx::query(
        r#"
        UPDATE schools
        SET name = ?, level = ?, nces_id = ?, address = ?, phone = ?, website = ?,
            updated_at = datetime('now')
        WHERE id = ?
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.level)
    .bind(payload.nces_id.as_deref())
    .bind(payload.address.as_deref())
    .bind(payload.phone.as_deref().unwrap_or(""))
    .bind(payload.website.as_deref().unwrap_or(""))
    .bind(&school_id)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("school not found".to_string()));
    }

    let school = fetch_school(&state.db, &school_id).await?;
    Ok(Json(school))
}

/// GET /api/memberships
/// Schools the caller has signed up to volunteer at
pub async fn my_memberships(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<MembershipResponse>>, ApiError> {
    let state = state_lock.read().await.clone();

    let account_id = account_id_for_user(&state.db, &authed.id).await?;

    #[derive(sqlx::FromRow)]
    struct MembershipRow {
        member_id: String,
        joined_at: String,
        id: String,
        name: String,
        level: Option<i64>,
        nces_id: Option<String>,
        address: Option<String>,
        phone: String,
        website: String,
        created_at: String,
        updated_at: Option<String>,
    }

    let rows: Vec<MembershipRow> = sqlx::query_as(
        r#"
        SELECT m.id AS member_id, m.created_at AS joined_at,
               s.id, s.name, s.level, s.nces_id, s.address, s.phone, s.website,
               s.created_at, s.updated_at
        FROM members m
        JOIN schools s ON s.id = m.school_id
        WHERE m.account_id = ?
        ORDER BY m.created_at DESC
        "#,
    )
    .bind(&account_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    let memberships = rows
        .into_iter()
        .map(|row| MembershipResponse {
            member_id: row.member_id,
            joined_at: row.joined_at,
            school: School {
                id: row.id,
                name: row.name,
                level: row.level,
                nces_id: row.nces_id,
                address: row.address,
                phone: row.phone,
                website: row.website,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        })
        .collect();

    Ok(Json(memberships))
}

/// POST /api/schools/:id/members
/// Sign up to volunteer at a school
pub async fn join_school(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(school_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let school = fetch_school(&state.db, &school_id).await?;
    let account_id = account_id_for_user(&state.db, &authed.id).await?;

    let member_id = generate_member_id();
    let inserted = sqlx::query("INSERT INTO members (id, school_id, account_id) VALUES (?, ?, ?)")
        .bind(&member_id)
        .bind(&school_id)
        .bind(&account_id)
        .execute(&state.db)
        .await;

    if let Err(e) = inserted {
        if is_unique_violation(&e) {
            return Err(ApiError::Conflict(
                "You have already signed up at this school".to_string(),
            ));
        }
        return Err(ApiError::DatabaseError(e));
    }

    info!(user_id = %authed.id, school_id = %school_id, "Volunteer joined school");

    Ok(Json(MessageResponse {
        message: format!("Thanks for signing up to volunteer at {}!", school.name),
    }))
}

/// DELETE /api/schools/:id/members
/// Withdraw from a school
pub async fn leave_school(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(school_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let account_id = account_id_for_user(&state.db, &authed.id).await?;

    let deleted = sqlx::query("DELETE FROM members WHERE school_id = ? AND account_id = ?")
        .bind(&school_id)
        .bind(&account_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::NotFound(
            "You are not signed up at this school".to_string(),
        ));
    }

    info!(user_id = %authed.id, school_id = %school_id, "Volunteer left school");

    Ok(Json(MessageResponse {
        message: "You have withdrawn from this school.".to_string(),
    }))
}

async fn fetch_school(db: &sqlx::SqlitePool, school_id: &str) -> Result<School, ApiError> {
    sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = ?")
        .bind(school_id)
        .fetch_optional(db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("school not found".to_string()))
}

async fn account_id_for_user(db: &sqlx::SqlitePool, user_id: &str) -> Result<String, ApiError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM accounts WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await
        .map_err(ApiError::DatabaseError)?;
    row.map(|(id,)| id)
        .ok_or_else(|| ApiError::NotFound("account not found".to_string()))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}
