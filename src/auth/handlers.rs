//! Authentication handlers
//!
//! Implements the external-login handshake: `/login` builds the provider
//! authorize redirect and parks a pending-login entry in the session,
//! `/callback` validates the echoed state, exchanges the code, verifies the
//! ID token, and provisions or updates the user record, `/logout` clears the
//! session and bounces through the provider logout endpoint.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::{session_cookie, sid_from_headers, AuthedUser};
use super::models::{AuthOutcome, CallbackQuery, LoginQuery, User};
use crate::common::{generate_account_id, generate_raw_id, generate_user_id, ApiError, AppState};
use crate::services::{FlashMessage, IdentityClaims, PendingLogin, SessionService};

/// Where a login lands when the caller did not ask for anywhere specific
pub const DEFAULT_NEXT_URL: &str = "/account";

/// Restrict the post-login destination to a local path. Anything that is not
/// a single-slash-rooted path (protocol-relative `//host`, absolute URLs,
/// backslash tricks) falls back to the default, closing the open-redirect
/// hole.
pub fn sanitize_next_url(next: Option<&str>) -> String {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n.to_string(),
        _ => DEFAULT_NEXT_URL.to_string(),
    }
}

/// The callback proceeds only when the echoed `state` is byte-for-byte what
/// login initiation stored in the session.
pub fn state_matches(pending: &PendingLogin, echoed: Option<&str>) -> bool {
    match echoed {
        Some(echoed) => pending.state() == echoed,
        None => false,
    }
}

fn parse_sqlite_ts(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
}

/// A login counts as the first ever when `created_at` and `last_login` fall
/// within the same short window (under one minute).
pub fn is_first_login(created_at: &str, last_login: Option<&str>) -> bool {
    match (parse_sqlite_ts(created_at), last_login.and_then(parse_sqlite_ts)) {
        (Some(created), Some(last)) => (last - created) < chrono::Duration::minutes(1),
        _ => false,
    }
}

/// Look up or create the user record for verified identity claims, refresh
/// its profile fields, and stamp `last_login`. The account profile row is
/// provisioned alongside a brand-new user.
///
/// No row is touched before this point in the callback; every validation
/// (state, code, token, email claim) has already passed.
pub async fn authenticate_or_provision(
    db: &SqlitePool,
    claims: &IdentityClaims,
) -> Result<AuthOutcome, ApiError> {
    let existing: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE subject = ?")
        .bind(&claims.sub)
        .fetch_optional(db)
        .await
        .map_err(ApiError::DatabaseError)?;

    let user_id = match existing {
        Some(u) => {
            sqlx::query(
                r#"
                UPDATE users
                SET name = ?, email = ?, picture = ?,
                    last_login = datetime('now'), updated_at = datetime('now')
                WHERE id = ?
                "#,
            )
            .bind(claims.name.as_deref())
            .bind(claims.email.as_deref())
            .bind(claims.picture.as_deref())
            .bind(&u.id)
            .execute(db)
            .await
            .map_err(ApiError::DatabaseError)?;
            u.id
        }
        None => {
            let id = generate_user_id();
            info!(
                user_id = %id,
                subject = %claims.sub,
                "Creating new user from identity claims"
            );
            sqlx::query(
                r#"
                INSERT INTO users (id, subject, name, email, picture, last_login)
                VALUES (?, ?, ?, ?, ?, datetime('now'))
                "#,
            )
            .bind(&id)
            .bind(&claims.sub)
            .bind(claims.name.as_deref())
            .bind(claims.email.as_deref())
            .bind(claims.picture.as_deref())
            .execute(db)
            .await
            .map_err(ApiError::DatabaseError)?;

            // Provision the editable account profile alongside the user
            sqlx::query(
                "INSERT INTO accounts (id, user_id, name, email) VALUES (?, ?, ?, ?)",
            )
            .bind(generate_account_id())
            .bind(&id)
            .bind(claims.name.as_deref().unwrap_or(""))
            .bind(claims.email.as_deref())
            .execute(db)
            .await
            .map_err(ApiError::DatabaseError)?;
            id
        }
    };

    let user: User = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_one(db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if user.is_active == 0 {
        warn!(user_id = %user.id, "Login refused for inactive user");
        return Err(ApiError::Forbidden("account is inactive".to_string()));
    }

    let first_login = is_first_login(&user.created_at, user.last_login.as_deref());
    Ok(AuthOutcome { user, first_login })
}

fn ensure_sid(headers: &HeaderMap, sessions: &SessionService) -> (String, bool) {
    match sid_from_headers(headers) {
        Some(sid) => (sid, false),
        None => (sessions.new_sid(), true),
    }
}

fn redirect_with_session(target: &str, sid: &str, set_cookie: bool) -> Response {
    let mut response = Redirect::to(target).into_response();
    if set_cookie {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(sid)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// GET /login
/// Starts the external-login handshake: stores `{nonce, next_url}` in the
/// session (overwriting any prior pending login) and redirects to the
/// provider authorize endpoint with the state parameter. No network calls.
pub async fn login_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<LoginQuery>,
    headers: HeaderMap,
) -> Response {
    let state = state_lock.read().await.clone();
    let (sid, new_sid) = ensure_sid(&headers, &state.sessions);

    let next_url = sanitize_next_url(params.next.as_deref());
    let pending = PendingLogin {
        nonce: generate_raw_id(24),
        next_url,
    };
    let authorize_url = state.auth0.authorize_url(&pending.state());

    info!(next_url = %pending.next_url, "Starting login, redirecting to provider");
    state.sessions.set_pending(&sid, pending).await;

    redirect_with_session(&authorize_url, &sid, new_sid)
}

/// GET /callback
/// Completes the handshake. Every failure branch is recovered locally into a
/// flash message plus a redirect (or a 400 for a missing code); the pending
/// entry is consumed on all paths so a state value can never be replayed.
pub async fn callback_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Query(params): Query<CallbackQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let state = state_lock.read().await.clone();
    let (sid, new_sid) = ensure_sid(&headers, &state.sessions);

    // Read-once: the pending entry is gone after this regardless of outcome
    let pending = state.sessions.take_pending(&sid).await;

    let pending = match pending {
        Some(p) if state_matches(&p, params.state.as_deref()) => p,
        _ => {
            error!("State mismatch on callback");
            state
                .sessions
                .push_flash(
                    &sid,
                    FlashMessage::error(
                        "Sorry, there was a problem. Please try again or contact support.",
                    ),
                )
                .await;
            return Ok(redirect_with_session("/", &sid, new_sid));
        }
    };

    let code = match params.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => {
            error!("No authorization code on callback");
            return Err(ApiError::BadRequest(
                "no authorization code provided".to_string(),
            ));
        }
    };

    let token = match state.auth0.exchange_code(code).await {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "Authorization code exchange failed");
            state
                .sessions
                .push_flash(
                    &sid,
                    FlashMessage::error(
                        "Sorry, there was a problem. Please try again or contact support.",
                    ),
                )
                .await;
            return Ok(redirect_with_session("/", &sid, new_sid));
        }
    };

    let claims = match state.auth0.verify_id_token(&token.id_token).await {
        Ok(claims) => claims,
        Err(e) => {
            error!(error = %e, "Identity token verification failed");
            state
                .sessions
                .push_flash(
                    &sid,
                    FlashMessage::error(
                        "Sorry, there was a problem. Please try again or contact support.",
                    ),
                )
                .await;
            return Ok(redirect_with_session("/", &sid, new_sid));
        }
    };

    finish_callback(&state, &sid, new_sid, &pending, claims).await
}

/// Completes the callback once identity claims are in hand: checks the email
/// requirement, provisions or updates the user, binds the session, and picks
/// the landing page.
pub(crate) async fn finish_callback(
    state: &AppState,
    sid: &str,
    new_sid: bool,
    pending: &PendingLogin,
    claims: IdentityClaims,
) -> Result<Response, ApiError> {
    if claims.email.is_none() {
        error!(subject = %claims.sub, "Identity claims carry no email");
        state
            .sessions
            .push_flash(
                sid,
                FlashMessage::error("Email address is required. Please try again."),
            )
            .await;
        return Ok(redirect_with_session("/", sid, new_sid));
    }

    let outcome = authenticate_or_provision(&state.db, &claims).await?;
    state.sessions.login(sid, &outcome.user.id).await;

    info!(
        user_id = %outcome.user.id,
        first_login = outcome.first_login,
        "Login successful"
    );

    // First-time users go to their profile page regardless of next_url
    if outcome.first_login {
        state
            .sessions
            .push_flash(
                sid,
                FlashMessage::success("Welcome and thanks for volunteering!"),
            )
            .await;
        state
            .sessions
            .push_flash(
                sid,
                FlashMessage::warning(
                    "Next, review your profile below and click 'Save'. \
                     We will inform you when the program officially begins.",
                ),
            )
            .await;
        return Ok(redirect_with_session(DEFAULT_NEXT_URL, sid, new_sid));
    }

    Ok(redirect_with_session(&pending.next_url, sid, new_sid))
}

/// GET /logout
/// Clears the session's user binding, queues a confirmation message, and
/// redirects through the provider logout endpoint back to the home page.
pub async fn logout_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
) -> Response {
    let state = state_lock.read().await.clone();
    let (sid, new_sid) = ensure_sid(&headers, &state.sessions);

    state.sessions.logout(&sid).await;
    state
        .sessions
        .push_flash(&sid, FlashMessage::success("You Have Been Logged Out!"))
        .await;

    let return_to = format!("{}/", state.base_url.trim_end_matches('/'));
    let logout_url = state.auth0.logout_url(&return_to);

    info!("User logged out, redirecting to provider logout");
    redirect_with_session(&logout_url, &sid, new_sid)
}

/// GET /api/me
/// Returns the current authenticated user's record
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&authed.id)
        .fetch_one(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(serde_json::json!({
        "user": user,
        "is_admin": authed.is_admin,
    })))
}

/// GET /api/messages
/// Drains flash messages queued for this session
pub async fn messages_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let state = state_lock.read().await.clone();

    let messages = match sid_from_headers(&headers) {
        Some(sid) => state.sessions.take_flash(&sid).await,
        None => Vec::new(),
    };

    Json(serde_json::json!({ "messages": messages }))
}
