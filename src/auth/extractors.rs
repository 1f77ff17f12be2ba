//! Authentication extractors and session-cookie helpers for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::User;
use crate::common::{safe_email_log, ApiError, AppState};

/// Name of the session correlation cookie
pub const SESSION_COOKIE: &str = "sid";

/// Extract the session id from the request's Cookie header
pub fn sid_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Build the Set-Cookie value for a session id
pub fn session_cookie(sid: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, sid)
}

/// Authenticated user extractor
///
/// Resolves the `sid` cookie through the session store to a user record and
/// checks admin privileges (DB flag or the ADMIN_EMAILS list).
#[derive(Debug)]
pub struct AuthedUser {
    pub id: String,
    pub account_email: Option<String>,
    pub is_admin: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let sid = match sid_from_headers(&parts.headers) {
            Some(sid) => sid,
            None => {
                warn!("Authentication failed: missing session cookie");
                return Err(ApiError::Unauthorized("not signed in".into()));
            }
        };

        let user_id = match app_state.sessions.user_id(&sid).await {
            Some(id) => id,
            None => {
                debug!("Authentication failed: session has no user binding");
                return Err(ApiError::Unauthorized("not signed in".into()));
            }
        };

        let user: Option<User> = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&user_id)
            .fetch_optional(&app_state.db)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    user_id = %user_id,
                    "Database error during user lookup in authentication"
                );
                ApiError::DatabaseError(e)
            })?;

        match user {
            Some(u) => {
                if u.is_active == 0 {
                    warn!(user_id = %u.id, "Authentication refused: user is inactive");
                    return Err(ApiError::Forbidden("account is inactive".into()));
                }
                let email_lower = u.email.as_deref().map(str::to_lowercase);
                let is_admin = u.is_admin != 0
                    || email_lower
                        .as_deref()
                        .map(|e| app_state.admin_emails.contains(e))
                        .unwrap_or(false);
                debug!(
                    user_id = %u.id,
                    email = %u.email.as_deref().map(safe_email_log).unwrap_or_default(),
                    is_admin = is_admin,
                    "User authentication successful via extractor"
                );
                Ok(AuthedUser {
                    id: u.id,
                    account_email: u.email,
                    is_admin,
                })
            }
            None => {
                warn!(user_id = %user_id, "Authentication failed: user not found in database");
                Err(ApiError::Unauthorized("user not found".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_sid_from_headers_finds_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sid=ABC123XYZ; other=1"),
        );
        assert_eq!(sid_from_headers(&headers), Some("ABC123XYZ".to_string()));
    }

    #[test]
    fn test_sid_from_headers_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(sid_from_headers(&headers), None);
        assert_eq!(sid_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_sid_from_headers_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sid="));
        assert_eq!(sid_from_headers(&headers), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("ABC123");
        assert!(cookie.starts_with("sid=ABC123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("SameSite=Lax"));
    }
}
