//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User directory record, keyed by the identity provider's stable subject.
/// Created on the first successful callback, updated on every later login,
/// never deleted by the login flow.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    pub is_active: i64,
    pub is_admin: i64,
    pub created_at: String,
    pub last_login: Option<String>,
    pub updated_at: Option<String>,
}

/// Query parameters for `GET /login`
#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Query parameters for `GET /callback`
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
}

/// Result of authenticating identity claims against the user directory
#[derive(Debug)]
pub struct AuthOutcome {
    pub user: User,
    pub first_login: bool,
}
