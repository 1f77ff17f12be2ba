// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

use crate::services::{Auth0Service, RateLimitService, SessionService};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub http: Client,
    /// Absolute base URL of this deployment, no trailing slash
    pub base_url: String,
    pub admin_emails: HashSet<String>,
    pub auth0: Arc<Auth0Service>,
    pub sessions: Arc<SessionService>,
    pub rate_limit_service: Arc<RateLimitService>,
}
