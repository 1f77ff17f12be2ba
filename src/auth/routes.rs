//! Authentication routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /login` - Start the external-login handshake (optional `next` query)
/// - `GET /callback` - Provider redirect target (`state`, `code` queries)
/// - `GET /logout` - Clear the session and bounce through provider logout
/// - `GET /api/me` - Current user information
/// - `GET /api/messages` - Drain queued flash messages
pub fn auth_routes() -> Router {
    Router::new()
        .route("/login", get(handlers::login_handler))
        .route("/callback", get(handlers::callback_handler))
        .route("/logout", get(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
        .route("/api/messages", get(handlers::messages_handler))
}
