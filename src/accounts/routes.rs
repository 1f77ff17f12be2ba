// src/accounts/routes.rs

use axum::{routing::get, Router};

use super::handlers::{delete_account, get_account, roster, update_account};

pub fn accounts_routes() -> Router {
    Router::new()
        .route(
            "/api/account",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route("/api/roster", get(roster))
}
