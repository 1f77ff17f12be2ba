// src/schools/routes.rs

use axum::{routing::get, Router};

use super::handlers::{
    create_school, get_school, join_school, leave_school, list_schools, my_memberships,
    update_school,
};

pub fn schools_routes() -> Router {
    Router::new()
        .route("/api/schools", get(list_schools).post(create_school))
        .route("/api/schools/:id", get(get_school).put(update_school))
        .route(
            "/api/schools/:id/members",
            axum::routing::post(join_school).delete(leave_school),
        )
        .route("/api/memberships", get(my_memberships))
}
