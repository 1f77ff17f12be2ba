//! # Schools Module
//!
//! The school directory and volunteer sign-up: browse and search schools,
//! join or leave one as a volunteer, and admin-only directory maintenance.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;


pub use models::School;
pub use routes::schools_routes;
