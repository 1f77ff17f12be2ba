//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - The external-login handshake (login initiation, callback, logout)
//! - Session-cookie handling and the AuthedUser extractor
//! - User directory provisioning from verified identity claims

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::AuthedUser;
pub use models::User;
pub use routes::auth_routes;
