//! # Accounts Module
//!
//! Volunteer profile management: view and edit the profile provisioned at
//! first login, opt in or out of the public roster, and self-service deletion.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod validators;

#[cfg(test)]
mod tests;

pub use models::Account;
pub use routes::accounts_routes;
