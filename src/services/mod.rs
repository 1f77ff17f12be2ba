// Services module - external collaborators and shared infrastructure

pub mod auth0;
pub mod rate_limit;
pub mod sessions;

pub use auth0::{Auth0Error, Auth0Service, IdentityClaims, TokenResponse};
pub use rate_limit::{RateLimitResult, RateLimitService};
pub use sessions::{FlashLevel, FlashMessage, PendingLogin, SessionService};
