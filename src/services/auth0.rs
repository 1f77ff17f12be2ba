// src/services/auth0.rs
//! Auth0 collaborator: authorize/logout URL construction, authorization-code
//! exchange, and ID-token verification against the tenant's published JWKS.
//!
//! The token endpoint call is the only outbound request the login flow makes.
//! ID tokens are never accepted on transport trust alone; the RS256 signature
//! is checked against the tenant's signing keys, along with issuer and
//! audience.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::common::helpers::safe_token_log;

/// How long fetched signing keys are reused before a refresh
const JWKS_CACHE_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum Auth0Error {
    #[error("Auth0 credentials are not configured")]
    NotConfigured,

    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("identity token rejected: {0}")]
    TokenInvalid(String),

    #[error("failed to fetch signing keys: {0}")]
    JwksFetch(String),

    #[error("no signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Identity claims decoded from a verified ID token.
///
/// Known fields are lifted out; everything else the provider asserts lands
/// in `raw` untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

/// Response from the provider token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub id_token: String,
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    grant_type: &'static str,
    redirect_uri: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug)]
pub struct Auth0Service {
    domain: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    client: Client,
    jwks_cache: RwLock<Option<(Instant, Jwks)>>,
}

impl Auth0Service {
    pub fn new(
        domain: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        client: Client,
    ) -> Self {
        Self {
            domain: domain.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            client,
            jwks_cache: RwLock::new(None),
        }
    }

    /// Build from AUTH0_DOMAIN / AUTH0_CLIENT_ID / AUTH0_CLIENT_SECRET,
    /// with the callback route appended to the deployment base URL
    pub fn from_env(base_url: &str, client: Client) -> Result<Self, Auth0Error> {
        let domain = std::env::var("AUTH0_DOMAIN").map_err(|_| Auth0Error::NotConfigured)?;
        let client_id = std::env::var("AUTH0_CLIENT_ID").map_err(|_| Auth0Error::NotConfigured)?;
        let client_secret =
            std::env::var("AUTH0_CLIENT_SECRET").map_err(|_| Auth0Error::NotConfigured)?;
        let redirect_uri = format!("{}/callback", base_url.trim_end_matches('/'));
        Ok(Self::new(
            &domain,
            &client_id,
            &client_secret,
            &redirect_uri,
            client,
        ))
    }

    fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Redirect target for login initiation
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "https://{}/authorize?client_id={}&response_type=code&scope={}&state={}&redirect_uri={}&screen_hint=signup",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode("openid profile email"),
            urlencoding::encode(state),
            urlencoding::encode(&self.redirect_uri),
        )
    }

    /// Redirect target for logout, bouncing back to `return_to`
    pub fn logout_url(&self, return_to: &str) -> String {
        format!(
            "https://{}/v2/logout?client_id={}&return_to={}",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(return_to),
        )
    }

    /// Exchange an authorization code for tokens at the provider token
    /// endpoint. A non-success status or error body surfaces as
    /// `ExchangeFailed`; no retries.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, Auth0Error> {
        let token_url = format!("https://{}/oauth/token", self.domain);
        let payload = TokenRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code,
            grant_type: "authorization_code",
            redirect_uri: &self.redirect_uri,
        };

        debug!(endpoint = %token_url, "Exchanging authorization code");

        let response = self.client.post(&token_url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(http_status = %status, "Token endpoint returned error");
            return Err(Auth0Error::ExchangeFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Auth0Error::ExchangeFailed(format!("malformed token response: {}", e)))?;
        Ok(token)
    }

    /// Verify an ID token's RS256 signature against the tenant JWKS and
    /// decode its claims, checking issuer and audience.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, Auth0Error> {
        debug!(token = %safe_token_log(id_token), "Verifying identity token");
        let header = decode_header(id_token)
            .map_err(|e| Auth0Error::TokenInvalid(format!("bad header: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| Auth0Error::TokenInvalid("missing kid".to_string()))?;

        let jwk = match self.find_key(&kid, false).await? {
            Some(jwk) => jwk,
            // Key rotation: refetch once before giving up
            None => self
                .find_key(&kid, true)
                .await?
                .ok_or_else(|| Auth0Error::UnknownKey(kid.clone()))?,
        };

        let (n, e) = match (&jwk.n, &jwk.e) {
            (Some(n), Some(e)) if jwk.kty == "RSA" => (n.clone(), e.clone()),
            _ => return Err(Auth0Error::TokenInvalid("unsupported key type".to_string())),
        };
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|e| Auth0Error::TokenInvalid(format!("bad signing key: {}", e)))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.issuer()]);
        validation.set_audience(&[&self.client_id]);

        let token_data = decode::<IdentityClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| Auth0Error::TokenInvalid(e.to_string()))?;
        Ok(token_data.claims)
    }

    async fn find_key(&self, kid: &str, force_refresh: bool) -> Result<Option<Jwk>, Auth0Error> {
        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if let Some((fetched, jwks)) = cache.as_ref() {
                if fetched.elapsed() < Duration::from_secs(JWKS_CACHE_SECS) {
                    return Ok(jwks
                        .keys
                        .iter()
                        .find(|k| k.kid.as_deref() == Some(kid))
                        .cloned());
                }
            }
        }

        let jwks = self.fetch_jwks().await?;
        let found = jwks
            .keys
            .iter()
            .find(|k| k.kid.as_deref() == Some(kid))
            .cloned();
        *self.jwks_cache.write().await = Some((Instant::now(), jwks));
        Ok(found)
    }

    async fn fetch_jwks(&self) -> Result<Jwks, Auth0Error> {
        let url = format!("https://{}/.well-known/jwks.json", self.domain);
        debug!(endpoint = %url, "Fetching JWKS");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Auth0Error::JwksFetch(format!("status {}", status)));
        }
        response
            .json::<Jwks>()
            .await
            .map_err(|e| Auth0Error::JwksFetch(e.to_string()))
    }
}
