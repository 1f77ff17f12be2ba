// src/services/sessions.rs
//! In-memory session store
//!
//! Holds the short-lived per-browser state the login handshake needs:
//! the pending-login entry written at `/login` and consumed at `/callback`,
//! the authenticated user binding, and flash messages queued for the next
//! page load. Entries are keyed by a random `sid` cookie value and expire
//! after an idle period; pending-login entries have their own tighter TTL
//! and are read-once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::common::id_generator::generate_raw_id;

/// How long a pending login may sit between /login and /callback
const PENDING_TTL_SECS: u64 = 600;
/// Idle lifetime of a whole session entry
const SESSION_IDLE_SECS: u64 = 60 * 60 * 24;

/// Ephemeral correlation state written at login initiation and consumed
/// (exactly once) at the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogin {
    pub nonce: String,
    pub next_url: String,
}

impl PendingLogin {
    /// The `state` value carried through the provider redirect:
    /// nonce and destination joined by a delimiter that URLs don't contain.
    pub fn state(&self) -> String {
        format!("{}|{}", self.nonce, self.next_url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Error,
}

/// User-facing message queued in the session, drained on the next fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    pub fn success(text: &str) -> Self {
        Self {
            level: FlashLevel::Success,
            text: text.to_string(),
        }
    }

    pub fn warning(text: &str) -> Self {
        Self {
            level: FlashLevel::Warning,
            text: text.to_string(),
        }
    }

    pub fn error(text: &str) -> Self {
        Self {
            level: FlashLevel::Error,
            text: text.to_string(),
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    pending: Option<(PendingLogin, Instant)>,
    user_id: Option<String>,
    flash: Vec<FlashMessage>,
    touched: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            pending: None,
            user_id: None,
            flash: Vec::new(),
            touched: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.touched = Instant::now();
    }

    fn is_idle(&self, idle_ttl: Duration) -> bool {
        self.touched.elapsed() > idle_ttl
    }
}

#[derive(Debug, Clone)]
pub struct SessionService {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
    pending_ttl: Duration,
    idle_ttl: Duration,
}

impl SessionService {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            pending_ttl: Duration::from_secs(PENDING_TTL_SECS),
            idle_ttl: Duration::from_secs(SESSION_IDLE_SECS),
        }
    }

    #[cfg(test)]
    fn with_ttls(pending_ttl: Duration, idle_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            pending_ttl,
            idle_ttl,
        }
    }

    /// Mint a fresh session identifier for the `sid` cookie
    pub fn new_sid(&self) -> String {
        generate_raw_id(32)
    }

    /// Write the pending-login entry, overwriting any prior attempt
    pub async fn set_pending(&self, sid: &str, pending: PendingLogin) {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(sid.to_string())
            .or_insert_with(SessionEntry::new);
        entry.pending = Some((pending, Instant::now()));
        entry.touch();
    }

    /// Consume the pending-login entry. The entry is removed whether or not
    /// it is still fresh, so a nonce can never be replayed.
    pub async fn take_pending(&self, sid: &str) -> Option<PendingLogin> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(sid)?;
        entry.touch();
        let (pending, created) = entry.pending.take()?;
        if created.elapsed() > self.pending_ttl {
            debug!("Discarding expired pending login");
            return None;
        }
        Some(pending)
    }

    /// Bind an authenticated user to the session
    pub async fn login(&self, sid: &str, user_id: &str) {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(sid.to_string())
            .or_insert_with(SessionEntry::new);
        entry.user_id = Some(user_id.to_string());
        entry.touch();
    }

    /// Clear the user binding and any pending login; queued flash messages
    /// survive so a logout confirmation can still be shown.
    pub async fn logout(&self, sid: &str) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(sid) {
            entry.user_id = None;
            entry.pending = None;
            entry.touch();
        }
    }

    pub async fn user_id(&self, sid: &str) -> Option<String> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(sid)?;
        entry.touch();
        entry.user_id.clone()
    }

    pub async fn push_flash(&self, sid: &str, message: FlashMessage) {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(sid.to_string())
            .or_insert_with(SessionEntry::new);
        entry.flash.push(message);
        entry.touch();
    }

    /// Drain queued flash messages
    pub async fn take_flash(&self, sid: &str) -> Vec<FlashMessage> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(sid) {
            Some(entry) => {
                entry.touch();
                std::mem::take(&mut entry.flash)
            }
            None => Vec::new(),
        }
    }

    /// Drop idle sessions (called periodically)
    pub async fn purge_expired(&self) {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_idle(self.idle_ttl));
        let removed = before - entries.len();
        if removed > 0 {
            info!(removed = removed, "Purged idle sessions");
        }
    }

    /// Spawn the periodic session cleanup task
    pub fn start_cleanup_task(service: Arc<SessionService>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                service.purge_expired().await;
            }
        });
    }
}

impl Default for SessionService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_login_is_single_use() {
        let sessions = SessionService::new();
        let pending = PendingLogin {
            nonce: "N0NC3".to_string(),
            next_url: "/account".to_string(),
        };
        sessions.set_pending("sid-1", pending.clone()).await;

        assert_eq!(sessions.take_pending("sid-1").await, Some(pending));
        // Second read finds nothing - the entry was consumed
        assert_eq!(sessions.take_pending("sid-1").await, None);
    }

    #[tokio::test]
    async fn test_new_attempt_overwrites_prior_pending() {
        let sessions = SessionService::new();
        sessions
            .set_pending(
                "sid-1",
                PendingLogin {
                    nonce: "FIRST".to_string(),
                    next_url: "/account".to_string(),
                },
            )
            .await;
        sessions
            .set_pending(
                "sid-1",
                PendingLogin {
                    nonce: "SECOND".to_string(),
                    next_url: "/schools".to_string(),
                },
            )
            .await;

        let pending = sessions.take_pending("sid-1").await.unwrap();
        assert_eq!(pending.nonce, "SECOND");
        assert_eq!(pending.next_url, "/schools");
    }

    #[tokio::test]
    async fn test_expired_pending_is_discarded() {
        let sessions =
            SessionService::with_ttls(Duration::from_millis(10), Duration::from_secs(3600));
        sessions
            .set_pending(
                "sid-1",
                PendingLogin {
                    nonce: "N".to_string(),
                    next_url: "/".to_string(),
                },
            )
            .await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(sessions.take_pending("sid-1").await, None);
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let sessions = SessionService::new();
        sessions.login("sid-1", "U_ABC123").await;
        assert_eq!(sessions.user_id("sid-1").await.as_deref(), Some("U_ABC123"));

        sessions.logout("sid-1").await;
        assert_eq!(sessions.user_id("sid-1").await, None);
    }

    #[tokio::test]
    async fn test_logout_keeps_flash_messages() {
        let sessions = SessionService::new();
        sessions.login("sid-1", "U_ABC123").await;
        sessions.logout("sid-1").await;
        sessions
            .push_flash("sid-1", FlashMessage::success("You Have Been Logged Out!"))
            .await;

        let flash = sessions.take_flash("sid-1").await;
        assert_eq!(flash.len(), 1);
        assert_eq!(flash[0].level, FlashLevel::Success);
        // Drained on read
        assert!(sessions.take_flash("sid-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_idle_sessions() {
        let sessions =
            SessionService::with_ttls(Duration::from_secs(600), Duration::from_millis(10));
        sessions.login("sid-1", "U_ABC123").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        sessions.purge_expired().await;
        assert_eq!(sessions.user_id("sid-1").await, None);
    }

    #[test]
    fn test_state_joins_nonce_and_next_url() {
        let pending = PendingLogin {
            nonce: "ABC123".to_string(),
            next_url: "/account".to_string(),
        };
        assert_eq!(pending.state(), "ABC123|/account");
    }
}
