//! Per-session conversation state with lazy TTL eviction.
//!
//! Each session id maps to an `Arc<tokio::sync::Mutex<Session>>`, so two
//! turns for the same session serialize their read-modify-write while
//! unrelated sessions proceed concurrently. Expiry is checked on access;
//! there is no background sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::domain::business::Service;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Mutable state of one booking conversation. Owned by the store; the
/// dialogue engine is the only mutator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub chosen_slot: Option<NaiveDateTime>,
    pub service_name: Option<String>,
    pub staff_name: Option<String>,
    pub duration_minutes: Option<u32>,
    pub price_minor: i64,
    /// The first booking-intent-bearing utterance, kept so a later turn
    /// that only answers a sub-question can recover the date and time.
    pub pending_request: Option<String>,
    pub booking_active: bool,
    pub awaiting_service: bool,
    pub awaiting_time: bool,
    pub staff_done: bool,
    pub pricing_confirmed: bool,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub approved: bool,
}

impl ConversationState {
    /// Whether a booking flow has started; while true, turns never fall
    /// back to the chit-chat reply generator.
    pub fn booking_in_progress(&self) -> bool {
        self.booking_active
            || self.chosen_slot.is_some()
            || self.pending_request.is_some()
            || self.awaiting_service
            || self.service_name.is_some()
            || self.staff_done
            || self.pricing_confirmed
    }

    pub fn record_service(&mut self, service: &Service) {
        self.service_name = Some(service.name.clone());
        self.duration_minutes = Some(service.duration_minutes);
        self.price_minor = service.price_minor;
        self.booking_active = true;
    }
}

/// One session slot: the state plus its last-touched stamp.
#[derive(Debug)]
pub struct Session {
    ttl: Duration,
    last_touched: DateTime<Utc>,
    pub state: ConversationState,
}

impl Session {
    fn new(ttl: Duration, now: DateTime<Utc>) -> Self {
        Self { ttl, last_touched: now, state: ConversationState::default() }
    }

    /// Begin a turn: an idle-expired state is replaced with a fresh one,
    /// then the touch stamp advances.
    pub fn begin_turn(&mut self) -> &mut ConversationState {
        self.begin_turn_at(Utc::now())
    }

    pub fn begin_turn_at(&mut self, now: DateTime<Utc>) -> &mut ConversationState {
        let idle = now.signed_duration_since(self.last_touched);
        if idle.num_seconds() >= 0 && idle.to_std().map_or(false, |idle| idle > self.ttl) {
            self.state = ConversationState::default();
        }
        self.last_touched = now;
        &mut self.state
    }
}

/// Concurrent session map. Constructed explicitly and passed to the
/// dialogue engine; there is no process-wide singleton.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<Session>>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: Mutex::new(HashMap::new()) }
    }

    /// Get or lazily create the session for `session_id`.
    pub fn session(&self, session_id: &str) -> Arc<AsyncMutex<Session>> {
        let mut sessions =
            self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new(self.ttl, Utc::now()))))
            .clone()
    }

    /// Drop a session entirely (successful booking or explicit reset).
    pub fn clear(&self, session_id: &str) {
        let mut sessions =
            self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;

    use super::{Session, SessionStore};

    #[tokio::test]
    async fn state_persists_across_turns_within_the_ttl() {
        let store = SessionStore::default();
        {
            let session = store.session("s-1");
            let mut session = session.lock().await;
            session.begin_turn().approved = true;
        }

        let session = store.session("s-1");
        let mut session = session.lock().await;
        assert!(session.begin_turn().approved);
    }

    #[test]
    fn idle_expiry_replaces_the_state_on_access() {
        let now = Utc::now();
        let mut session = Session::new(Duration::from_secs(2 * 60 * 60), now);
        session.begin_turn_at(now).approved = true;

        // Just under the TTL: state survives.
        let later = now + chrono::Duration::hours(1);
        assert!(session.begin_turn_at(later).approved);

        // Beyond the TTL since the last touch: fresh state.
        let expired = later + chrono::Duration::hours(2) + chrono::Duration::seconds(1);
        assert!(!session.begin_turn_at(expired).approved);
    }

    #[tokio::test]
    async fn clear_removes_the_session() {
        let store = SessionStore::default();
        {
            let session = store.session("s-1");
            session.lock().await.begin_turn().approved = true;
        }
        store.clear("s-1");
        assert!(store.is_empty());

        let session = store.session("s-1");
        assert!(!session.lock().await.begin_turn().approved);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let store = SessionStore::default();
        {
            let session = store.session("s-1");
            session.lock().await.begin_turn().approved = true;
        }
        let session = store.session("s-2");
        assert!(!session.lock().await.begin_turn().approved);
        assert_eq!(store.len(), 2);
    }
}
