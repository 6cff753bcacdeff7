//! Per-user session store.
//!
//! Owns one [`Session`] per user id. Each session sits behind two locks:
//!
//! - a short **state lock** taken for every read and for the combined
//!   append + truncate, so readers never observe a half-applied mutation;
//! - an async **exchange gate** held for the whole of one chat exchange
//!   (including the network wait), so two messages from the same user run
//!   one after the other and their user/assistant pairs never interleave.
//!
//! Neither lock is shared between users, and the gate is never needed for
//! reads, so a slow model call only ever delays the next message of the same
//! user.

use parking_lot::{Mutex, RwLock};
use persona_domain::{
    ContextSummary, ContextWindow, DomainError, RolePromptRegistry, Session, Turn,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

struct SessionSlot {
    session: Mutex<Session>,
    exchange: Arc<tokio::sync::Mutex<()>>,
}

impl SessionSlot {
    fn new(user_id: &str, role: &str) -> Self {
        Self {
            session: Mutex::new(Session::new(user_id, role)),
            exchange: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Proof that the holder owns the exchange gate for one user.
///
/// Released on drop.
pub struct ExchangeGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Store of per-user sessions.
pub struct SessionStore {
    slots: RwLock<HashMap<String, Arc<SessionSlot>>>,
    registry: Arc<RolePromptRegistry>,
    window: RwLock<ContextWindow>,
    default_role: String,
}

impl SessionStore {
    /// Create a store; `default_role` must be registered.
    pub fn new(
        registry: Arc<RolePromptRegistry>,
        window: ContextWindow,
        default_role: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let default_role = default_role.into();
        if !registry.contains(&default_role) {
            return Err(DomainError::UnknownRole(default_role));
        }
        Ok(Self {
            slots: RwLock::new(HashMap::new()),
            registry,
            window: RwLock::new(window),
            default_role,
        })
    }

    pub fn registry(&self) -> &Arc<RolePromptRegistry> {
        &self.registry
    }

    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    pub fn window(&self) -> ContextWindow {
        *self.window.read()
    }

    /// Replace the window used by subsequent appends.
    pub fn set_window(&self, window: ContextWindow) {
        *self.window.write() = window;
    }

    pub fn session_count(&self) -> usize {
        self.slots.read().len()
    }

    fn slot(&self, user_id: &str) -> Option<Arc<SessionSlot>> {
        self.slots.read().get(user_id).cloned()
    }

    fn slot_or_create(&self, user_id: &str) -> Arc<SessionSlot> {
        if let Some(slot) = self.slot(user_id) {
            return slot;
        }
        self.slots
            .write()
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, role = %self.default_role, "Creating session");
                Arc::new(SessionSlot::new(user_id, &self.default_role))
            })
            .clone()
    }

    /// Snapshot of the user's session, creating it with the default role.
    pub fn get_or_create(&self, user_id: &str) -> Session {
        self.slot_or_create(user_id).session.lock().clone()
    }

    /// Snapshot of the user's session, if one exists.
    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.slot(user_id).map(|slot| slot.session.lock().clone())
    }

    /// Append `turn`, truncate to the window, and return the retained turns.
    ///
    /// Both steps happen under the session's state lock.
    pub fn append_turn(&self, user_id: &str, turn: Turn) -> Vec<Turn> {
        let window = self.window();
        let slot = self.slot_or_create(user_id);
        let mut session = slot.session.lock();

        let mut turns = session.turns().to_vec();
        turns.push(turn);
        let retained = window.apply(&turns);
        if retained.len() < turns.len() {
            debug!(
                user_id,
                dropped = turns.len() - retained.len(),
                max_turns = window.max_turns(),
                "Truncated context"
            );
        }
        session.replace_turns(retained.clone());
        retained
    }

    /// Switch the user's role. Returns false, changing nothing, if `role_id`
    /// is not registered.
    pub fn set_role(&self, user_id: &str, role_id: &str) -> bool {
        if !self.registry.contains(role_id) {
            return false;
        }
        self.slot_or_create(user_id)
            .session
            .lock()
            .set_current_role(role_id);
        true
    }

    /// The user's role, or the default role if there is no session.
    pub fn current_role(&self, user_id: &str) -> String {
        self.slot(user_id)
            .map(|slot| slot.session.lock().current_role().to_string())
            .unwrap_or_else(|| self.default_role.clone())
    }

    /// Empty the user's turns and reset the role to the default.
    pub fn clear(&self, user_id: &str) {
        if let Some(slot) = self.slot(user_id) {
            slot.session.lock().reset(self.default_role.as_str());
        }
    }

    /// Drop every session.
    ///
    /// An exchange already in flight keeps its detached session; its reply
    /// is not visible to later reads.
    pub fn clear_all(&self) {
        self.slots.write().clear();
    }

    /// The user's retained turns, if a session exists.
    pub fn turns(&self, user_id: &str) -> Option<Vec<Turn>> {
        self.slot(user_id)
            .map(|slot| slot.session.lock().turns().to_vec())
    }

    pub fn summary(&self, user_id: &str) -> ContextSummary {
        let max_turns = self.window().max_turns();
        match self.slot(user_id) {
            Some(slot) => ContextSummary::of(&slot.session.lock(), max_turns),
            None => ContextSummary::empty(self.default_role.as_str(), max_turns),
        }
    }

    /// Wait for exclusive use of the user's exchange gate.
    pub async fn begin_exchange(&self, user_id: &str) -> ExchangeGuard {
        let gate = self.slot_or_create(user_id).exchange.clone();
        ExchangeGuard {
            _guard: gate.lock_owned().await,
        }
    }
}
