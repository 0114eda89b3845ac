use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use playhead_core::backend::Backend;
use playhead_core::ids::SessionId;

use crate::storage::{KeyValueStorage, SESSION_KEY};

/// The active session as seen by the client. `id` is `None` until a
/// session has been restored or created.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    id: Option<SessionId>,
}

impl Session {
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn is_established(&self) -> bool {
        self.id.is_some()
    }
}

/// Owns the durable session id.
///
/// `bootstrap` runs its restore-or-create logic once per store; every
/// later call returns whatever is current. A failed bootstrap leaves the
/// session unset and is not retried.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    backend: Arc<dyn Backend>,
    current: RwLock<Option<SessionId>>,
    booted: tokio::sync::Mutex<bool>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, backend: Arc<dyn Backend>) -> Self {
        Self {
            storage,
            backend,
            current: RwLock::new(None),
            booted: tokio::sync::Mutex::new(false),
        }
    }

    pub fn current(&self) -> Session {
        Session {
            id: self.current.read().clone(),
        }
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.current.read().clone()
    }

    #[instrument(skip(self), fields(backend = self.backend.name()))]
    pub async fn bootstrap(&self) -> Session {
        // Held across the backend call so concurrent callers wait for the
        // first attempt instead of issuing their own.
        let mut booted = self.booted.lock().await;
        if *booted {
            return self.current();
        }
        *booted = true;

        if let Some(id) = self.restore() {
            info!(session_id = %id, "restored session");
            let mut current = self.current.write();
            if current.is_none() {
                *current = Some(id);
            }
            drop(current);
            return self.current();
        }

        match self.backend.create_session().await {
            Ok(resp) => match SessionId::parse(resp.session_id) {
                Some(id) => {
                    let mut current = self.current.write();
                    if let Some(existing) = current.as_ref() {
                        // adopted while the request was in flight
                        debug!(session_id = %existing, "keeping session adopted during bootstrap");
                    } else {
                        self.persist(&id);
                        info!(session_id = %id, "created new session");
                        *current = Some(id);
                    }
                }
                None => warn!("backend returned an empty session id"),
            },
            Err(e) => warn!(error = %e, kind = e.error_kind(), "failed to init session"),
        }

        self.current()
    }

    /// Replace the current session with `new_id` if it is non-empty and
    /// different. Returns whether the session changed.
    #[instrument(skip(self))]
    pub fn adopt(&self, new_id: &str) -> bool {
        let Some(id) = SessionId::parse(new_id) else {
            return false;
        };

        let mut current = self.current.write();
        if current.as_ref() == Some(&id) {
            return false;
        }
        self.persist(&id);
        info!(session_id = %id, previous = ?current.as_ref().map(SessionId::as_str), "adopted session");
        *current = Some(id);
        true
    }

    fn restore(&self) -> Option<SessionId> {
        match self.storage.get(SESSION_KEY) {
            Ok(raw) => raw.and_then(SessionId::parse),
            Err(e) => {
                warn!(error = %e, "failed to read persisted session");
                None
            }
        }
    }

    fn persist(&self, id: &SessionId) {
        if let Err(e) = self.storage.set(SESSION_KEY, id.as_str()) {
            warn!(error = %e, session_id = %id, "failed to persist session");
        }
    }
}
