//! Process-wide holder of the live session.

use crate::session::Session;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, instrument};

/// Holds at most one [`Session`] and creates it on first use.
///
/// The registry lock only guards the get-or-create decision. It is released
/// before the caller touches the session, so it never nests with the
/// session's own lock.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    current: Arc<Mutex<Option<Arc<Session>>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session registry");
        Self::default()
    }

    /// Returns the live session, creating it if none exists yet.
    #[instrument(skip(self))]
    pub fn session(&self) -> Arc<Session> {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some(session) => {
                debug!("Joining existing session");
                Arc::clone(session)
            }
            None => {
                let session = Arc::new(Session::new());
                *current = Some(Arc::clone(&session));
                session
            }
        }
    }

    /// Returns the live session without creating one.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
