//! Process-wide current identity.

use std::sync::{Mutex, PoisonError};

use dispatch::{SavedContext, SecurityContext, SystemIdentity};
use tracing::debug;

/// Holds the identity the process is currently acting as.
///
/// Starts as the identity given to [`ProcessIdentity::new`] (or anonymous) and
/// is switched by the dispatch loop for the duration of each pass.
#[derive(Debug, Default)]
pub struct ProcessIdentity {
    current: Mutex<Option<String>>,
}

impl ProcessIdentity {
    /// Starts as `initial`; `None` is anonymous.
    pub fn new(initial: Option<String>) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    /// The identity currently in effect.
    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SecurityContext for ProcessIdentity {
    fn impersonate(&self, identity: &SystemIdentity) -> SavedContext {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = current.replace(identity.to_string());
        debug!(identity = %identity, previous = ?previous, "Impersonating");
        SavedContext(previous)
    }

    fn restore(&self, previous: SavedContext) {
        debug!(identity = ?previous.0, "Restoring identity");
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = previous.0;
    }
}
