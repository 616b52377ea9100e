//! Elevated execution identity for the duration of a dispatch pass.
//!
//! [`ElevatedScope`] acquires the system identity on creation and restores the
//! caller's identity when dropped, so every exit path (including `?` and a
//! dropped future) puts the previous context back.

use tracing::trace;

use crate::SystemIdentity;

/// The identity that was in effect before impersonation. `None` is anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedContext(pub Option<String>);

/// Switches the identity the registry is queried under.
pub trait SecurityContext: Send + Sync {
    /// Makes `identity` current and returns what it replaced.
    fn impersonate(&self, identity: &SystemIdentity) -> SavedContext;

    /// Puts a previously saved context back.
    fn restore(&self, previous: SavedContext);
}

/// Guard holding the elevated identity until dropped.
pub struct ElevatedScope<'a> {
    context: &'a dyn SecurityContext,
    saved: Option<SavedContext>,
}

impl<'a> ElevatedScope<'a> {
    /// Impersonates `identity` until the returned guard is dropped.
    pub fn enter(context: &'a dyn SecurityContext, identity: &SystemIdentity) -> Self {
        let saved = context.impersonate(identity);
        trace!(identity = %identity, "Entered elevated scope");
        Self {
            context,
            saved: Some(saved),
        }
    }
}

impl Drop for ElevatedScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.context.restore(saved);
            trace!("Restored caller security context");
        }
    }
}
