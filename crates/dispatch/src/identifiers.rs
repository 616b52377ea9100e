//! Newtype domain identifiers.
//!
//! Every named thing the dispatch pass touches is a distinct newtype wrapping a
//! `String`, so a [`JobName`] can never be passed where a [`SourceOwnerName`]
//! is expected even though both are plain names underneath.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single dispatch pass (one inbound notification).
///
/// Generated fresh for every pass and recorded on the pass span so all log
/// lines for one notification can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DispatchPassId(Uuid);

impl DispatchPassId {
    /// Generates a new random pass identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DispatchPassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-backed identifiers (registry names)
// ---------------------------------------------------------------------------

string_id! {
    /// Full name of a registered job (e.g. `"folder/build-main"`).
    JobName
}

string_id! {
    /// Full name of an entity that owns a set of sources (e.g. a multi-branch project).
    SourceOwnerName
}

string_id! {
    /// Identifies one source descriptor within its owner.
    SourceId
}

string_id! {
    /// The elevated identity a dispatch pass runs under while enumerating the registry.
    SystemIdentity
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self("SYSTEM".to_string())
    }
}
