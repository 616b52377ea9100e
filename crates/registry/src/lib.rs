//! Hookprobe registry infrastructure.
//!
//! Implements the port traits defined in the [`dispatch`] crate for a
//! deployment whose jobs and source owners are declared in a TOML manifest:
//!
//! - [`ManifestRegistry`]: `dispatch::Registry` over the manifest contents.
//! - [`ProcessIdentity`]: `dispatch::SecurityContext` holding the process's
//!   current identity.
//! - [`TriggerSink`]: where manifest triggers deliver "job triggered" and
//!   "source updated" signals; [`LoggingSink`] logs and records them.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Manifest parsing and file access live here; the
//! [`dispatch`] crate only sees the trait objects.

pub mod errors;
pub mod identity;
pub mod manifest;
pub mod sink;

pub use errors::ManifestError;
pub use identity::ProcessIdentity;
pub use manifest::{ManifestJob, ManifestOwner, ManifestRegistry};
pub use sink::{LoggingSink, TriggerEvent, TriggerSink};
