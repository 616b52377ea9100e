//! Dispatch core for webhook-driven build triggers.
//!
//! Given a notification that the repository at some URL changed, finds every
//! registered job and source whose source-control configuration refers to the
//! same repository and triggers exactly those, at most once per configuration.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! Enumeration of jobs, identity switching and the trigger actions themselves
//! are supplied through the traits in [`ports`] and [`security`].
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`JobName`, `DispatchPassId`, etc.) |
//! | [`url`] | `RepositoryUrl` parsing for URL, scp-like and local-path remotes |
//! | [`canonical`] | Canonicalisation of a candidate remote against the notification |
//! | [`matcher`] | Loose git matching, strict mercurial matching |
//! | [`source`] | Source configuration types and the adapter layer |
//! | [`dispatcher`] | The dispatch loop |
//! | [`ports`] | Registry, job, trigger and source-owner traits |
//! | [`security`] | Scoped elevated identity |
//! | [`report`] | Per-pass outcome |
//! | [`types`] | `SourceKind`, `Notification`, `Timestamp` |
//! | [`errors`] | Error types |
//! | `fakes` | In-memory port implementations for tests (feature `fakes`) |

pub mod canonical;
pub mod dispatcher;
pub mod errors;
#[cfg(any(test, feature = "fakes"))]
pub mod fakes;
pub mod identifiers;
pub mod matcher;
pub mod ports;
pub mod report;
pub mod security;
pub mod source;
pub mod types;
pub mod url;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use canonical::{canonicalize, strip_proxy_prefix, PROXY_PATH_PREFIX};
pub use dispatcher::Dispatcher;
pub use errors::{CollaboratorError, DispatchError, RemoteParseFailure, UrlParseError};
pub use identifiers::{DispatchPassId, JobName, SourceId, SourceOwnerName, SystemIdentity};
pub use matcher::{loosely_matches, match_configuration, match_git, match_mercurial, match_source};
pub use ports::{CandidateJob, HookTrigger, Registry, SourceOwner};
pub use report::{DispatchReport, UpdatedSource};
pub use security::{ElevatedScope, SavedContext, SecurityContext};
pub use source::{RemoteConfig, SourceConfiguration, SourceDescriptor, SourceRemote};
pub use types::{Notification, SourceKind, Timestamp};
pub use crate::url::RepositoryUrl;
