//! Automatic audit capture
//!
//! Every successful commit leaves one durable [`AuditRecord`] per mutated
//! entity, without the caller writing any audit code.
//!
//! # Architecture
//!
//! - `snapshot`: runs before the commit. Builds an [`AuditDraft`] per added,
//!   modified or deleted entry. Complete drafts are finalized right away and
//!   travel with the commit; drafts waiting on store-generated values are
//!   deferred.
//! - `resolver`: runs after a successful commit. Reads the generated values
//!   back from the tracker and completes the deferred drafts.
//! - `writer`: finalizes drafts into records and appends them through the
//!   backend's audit path.
//! - `diff`: human-readable change summaries for display.
//!
//! A failed commit drops every draft, so no record ever describes a change
//! that did not persist.
//!
//! [`AuditRecord`]: crate::models::AuditRecord

mod diff;
mod draft;
mod resolver;
mod snapshot;
mod writer;

pub use diff::{describe_changes, format_value, summarize_changes};
pub use draft::AuditDraft;
pub use resolver::resolve;
pub use snapshot::{capture, Snapshot};
pub use writer::{finalize, AuditWriter};
