//! Change tracking
//!
//! The audit core only reads what a change tracker exposes: a refresh call,
//! the entries, and per-field metadata and values. `ChangeTracker` is that
//! seam; `Tracker` is the in-memory implementation the context uses.

pub mod entry;
pub mod memory;

pub use entry::{EntityState, EntryId, PropertyEntry, TrackedEntry};
pub use memory::Tracker;

/// What the audit core consumes from a change tracker
pub trait ChangeTracker {
    /// Recompute which fields differ from their original values
    fn detect_changes(&mut self);

    /// All tracked entries, in tracking order
    fn entries(&self) -> &[TrackedEntry];

    /// Look up one entry
    fn entry(&self, id: EntryId) -> Option<&TrackedEntry> {
        self.entries().iter().find(|e| e.id() == id)
    }
}
