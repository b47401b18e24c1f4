//! Audited unit of work
//!
//! `AuditContext` wraps a change tracker and a storage backend. Every call
//! to [`AuditContext::save_changes`] commits the pending mutations and
//! leaves one audit record per mutated entity:
//!
//! 1. Scan the tracker and build drafts (before commit).
//! 2. Commit row changes together with the drafts that were already
//!    complete.
//! 3. On success, write the store-generated values back into the tracker,
//!    finish the deferred drafts and append them through the backend's
//!    audit path.
//!
//! If the commit fails, or the future is dropped before it completes, the
//! drafts of that cycle are discarded and nothing is audited.

use tracing::{debug, info, warn};

use crate::audit::{self, Snapshot};
use crate::config::Settings;
use crate::error::AuditResult;
use crate::models::{Entity, SchemaRegistry};
use crate::storage::{Backend, CommitBatch};
use crate::tracker::{EntityState, EntryId, Tracker};

/// What one `save_changes` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Rows inserted, updated or deleted
    pub rows_affected: usize,
    /// Audit records written inside the commit
    pub audited_in_commit: usize,
    /// Audit records written by the follow-up flush
    pub audited_after_commit: usize,
    /// Store-assigned ids of every audit record, commit first
    pub audit_ids: Vec<i64>,
}

impl SaveSummary {
    pub fn audited(&self) -> usize {
        self.audited_in_commit + self.audited_after_commit
    }
}

/// A change tracker bound to a backend, auditing every commit
pub struct AuditContext<B: Backend> {
    tracker: Tracker,
    backend: B,
    settings: Settings,
}

impl<B: Backend> AuditContext<B> {
    pub fn new(registry: SchemaRegistry, backend: B, settings: Settings) -> Self {
        Self {
            tracker: Tracker::new(registry),
            backend,
            settings,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut Tracker {
        &mut self.tracker
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Track a new entity for insertion
    pub fn add<E: Entity>(&mut self, entity: &E) -> AuditResult<EntryId> {
        self.tracker.add(entity)
    }

    /// Track an entity that is already stored
    pub fn attach<E: Entity>(&mut self, entity: &E) -> AuditResult<EntryId> {
        self.tracker.attach(entity)
    }

    /// Replace the current values of a tracked entity
    pub fn update<E: Entity>(&mut self, id: EntryId, entity: &E) -> AuditResult<()> {
        self.tracker.update(id, entity)
    }

    /// Mark a tracked entity for deletion
    pub fn remove(&mut self, id: EntryId) -> AuditResult<()> {
        self.tracker.remove(id)
    }

    /// Current values of a tracked entity
    pub fn get<E: Entity>(&self, id: EntryId) -> AuditResult<E> {
        self.tracker.get(id)
    }

    pub fn state(&self, id: EntryId) -> EntityState {
        self.tracker.state(id)
    }

    /// Commit all pending changes and audit them
    ///
    /// Returns without touching the backend when nothing is pending.
    ///
    /// # Errors
    ///
    /// - `PendingOnDelete` if a deleted entity still waits on a generated
    ///   value (nothing is committed)
    /// - `Commit` or `CommitRejected` if the commit step failed (nothing is
    ///   committed or audited)
    /// - `UnresolvedField` if the store did not assign a deferred field
    /// - Any error from the follow-up audit flush
    pub async fn save_changes(&mut self) -> AuditResult<SaveSummary> {
        let Snapshot {
            mut staged,
            deferred,
        } = audit::capture(&mut self.tracker, &self.settings)?;

        let mutations = self.tracker.pending_mutations();
        if mutations.is_empty() {
            debug!("no pending changes; skipping commit");
            return Ok(SaveSummary::default());
        }

        let batch = CommitBatch {
            mutations,
            audit: staged.take(),
        };
        let audited_in_commit = batch.audit.len();
        info!(
            mutations = batch.mutations.len(),
            audit_records = audited_in_commit,
            deferred = deferred.len(),
            "committing changes"
        );

        let receipt = match self.backend.commit(batch).await {
            Ok(receipt) => receipt,
            Err(e) => {
                let e = e.into_commit_failure();
                warn!(error = %e, discarded = deferred.len(), "commit failed; audit drafts discarded");
                return Err(e);
            }
        };

        // The store now holds the committed state; make it the baseline
        // before anything below can fail.
        self.tracker.apply_generated(&receipt.generated)?;
        self.tracker.accept_changes();

        let mut writer = audit::resolve(deferred, &self.tracker)?;
        let audited_after_commit = writer.len();
        let flushed = writer.flush(&self.backend).await?;

        let mut audit_ids = receipt.audit_ids;
        audit_ids.extend(flushed);

        info!(
            rows = receipt.rows_affected,
            audited = audited_in_commit + audited_after_commit,
            "changes committed"
        );

        Ok(SaveSummary {
            rows_affected: receipt.rows_affected,
            audited_in_commit,
            audited_after_commit,
            audit_ids,
        })
    }
}
