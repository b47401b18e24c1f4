//! Audit writer
//!
//! Turns complete drafts into records and hands them to the store in two
//! explicit phases: `stage` collects finalized records, `flush` appends them
//! through the backend's audit path. Records staged before a commit are
//! taken with `take` and ride along in the commit batch instead.

use chrono::Utc;
use tracing::info;

use super::draft::AuditDraft;
use crate::error::{AuditError, AuditResult};
use crate::models::{AuditRecord, FieldMap};
use crate::storage::backend::Backend;

/// Finalize a draft into a record stamped with the current instant
///
/// Fails if any field is still pending; a record must never carry a
/// placeholder. Empty old/new maps are stored as absent.
pub fn finalize(draft: AuditDraft) -> AuditResult<AuditRecord> {
    if let Some(field) = draft.pending_fields().first() {
        return Err(AuditError::UnresolvedField {
            table: draft.table().to_string(),
            field: field.name.to_string(),
        });
    }

    let (table, keys, old, new) = draft.into_parts();

    Ok(AuditRecord {
        id: None,
        table,
        timestamp: Utc::now(),
        key_values: keys.to_json()?,
        old_values: optional_json(&old)?,
        new_values: optional_json(&new)?,
    })
}

fn optional_json(values: &FieldMap) -> AuditResult<Option<String>> {
    if values.is_empty() {
        Ok(None)
    } else {
        values.to_json().map(Some)
    }
}

/// Collects finalized records until they are committed or flushed
#[derive(Debug, Default)]
pub struct AuditWriter {
    staged: Vec<AuditRecord>,
}

impl AuditWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize a draft and stage the resulting record
    ///
    /// Nothing is staged if finalization fails.
    pub fn stage(&mut self, draft: AuditDraft) -> AuditResult<()> {
        let record = finalize(draft)?;
        self.staged.push(record);
        Ok(())
    }

    pub fn staged(&self) -> &[AuditRecord] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Remove and return every staged record
    pub fn take(&mut self) -> Vec<AuditRecord> {
        std::mem::take(&mut self.staged)
    }

    /// Append every staged record through the backend's audit path
    ///
    /// The staged set is consumed either way; on failure none of it is
    /// retried here.
    pub async fn flush<B: Backend + ?Sized>(&mut self, backend: &B) -> AuditResult<Vec<i64>> {
        let records = self.take();
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let count = records.len();
        let ids = backend.append_audit(records).await?;
        info!(records = count, "flushed deferred audit records");
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldDescriptor;
    use crate::tracker::EntryId;
    use serde_json::json;

    fn insert_draft() -> AuditDraft {
        let mut draft = AuditDraft::new(EntryId::new(1), "People");
        draft.set_key("id", json!(5));
        draft.set_new("Name", json!("Alice"));
        draft
    }

    #[test]
    fn test_finalize_insert() {
        let record = finalize(insert_draft()).unwrap();

        assert_eq!(record.table, "People");
        assert_eq!(record.key_values, r#"{"id":5}"#);
        assert_eq!(record.new_values.as_deref(), Some(r#"{"Name":"Alice"}"#));
        assert!(record.old_values.is_none());
        assert!(record.id.is_none());
    }

    #[test]
    fn test_finalize_rejects_pending_fields() {
        let mut draft = insert_draft();
        draft.defer(FieldDescriptor::generated("CreatedAt"));

        let err = finalize(draft).unwrap_err();
        assert!(
            matches!(err, AuditError::UnresolvedField { ref field, .. } if field == "CreatedAt")
        );
    }

    #[test]
    fn test_finalize_keys_only() {
        let mut draft = AuditDraft::new(EntryId::new(1), "Tags");
        draft.set_key("id", json!(3));

        let record = finalize(draft).unwrap();
        assert!(record.old_values.is_none());
        assert!(record.new_values.is_none());
        assert_eq!(record.key_map().unwrap().get("id"), Some(&json!(3)));
    }

    #[test]
    fn test_stage_and_take() {
        let mut writer = AuditWriter::new();
        writer.stage(insert_draft()).unwrap();
        writer.stage(insert_draft()).unwrap();

        assert_eq!(writer.len(), 2);
        let taken = writer.take();
        assert_eq!(taken.len(), 2);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_failed_stage_leaves_nothing() {
        let mut writer = AuditWriter::new();
        let mut draft = insert_draft();
        draft.defer(FieldDescriptor::generated_key("id"));

        assert!(writer.stage(draft).is_err());
        assert!(writer.is_empty());
    }
}
