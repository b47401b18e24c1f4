//! Post-commit resolver
//!
//! Runs only after a successful commit. Reads the now-final value of every
//! deferred field from the same tracked entry, completes the drafts and
//! stages them for the follow-up flush.

use serde_json::Value;
use tracing::debug;

use super::draft::AuditDraft;
use super::writer::AuditWriter;
use crate::error::{AuditError, AuditResult};
use crate::tracker::ChangeTracker;

/// Resolve every deferred draft and stage the finished records
///
/// A pending field that still has no real value is a broken tracker
/// contract and fails the whole batch; nothing is staged in that case.
pub fn resolve<T>(deferred: Vec<AuditDraft>, tracker: &T) -> AuditResult<AuditWriter>
where
    T: ChangeTracker + ?Sized,
{
    let mut writer = AuditWriter::new();
    if deferred.is_empty() {
        return Ok(writer);
    }

    let mut completed = Vec::with_capacity(deferred.len());
    for mut draft in deferred {
        let entry = tracker.entry(draft.entry()).ok_or_else(|| {
            AuditError::Tracker(format!(
                "{} for table '{}' left the tracker before its audit was resolved",
                draft.entry(),
                draft.table()
            ))
        })?;

        let pending = draft.pending_fields().to_vec();
        for field in &pending {
            let unresolved = || AuditError::UnresolvedField {
                table: draft.table().to_string(),
                field: field.name.to_string(),
            };

            let property = entry.property(field.name).ok_or_else(unresolved)?;
            if property.is_temporary || property.current == Value::Null {
                return Err(unresolved());
            }

            debug!(
                table = draft.table(),
                field = field.name,
                value = %property.current,
                "resolved generated field"
            );
            draft.resolve(field, property.current.clone());
        }
        completed.push(draft);
    }

    for draft in completed {
        writer.stage(draft)?;
    }
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntitySchema, FieldDescriptor};
    use crate::tracker::{EntityState, EntryId, PropertyEntry, TrackedEntry};
    use serde_json::json;

    static PEOPLE: EntitySchema = EntitySchema::new(
        "Person",
        "People",
        &[
            FieldDescriptor::generated_key("id"),
            FieldDescriptor::column("Name"),
            FieldDescriptor::generated("CreatedAt"),
        ],
    );

    struct Entries(Vec<TrackedEntry>);

    impl ChangeTracker for Entries {
        fn detect_changes(&mut self) {}

        fn entries(&self) -> &[TrackedEntry] {
            &self.0
        }
    }

    fn committed_entry(id_value: Value, temporary: bool) -> TrackedEntry {
        let mut key = PropertyEntry::new(PEOPLE.fields[0], Value::Null, id_value);
        key.is_temporary = temporary;
        let name = PropertyEntry::new(PEOPLE.fields[1], Value::Null, json!("Alice"));
        let created = PropertyEntry::new(PEOPLE.fields[2], Value::Null, json!("2026-10-19T00:00:00Z"));
        TrackedEntry::new(EntryId::new(1), &PEOPLE, EntityState::Added, vec![key, name, created])
    }

    fn deferred_draft() -> AuditDraft {
        let mut draft = AuditDraft::new(EntryId::new(1), "People");
        draft.defer(PEOPLE.fields[0]);
        draft.defer(PEOPLE.fields[2]);
        draft.set_new("Name", json!("Alice"));
        draft
    }

    #[test]
    fn test_empty_is_noop() {
        let tracker = Entries(vec![]);
        let writer = resolve(Vec::new(), &tracker).unwrap();
        assert!(writer.is_empty());
    }

    #[test]
    fn test_resolves_key_and_payload() {
        let tracker = Entries(vec![committed_entry(json!(42), false)]);

        let writer = resolve(vec![deferred_draft()], &tracker).unwrap();

        let record = &writer.staged()[0];
        assert_eq!(record.key_values, r#"{"id":42}"#);
        let new = record.new_map().unwrap().unwrap();
        assert_eq!(new.get("Name"), Some(&json!("Alice")));
        assert_eq!(new.get("CreatedAt"), Some(&json!("2026-10-19T00:00:00Z")));
        assert!(record.old_values.is_none());
    }

    #[test]
    fn test_still_temporary_fails_loudly() {
        let tracker = Entries(vec![committed_entry(json!(0), true)]);

        let err = resolve(vec![deferred_draft()], &tracker).unwrap_err();
        assert!(matches!(err, AuditError::UnresolvedField { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_null_after_commit_fails_loudly() {
        let tracker = Entries(vec![committed_entry(Value::Null, false)]);
        assert!(resolve(vec![deferred_draft()], &tracker).is_err());
    }

    #[test]
    fn test_missing_entry_is_tracker_error() {
        let tracker = Entries(vec![]);
        let err = resolve(vec![deferred_draft()], &tracker).unwrap_err();
        assert!(matches!(err, AuditError::Tracker(_)));
    }
}
