//! Snapshot builder
//!
//! Runs immediately before a commit. Scans the tracker, builds one draft per
//! mutated entity, finalizes the drafts that are already complete and hands
//! back the ones still waiting on store-generated values.

use tracing::debug;

use super::draft::AuditDraft;
use super::writer::AuditWriter;
use crate::config::Settings;
use crate::error::{AuditError, AuditResult};
use crate::models::{AuditRecord, Entity};
use crate::tracker::{ChangeTracker, EntityState, TrackedEntry};

/// Result of a pre-commit scan
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Complete drafts, already finalized, to be written with the commit
    pub staged: AuditWriter,
    /// Drafts that need values only the commit can provide
    pub deferred: Vec<AuditDraft>,
}

impl Snapshot {
    /// Total number of audited entities
    pub fn len(&self) -> usize {
        self.staged.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.deferred.is_empty()
    }
}

/// Scan the tracker and capture every auditable mutation
///
/// Change detection runs first so modified flags are current. Entries of
/// the audit record type itself, excluded tables, and unchanged or detached
/// entries produce nothing.
pub fn capture<T>(tracker: &mut T, settings: &Settings) -> AuditResult<Snapshot>
where
    T: ChangeTracker + ?Sized,
{
    tracker.detect_changes();

    let mut drafts = Vec::new();
    for entry in tracker.entries() {
        if entry.is_entity(AuditRecord::schema()) || settings.is_excluded(entry.table()) {
            continue;
        }
        if matches!(
            entry.state(),
            EntityState::Unchanged | EntityState::Detached
        ) {
            continue;
        }

        let draft = draft_for(entry)?;
        debug!(
            table = draft.table(),
            state = %entry.state(),
            pending = draft.pending_fields().len(),
            "captured audit draft"
        );
        drafts.push(draft);
    }

    let mut snapshot = Snapshot::default();
    for draft in drafts {
        if draft.has_pending() {
            snapshot.deferred.push(draft);
        } else {
            snapshot.staged.stage(draft)?;
        }
    }

    debug!(
        staged = snapshot.staged.len(),
        deferred = snapshot.deferred.len(),
        "partitioned audit drafts"
    );
    Ok(snapshot)
}

/// Build the draft for one added, modified or deleted entry
fn draft_for(entry: &TrackedEntry) -> AuditResult<AuditDraft> {
    let state = entry.state();
    let mut draft = AuditDraft::new(entry.id(), entry.table());

    for property in entry.properties() {
        if property.is_temporary {
            // Deleted rows were stored long ago; a placeholder here means the
            // tracker lost track of a generated value.
            if state == EntityState::Deleted {
                return Err(AuditError::PendingOnDelete {
                    table: entry.table().to_string(),
                    field: property.name().to_string(),
                });
            }
            draft.defer(property.descriptor);
            continue;
        }

        if property.is_key() {
            draft.set_key(property.name(), property.current.clone());
            continue;
        }

        match state {
            EntityState::Added => draft.set_new(property.name(), property.current.clone()),
            EntityState::Deleted => draft.set_old(property.name(), property.original.clone()),
            EntityState::Modified => {
                if property.is_modified {
                    draft.set_old(property.name(), property.original.clone());
                    draft.set_new(property.name(), property.current.clone());
                }
            }
            EntityState::Unchanged | EntityState::Detached => {}
        }
    }

    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntitySchema, FieldDescriptor, FieldMap};
    use crate::tracker::{EntryId, PropertyEntry};
    use serde_json::{json, Value};

    static PEOPLE: EntitySchema = EntitySchema::new(
        "Person",
        "People",
        &[
            FieldDescriptor::generated_key("id"),
            FieldDescriptor::column("Name"),
            FieldDescriptor::column("Age"),
        ],
    );

    /// Bare entry list standing in for a tracker whose state is already known
    struct Entries {
        entries: Vec<TrackedEntry>,
        refreshed: bool,
    }

    impl ChangeTracker for Entries {
        fn detect_changes(&mut self) {
            self.refreshed = true;
        }

        fn entries(&self) -> &[TrackedEntry] {
            &self.entries
        }
    }

    fn tracked(entries: Vec<TrackedEntry>) -> Entries {
        Entries {
            entries,
            refreshed: false,
        }
    }

    fn property(index: usize, original: Value, current: Value, modified: bool) -> PropertyEntry {
        let mut property = PropertyEntry::new(PEOPLE.fields[index], original, current);
        property.is_modified = modified;
        property
    }

    fn entry(id: u64, state: EntityState, properties: Vec<PropertyEntry>) -> TrackedEntry {
        TrackedEntry::new(EntryId::new(id), &PEOPLE, state, properties)
    }

    fn added_with_pending_key(id: u64) -> TrackedEntry {
        let mut key = property(0, Value::Null, json!(0), false);
        key.is_temporary = true;
        entry(
            id,
            EntityState::Added,
            vec![
                key,
                property(1, Value::Null, json!("Alice"), false),
                property(2, Value::Null, json!(30), false),
            ],
        )
    }

    fn parse(text: &Option<String>) -> Option<FieldMap> {
        text.as_deref().map(|t| FieldMap::from_json(t).unwrap())
    }

    #[test]
    fn test_refreshes_tracker_first() {
        let mut tracker = tracked(vec![]);
        capture(&mut tracker, &Settings::default()).unwrap();
        assert!(tracker.refreshed);
    }

    #[test]
    fn test_added_with_known_key_is_staged() {
        let mut tracker = tracked(vec![entry(
            1,
            EntityState::Added,
            vec![
                property(0, Value::Null, json!(12), false),
                property(1, Value::Null, json!("Alice"), false),
                property(2, Value::Null, json!(30), false),
            ],
        )]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();

        assert!(snapshot.deferred.is_empty());
        let record = &snapshot.staged.staged()[0];
        assert!(record.old_values.is_none());
        let expected: FieldMap = vec![("Name", json!("Alice")), ("Age", json!(30))]
            .into_iter()
            .collect();
        assert_eq!(parse(&record.new_values), Some(expected));
        assert_eq!(record.key_map().unwrap().get("id"), Some(&json!(12)));
    }

    #[test]
    fn test_added_with_generated_key_is_deferred() {
        let mut tracker = tracked(vec![added_with_pending_key(1)]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();

        assert!(snapshot.staged.is_empty());
        let draft = &snapshot.deferred[0];
        assert_eq!(draft.pending_fields(), &[PEOPLE.fields[0]]);
        assert!(draft.key_values().is_empty());
        assert_eq!(draft.new_values().get("Name"), Some(&json!("Alice")));
    }

    #[test]
    fn test_modified_records_changed_fields_only() {
        let mut tracker = tracked(vec![entry(
            1,
            EntityState::Modified,
            vec![
                property(0, json!(5), json!(5), false),
                property(1, json!("Alice"), json!("Bob"), true),
                property(2, json!(30), json!(30), false),
            ],
        )]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();
        let record = &snapshot.staged.staged()[0];

        let old = parse(&record.old_values).unwrap();
        let new = parse(&record.new_values).unwrap();
        assert_eq!(old, FieldMap::from_iter(vec![("Name", json!("Alice"))]));
        assert_eq!(new, FieldMap::from_iter(vec![("Name", json!("Bob"))]));
        assert!(!old.contains("Age"));
        assert!(!new.contains("Age"));
    }

    #[test]
    fn test_deleted_records_original_values() {
        let mut tracker = tracked(vec![entry(
            1,
            EntityState::Deleted,
            vec![
                property(0, json!(5), json!(5), false),
                property(1, json!("Carol"), json!("Carol"), false),
                property(2, json!(41), json!(41), false),
            ],
        )]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();
        let record = &snapshot.staged.staged()[0];

        assert!(record.new_values.is_none());
        assert_eq!(record.key_values, r#"{"id":5}"#);
        let old = parse(&record.old_values).unwrap();
        assert_eq!(old.get("Name"), Some(&json!("Carol")));
        assert_eq!(old.len(), 2);
    }

    #[test]
    fn test_deleted_with_pending_field_rejected() {
        let mut key = property(0, json!(0), json!(0), false);
        key.is_temporary = true;
        let mut tracker = tracked(vec![entry(1, EntityState::Deleted, vec![key])]);

        let err = capture(&mut tracker, &Settings::default()).unwrap_err();
        assert!(matches!(err, AuditError::PendingOnDelete { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_unchanged_and_detached_skipped() {
        let mut tracker = tracked(vec![
            entry(1, EntityState::Unchanged, vec![property(0, json!(1), json!(1), false)]),
            entry(2, EntityState::Detached, vec![property(0, json!(2), json!(2), false)]),
        ]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_audit_records_never_audited() {
        let schema = AuditRecord::schema();
        let properties = schema
            .fields
            .iter()
            .map(|f| PropertyEntry::new(*f, Value::Null, json!("x")))
            .collect();
        let mut tracker = tracked(vec![TrackedEntry::new(
            EntryId::new(1),
            schema,
            EntityState::Added,
            properties,
        )]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_excluded_table_skipped() {
        let mut tracker = tracked(vec![added_with_pending_key(1)]);
        let settings = Settings {
            excluded_tables: vec!["People".into()],
            ..Settings::default()
        };

        assert!(capture(&mut tracker, &settings).unwrap().is_empty());
    }

    #[test]
    fn test_key_only_insert_still_audited() {
        let mut key = property(0, Value::Null, json!(0), false);
        key.is_temporary = true;
        let mut tracker = tracked(vec![entry(1, EntityState::Added, vec![key])]);

        let snapshot = capture(&mut tracker, &Settings::default()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.deferred[0].new_values().is_empty());
    }
}
