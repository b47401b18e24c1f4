//! Shared entities and backends for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use audit_trail::models::{AuditRecord, Entity, EntitySchema, FieldDescriptor, SchemaRegistry};
use audit_trail::storage::{Backend, CommitBatch, CommitReceipt, GeneratedValue, MutationKind};
use audit_trail::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row with a store-generated integer key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Age")]
    pub age: u32,
}

impl Entity for Person {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "Person",
            "People",
            &[
                FieldDescriptor::generated_key("id"),
                FieldDescriptor::column("Name"),
                FieldDescriptor::column("Age"),
            ],
        );
        &SCHEMA
    }
}

pub fn person(id: i64, name: &str, age: u32) -> Person {
    Person {
        id,
        name: name.to_string(),
        age,
    }
}

/// Row with a caller-supplied key and a store-generated creation stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "CreatedAt")]
    pub created_at: Option<String>,
}

impl Entity for Tag {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "Tag",
            "Tags",
            &[
                FieldDescriptor::key("Code"),
                FieldDescriptor::column("Label"),
                FieldDescriptor::generated("CreatedAt"),
            ],
        );
        &SCHEMA
    }
}

/// Row in a table that settings exclude from auditing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: String,
}

impl Entity for Session {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "Session",
            "Sessions",
            &[FieldDescriptor::key("token"), FieldDescriptor::column("user")],
        );
        &SCHEMA
    }
}

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register::<Person>()
        .and_then(|r| r.register::<Tag>())
        .and_then(|r| r.register::<Session>())
        .unwrap();
    registry
}

pub const GENERATED_STAMP: &str = "2026-10-19T08:00:00+00:00";

/// In-memory backend that records everything it is asked to do
///
/// Generated keys come from a counter starting at `first_key`; generated
/// non-key fields get `GENERATED_STAMP`.
#[derive(Debug)]
pub struct RecordingBackend {
    pub first_key: i64,
    pub commits: Mutex<Vec<CommitBatch>>,
    pub flushed: Mutex<Vec<AuditRecord>>,
    next_key: Mutex<i64>,
    next_audit_id: Mutex<i64>,
    /// When false, the backend "forgets" to report generated values
    pub reports_generated: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first_key: i64) -> Self {
        Self {
            first_key,
            commits: Mutex::new(Vec::new()),
            flushed: Mutex::new(Vec::new()),
            next_key: Mutex::new(first_key),
            next_audit_id: Mutex::new(1),
            reports_generated: true,
        }
    }

    pub fn forgetful() -> Self {
        Self {
            reports_generated: false,
            ..Self::new()
        }
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().unwrap().len()
    }

    /// Every audit record, in-commit ones first, with their assigned ids
    pub fn audit_records(&self) -> Vec<AuditRecord> {
        let mut records: Vec<AuditRecord> = self
            .commits
            .lock()
            .unwrap()
            .iter()
            .flat_map(|b| b.audit.clone())
            .collect();
        records.extend(self.flushed.lock().unwrap().iter().cloned());
        records
    }

    fn assign_audit_ids(&self, count: usize) -> Vec<i64> {
        let mut next = self.next_audit_id.lock().unwrap();
        (0..count)
            .map(|_| {
                let id = *next;
                *next += 1;
                id
            })
            .collect()
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn commit(&self, batch: CommitBatch) -> AuditResult<CommitReceipt> {
        let mut receipt = CommitReceipt {
            rows_affected: batch.mutations.len(),
            ..CommitReceipt::default()
        };

        if self.reports_generated {
            let mut next_key = self.next_key.lock().unwrap();
            for mutation in &batch.mutations {
                if mutation.kind != MutationKind::Insert {
                    continue;
                }
                for field in &mutation.generated {
                    let value = if field.is_key {
                        let key = *next_key;
                        *next_key += 1;
                        Value::from(key)
                    } else {
                        Value::from(GENERATED_STAMP)
                    };
                    receipt.generated.push(GeneratedValue {
                        entry: mutation.entry,
                        field: field.name.to_string(),
                        value,
                    });
                }
            }
        }

        receipt.audit_ids = self.assign_audit_ids(batch.audit.len());
        self.commits.lock().unwrap().push(batch);
        Ok(receipt)
    }

    async fn append_audit(&self, records: Vec<AuditRecord>) -> AuditResult<Vec<i64>> {
        let ids = self.assign_audit_ids(records.len());
        self.flushed.lock().unwrap().extend(records);
        Ok(ids)
    }
}

/// Backend whose commit always fails
#[derive(Debug, Default)]
pub struct FailingBackend {
    pub commit_attempts: AtomicUsize,
    pub appends: AtomicUsize,
}

#[async_trait]
impl Backend for FailingBackend {
    async fn commit(&self, _batch: CommitBatch) -> AuditResult<CommitReceipt> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::Commit("constraint violation".into()))
    }

    async fn append_audit(&self, _records: Vec<AuditRecord>) -> AuditResult<Vec<i64>> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Backend whose commit never completes
#[derive(Debug, Default)]
pub struct StalledBackend {
    pub appends: AtomicUsize,
}

#[async_trait]
impl Backend for StalledBackend {
    async fn commit(&self, _batch: CommitBatch) -> AuditResult<CommitReceipt> {
        std::future::pending::<()>().await;
        Ok(CommitReceipt::default())
    }

    async fn append_audit(&self, _records: Vec<AuditRecord>) -> AuditResult<Vec<i64>> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}
