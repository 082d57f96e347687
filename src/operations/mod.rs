//! Registry of in-flight job operations
//!
//! The registry owns its map outright. Callers only see clones of
//! [`Operation`] values and mutate them through [`OperationRegistry::update`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::manifest::Job;

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// An operation with this ID is already registered
    #[error("operation already registered: {0}")]
    AlreadyExists(String),

    /// No operation with this ID
    #[error("operation not found: {0}")]
    NotFound(String),
}

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationStatus {
    /// Registered, not yet started
    Pending,
    /// Executor call in progress
    Running,
    /// Finished with an output
    Succeeded,
    /// Finished with an error
    Failed,
}

impl OperationStatus {
    /// Whether the operation has finished
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed)
    }
}

/// Tracked state of one job's remote work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Registry key
    pub id: String,
    /// Job this operation performs
    pub job_id: String,
    /// Job type tag
    pub job_type: String,
    /// Current state
    pub status: OperationStatus,
    /// Output path once succeeded
    pub output: Option<String>,
    /// Failure message once failed
    pub error: Option<String>,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Time of the last update
    pub updated_at: DateTime<Utc>,
}

impl Operation {
    /// New pending operation for a job, keyed by a fresh UUID
    pub fn for_job(job: &Job) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            job_id: job.id.clone(),
            job_type: job.kind.to_string(),
            status: OperationStatus::Pending,
            output: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark as running
    pub fn start(&mut self) {
        self.status = OperationStatus::Running;
    }

    /// Mark as succeeded
    pub fn succeed(&mut self, output: Option<String>) {
        self.status = OperationStatus::Succeeded;
        self.output = output;
        self.error = None;
    }

    /// Mark as failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = OperationStatus::Failed;
        self.error = Some(error.into());
    }
}

/// Operation counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStats {
    /// All registered operations
    pub total: usize,
    /// Operations not yet started
    pub pending: usize,
    /// Operations in progress
    pub running: usize,
    /// Operations that succeeded
    pub succeeded: usize,
    /// Operations that failed
    pub failed: usize,
}

/// Thread-safe map from operation ID to operation state
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: RwLock<HashMap<String, Operation>>,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation; IDs must be unique
    pub fn add(&self, operation: Operation) -> Result<(), OperationError> {
        let mut operations = self.operations.write();
        if operations.contains_key(&operation.id) {
            return Err(OperationError::AlreadyExists(operation.id));
        }
        operations.insert(operation.id.clone(), operation);
        Ok(())
    }

    /// Snapshot of one operation
    pub fn get(&self, id: &str) -> Option<Operation> {
        self.operations.read().get(id).cloned()
    }

    /// Mutate an operation in place and return the updated snapshot
    pub fn update<F>(&self, id: &str, f: F) -> Result<Operation, OperationError>
    where
        F: FnOnce(&mut Operation),
    {
        let mut operations = self.operations.write();
        let operation = operations
            .get_mut(id)
            .ok_or_else(|| OperationError::NotFound(id.to_string()))?;
        f(operation);
        operation.updated_at = Utc::now();
        Ok(operation.clone())
    }

    /// Remove an operation, returning its last state
    pub fn remove(&self, id: &str) -> Option<Operation> {
        self.operations.write().remove(id)
    }

    /// Snapshot of every operation, oldest first
    pub fn list(&self) -> Vec<Operation> {
        let mut operations: Vec<Operation> = self.operations.read().values().cloned().collect();
        operations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        operations
    }

    /// Snapshot of the operations matching a predicate, oldest first
    pub fn filter<P>(&self, predicate: P) -> Vec<Operation>
    where
        P: Fn(&Operation) -> bool,
    {
        let mut operations: Vec<Operation> = self
            .operations
            .read()
            .values()
            .filter(|op| predicate(op))
            .cloned()
            .collect();
        operations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        operations
    }

    /// Drop every finished operation, returning how many were removed.
    ///
    /// The processor never removes entries itself, so a registry shared by
    /// several batches should be pruned between them.
    pub fn prune_finished(&self) -> usize {
        let mut operations = self.operations.write();
        let before = operations.len();
        operations.retain(|_, operation| !operation.status.is_terminal());
        before - operations.len()
    }

    /// Counts per status
    pub fn stats(&self) -> OperationStats {
        let operations = self.operations.read();
        let mut stats = OperationStats {
            total: operations.len(),
            ..Default::default()
        };
        for operation in operations.values() {
            match operation.status {
                OperationStatus::Pending => stats.pending += 1,
                OperationStatus::Running => stats.running += 1,
                OperationStatus::Succeeded => stats.succeeded += 1,
                OperationStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Number of registered operations
    pub fn len(&self) -> usize {
        self.operations.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.operations.read().is_empty()
    }
}
