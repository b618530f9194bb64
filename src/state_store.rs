//! State store interface (spec §2, §6).
//!
//! Persistence is explicitly out of scope for this crate (spec §1): no
//! concrete implementation ships here. This trait exists so
//! `ElasticScheduler::start` can reload the executions a prior process
//! left `running`, exactly as the original scheduler's constructor does
//! before it starts its loop.

use async_trait::async_trait;

use crate::execution::Execution;

/// Filter used by `StateStore::select_executions`. All fields are
/// optional; a `None` field is not filtered on.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub status: Option<crate::execution::ExecutionStatus>,
    pub user_id: Option<String>,
    pub id: Option<uuid::Uuid>,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns executions matching `filter`. Used at startup to reload
    /// `status = running` executions into the in-memory queue.
    async fn select_executions(&self, filter: ExecutionFilter) -> Vec<Execution>;

    async fn insert_execution(&self, execution: &Execution);
    async fn set_execution_status(&self, id: uuid::Uuid, status: crate::execution::ExecutionStatus);
    async fn delete_execution(&self, id: uuid::Uuid);
}
