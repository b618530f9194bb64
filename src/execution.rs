//! The `Execution` entity and its progress metadata (spec §3).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::resource::ResourceReservation;
use crate::service::{BackendStatus, Service};
use crate::sync::TerminationLock;

/// Lifecycle status of an execution (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Submitted,
    Scheduled,
    Starting,
    ImageDownload,
    Running,
    CleaningUp,
    Terminated,
    Error,
}

impl ExecutionStatus {
    /// Terminal statuses never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Terminated | ExecutionStatus::Error)
    }
}

/// One user submission: a set of services placed and monitored together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub name: String,
    pub user_id: String,
    pub status: ExecutionStatus,
    pub services: Vec<Service>,
    pub total_reservations: ResourceReservation,
    pub size: f64,

    #[serde(skip, default = "default_termination_lock")]
    pub termination_lock: Arc<TerminationLock>,
}

fn default_termination_lock() -> Arc<TerminationLock> {
    Arc::new(TerminationLock::new())
}

impl Execution {
    pub fn new(name: impl Into<String>, user_id: impl Into<String>, services: Vec<Service>) -> Self {
        let mut total_reservations = ResourceReservation::zero();
        for service in &services {
            total_reservations.accumulate(&service.resource_reservation);
        }
        let size = (total_reservations.cores.min as f64) * (total_reservations.memory.min as f64);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            user_id: user_id.into(),
            status: ExecutionStatus::Submitted,
            services,
            total_reservations,
            size,
            termination_lock: default_termination_lock(),
        }
    }

    /// Sets the DYNSIZE ordering key, clamped to a floor of `0.0`
    /// (spec §3 invariant 5).
    pub fn set_size(&mut self, size: f64) {
        self.size = size.max(0.0);
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    pub fn essential_services_running(&self) -> bool {
        self.services
            .iter()
            .filter(|s| s.essential)
            .all(|s| s.is_active())
    }

    pub fn all_services_active(&self) -> bool {
        self.services.iter().all(|s| s.is_active())
    }

    pub fn has_dead_essential_service(&self) -> bool {
        self.services.iter().any(|s| s.essential && s.is_dead())
    }

    pub fn dead_elastic_services_mut(&mut self) -> impl Iterator<Item = &mut Service> {
        self.services
            .iter_mut()
            .filter(|s| !s.essential && s.backend_status == BackendStatus::Die)
    }

    pub fn set_running(&mut self) {
        self.status = ExecutionStatus::Running;
    }

    pub fn set_cleaning_up(&mut self) {
        self.status = ExecutionStatus::CleaningUp;
    }

    pub fn set_error(&mut self) {
        self.status = ExecutionStatus::Error;
    }

    pub fn set_terminated(&mut self) {
        self.status = ExecutionStatus::Terminated;
    }
}

/// Additional per-queued-execution metadata the scheduler keeps only in
/// memory, never persisted (spec §3).
#[derive(Debug, Clone, Default)]
pub struct ExecutionProgress {
    /// Monotonic seconds since epoch this execution was last attempted,
    /// `0` if never.
    pub last_time_scheduled: f64,
    pub progress_sequence: Vec<f64>,
}

impl ExecutionProgress {
    pub fn new() -> Self {
        Self::default()
    }
}
