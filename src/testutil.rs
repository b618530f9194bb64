//! In-memory `Backend` and `ClusterStatsSource` test doubles standing in
//! for the out-of-scope real backend driver (spec §1, SPEC_FULL.md "Test
//! tooling"). Used by integration-style tests in `scheduler.rs` and by
//! any downstream crate exercising `scheduler::start` without a real
//! cluster. Mirrors the teacher crate's `CpuBackend` acting as the
//! always-available default `ComputeBackend`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::{Backend, ClusterStatsSource, Placements, StartResult};
use crate::error::ZoeError;
use crate::execution::Execution;
use crate::service::Service;
use crate::stats::{ClusterStats, NodeStats};

/// A fixed-capacity cluster whose `start_essential`/`start_elastic` calls
/// immediately mark services active on whatever node the scheduler told
/// it to use, and whose `platform_state` reports memory usage derived
/// from those assignments.
pub struct InMemoryBackend {
    nodes: Mutex<Vec<NodeStats>>,
    fail_next_essential_start: AtomicBool,
    terminated_executions: Mutex<Vec<uuid::Uuid>>,
    terminated_services: Mutex<Vec<uuid::Uuid>>,
}

impl InMemoryBackend {
    pub fn new(nodes: Vec<NodeStats>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
            fail_next_essential_start: AtomicBool::new(false),
            terminated_executions: Mutex::new(Vec::new()),
            terminated_services: Mutex::new(Vec::new()),
        }
    }

    /// Makes the next `start_essential` call report `StartResult::Requeue`,
    /// simulating a transient backend failure.
    pub fn fail_next_essential_start(&self) {
        self.fail_next_essential_start.store(true, Ordering::SeqCst);
    }

    pub fn terminated_executions(&self) -> Vec<uuid::Uuid> {
        self.terminated_executions.lock().unwrap().clone()
    }

    pub fn terminated_services(&self) -> Vec<uuid::Uuid> {
        self.terminated_services.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn platform_state(&self) -> Result<ClusterStats, ZoeError> {
        Ok(ClusterStats::new(self.nodes.lock().unwrap().clone()))
    }

    async fn start_essential(&self, execution: &Execution, placements: &Placements) -> StartResult {
        if self.fail_next_essential_start.swap(false, Ordering::SeqCst) {
            return StartResult::Requeue;
        }
        for service in execution.services.iter().filter(|s| s.essential) {
            if !placements.contains_key(&service.id) {
                return StartResult::Requeue;
            }
        }
        StartResult::Ok
    }

    async fn start_elastic(&self, _execution: &Execution, _placements: &Placements) {}

    async fn terminate_service(&self, service: &Service) {
        self.terminated_services.lock().unwrap().push(service.id);
    }

    async fn terminate_execution(&self, execution: &Execution) -> Result<(), ZoeError> {
        self.terminated_executions.lock().unwrap().push(execution.id);
        Ok(())
    }

    async fn update_service_resource_limits(&self, _service: &Service, _cores: f64) {}
}

#[async_trait]
impl ClusterStatsSource for InMemoryBackend {
    async fn current_stats(&self) -> Result<ClusterStats, ZoeError> {
        Ok(ClusterStats::new(self.nodes.lock().unwrap().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::Execution;
    use crate::resource::{Range, ResourceReservation};
    use crate::service::ServiceDescription;

    fn desc() -> ServiceDescription {
        ServiceDescription {
            docker_image: "zoe/worker".into(),
            command: "run".into(),
            ports: vec![],
            volumes: vec![],
            replicas: 1,
        }
    }

    #[tokio::test]
    async fn fail_next_essential_start_is_consumed_once() {
        let backend = InMemoryBackend::new(vec![]);
        backend.fail_next_essential_start();

        let id = uuid::Uuid::new_v4();
        let service = Service::new(id, "s", true, desc(), ResourceReservation::zero());
        let exec = Execution::new("e1", "user", vec![service]);
        let placements = Placements::new();

        assert_eq!(backend.start_essential(&exec, &placements).await, StartResult::Requeue);
        // Second call is not forced to fail, but the placements map is
        // empty so it still reports Requeue via the normal path.
        assert_eq!(backend.start_essential(&exec, &placements).await, StartResult::Requeue);
    }

    #[tokio::test]
    async fn terminate_execution_records_the_id() {
        let backend = InMemoryBackend::new(vec![]);
        let exec = Execution::new("e1", "user", vec![]);
        let id = exec.id;
        backend.terminate_execution(&exec).await.unwrap();
        assert_eq!(backend.terminated_executions(), vec![id]);
    }
}
