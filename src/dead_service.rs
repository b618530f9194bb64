//! Pure detection logic for the dead-service sweep (spec §4.5).
//!
//! Kept separate from the scheduler loop so the "which executions/services
//! are dead" question can be unit-tested without a `Backend`. Acting on
//! what these functions find (terminating, restarting, requeuing) stays in
//! `scheduler.rs`, since that part needs mutable queue and backend access.

use uuid::Uuid;

use crate::execution::Execution;

/// Executions in `running` with at least one dead essential service.
/// These must be torn down entirely: one dead essential service kills the
/// whole execution (spec §4.5 sweep 1).
pub fn dead_essential_execution_ids(running: &[Execution]) -> Vec<Uuid> {
    running
        .iter()
        .filter(|e| e.has_dead_essential_service())
        .map(|e| e.id)
        .collect()
}

/// `(execution_id, service_id)` pairs for dead elastic services in
/// `running`. An execution whose essential services are intact keeps
/// running; only the dead elastic service is torn down and the execution
/// is rescheduled for re-placement (spec §4.5 sweep 2).
pub fn dead_elastic_service_ids(running: &[Execution]) -> Vec<(Uuid, Uuid)> {
    running
        .iter()
        .flat_map(|e| {
            e.services
                .iter()
                .filter(|s| !s.essential && s.is_dead())
                .map(move |s| (e.id, s.id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Range, ResourceReservation};
    use crate::service::{BackendStatus, Service, ServiceDescription};

    fn desc() -> ServiceDescription {
        ServiceDescription {
            docker_image: "zoe/worker".into(),
            command: "run".into(),
            ports: vec![],
            volumes: vec![],
            replicas: 1,
        }
    }

    fn service(execution_id: Uuid, essential: bool, status: BackendStatus) -> Service {
        let mut s = Service::new(
            execution_id,
            "svc",
            essential,
            desc(),
            ResourceReservation::new(Range::new(1, 1), Range::new(1, 1)),
        );
        s.backend_status = status;
        s
    }

    #[test]
    fn sweep_one_finds_only_dead_essential() {
        let id = Uuid::new_v4();
        let healthy_elastic = service(id, false, BackendStatus::Start);
        let dead_essential = service(id, true, BackendStatus::Die);
        let exec = Execution::new("e1", "user", vec![healthy_elastic, dead_essential]);
        let dead_id = exec.id;

        assert_eq!(dead_essential_execution_ids(&[exec]), vec![dead_id]);
    }

    #[test]
    fn sweep_two_finds_dead_elastic_ignoring_healthy_essential() {
        let id = Uuid::new_v4();
        let healthy_essential = service(id, true, BackendStatus::Start);
        let dead_elastic = service(id, false, BackendStatus::Die);
        let dead_service_id = dead_elastic.id;
        let exec = Execution::new("e1", "user", vec![healthy_essential, dead_elastic]);
        let exec_id = exec.id;

        assert_eq!(
            dead_elastic_service_ids(&[exec]),
            vec![(exec_id, dead_service_id)]
        );
    }

    #[test]
    fn no_dead_services_returns_empty() {
        let id = Uuid::new_v4();
        let s = service(id, true, BackendStatus::Start);
        let exec = Execution::new("e1", "user", vec![s]);
        assert!(dead_essential_execution_ids(&[exec.clone()]).is_empty());
        assert!(dead_elastic_service_ids(&[exec]).is_empty());
    }
}
