//! The backend driver interface the scheduler calls (spec §4.6, §6).
//!
//! Concrete drivers (Kubernetes, Docker Swarm, ...) are out of scope for
//! this crate (spec §1); this module defines only the contract, the same
//! way the teacher crate's `backends.rs` defines `ComputeBackend` as the
//! seam concrete GPU/CPU backends implement against.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ZoeError;
use crate::execution::Execution;
use crate::service::Service;
use crate::stats::ClusterStats;

/// Outcome of `Backend::start_essential`, replacing the original's
/// string comparison (`"ok"` / `"requeue"` / `"fatal"`) with a sum type
/// checked at compile time (REDESIGN FLAGS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartResult {
    /// All essential services were created successfully.
    Ok,
    /// Transient failure (e.g. resources vanished between the
    /// simulation and the commit). The execution stays in the queue.
    Requeue,
    /// Unrecoverable misconfiguration. The backend must have already
    /// set the execution's status to `Error` before returning this.
    Fatal { reason: String },
}

/// A mapping from service id to the node it was placed on, as produced
/// by `SimulatedPlatform::get_service_allocation` and committed by the
/// scheduler.
pub type Placements = HashMap<Uuid, String>;

/// The container-backend driver the scheduler commits placement
/// decisions to. Implementors own all real I/O; the scheduler treats
/// this as an opaque executor (spec §2).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Self-consistent snapshot of cluster resource usage.
    async fn platform_state(&self) -> Result<ClusterStats, ZoeError>;

    /// Creates containers for every essential service of `execution`,
    /// using `placements` for host assignment.
    async fn start_essential(&self, execution: &Execution, placements: &Placements) -> StartResult;

    /// Best-effort creation of elastic services. Per-service failure is
    /// swallowed here and reflected later via `backend_status` updates
    /// observed on the next `platform_state` snapshot.
    async fn start_elastic(&self, execution: &Execution, placements: &Placements);

    /// Idempotent teardown of a single service.
    async fn terminate_service(&self, service: &Service);

    /// Idempotent teardown of every service in an execution.
    async fn terminate_execution(&self, execution: &Execution) -> Result<(), ZoeError>;

    /// Adjusts a running container's CPU share. Never touches memory
    /// limits (spec §4.4).
    async fn update_service_resource_limits(&self, service: &Service, cores: f64);
}

/// The cluster stats source (spec §2, §6 "Stats manager interface").
/// Kept separate from `Backend` because, architecturally, the scheduler
/// only ever reads from it — it never commands the stats source the way
/// it commands the backend.
#[async_trait]
pub trait ClusterStatsSource: Send + Sync {
    async fn current_stats(&self) -> Result<ClusterStats, ZoeError>;
}
