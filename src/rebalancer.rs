//! Core-limit rebalancer (spec §4.4).
//!
//! Placement only reserves memory (`platform.rs`); cores are handed out
//! here, after the fact, by splitting each node's free cores evenly across
//! the services currently running on it. Runs as its own supervised task,
//! woken by the `core_limit_recalc_trigger` the scheduler sets after every
//! placement round and every termination.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::backend::{Backend, ClusterStatsSource};
use crate::service::{BackendStatus, Service};
use crate::sync::EdgeTrigger;

/// Reads cluster stats and a live view of running services, and pushes
/// adjusted core limits to the backend. Holds no placement state of its
/// own: `running_services` is populated by the scheduler loop.
#[derive(Clone)]
pub struct CoreLimitRebalancer {
    backend: Arc<dyn Backend>,
    stats_source: Arc<dyn ClusterStatsSource>,
    trigger: EdgeTrigger,
    running_services: Arc<RwLock<Vec<Service>>>,
}

impl CoreLimitRebalancer {
    pub fn new(
        backend: Arc<dyn Backend>,
        stats_source: Arc<dyn ClusterStatsSource>,
        trigger: EdgeTrigger,
        running_services: Arc<RwLock<Vec<Service>>>,
    ) -> Self {
        Self {
            backend,
            stats_source,
            trigger,
            running_services,
        }
    }

    /// Runs until `loop_quit` is observed true. One cycle: wait for a
    /// signal, read a fresh snapshot, recompute and push a limit for every
    /// started service on every node that has any.
    pub async fn run(&self, loop_quit: Arc<std::sync::atomic::AtomicBool>) {
        use std::sync::atomic::Ordering;

        loop {
            if loop_quit.load(Ordering::Acquire) {
                return;
            }

            self.trigger.wait().await;

            if loop_quit.load(Ordering::Acquire) {
                return;
            }

            let stats = match self.stats_source.current_stats().await {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "core-limit rebalancer: snapshot unavailable, skipping cycle");
                    continue;
                }
            };

            let running = self.running_services.read().await.clone();

            for node in &stats.nodes {
                let node_services: Vec<&Service> = running
                    .iter()
                    .filter(|s| {
                        s.backend_host.as_deref() == Some(node.name.as_str())
                            && s.backend_status == BackendStatus::Start
                    })
                    .collect();

                if node_services.is_empty() {
                    continue;
                }

                let extra = if node.cores_reserved < node.cores_total {
                    (node.cores_total - node.cores_reserved) / node_services.len() as f64
                } else {
                    0.0
                };

                for service in node_services {
                    let cores = service.resource_reservation.cores.min as f64 + extra;
                    self.backend.update_service_resource_limits(service, cores).await;
                }
            }
        }
    }
}
