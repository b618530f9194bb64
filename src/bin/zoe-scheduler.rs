//! Minimal binary entry point: wires the scheduler to an in-memory backend
//! and installs structured logging. A real deployment would supply its own
//! `Backend`/`ClusterStatsSource` (driving Kubernetes, Swarm, ...) and its
//! own `StateStore`-backed reload; both are out of scope for this crate.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use zoe_scheduler::stats::NodeStats;
use zoe_scheduler::testutil::InMemoryBackend;
use zoe_scheduler::{start, Policy, SchedulerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let nodes = vec![NodeStats {
        name: "node-1".into(),
        cores_total: 8.0,
        cores_reserved: 0.0,
        memory_total: 16 * 1024 * 1024 * 1024,
        memory_reserved: 0,
        services: vec![],
    }];
    let backend = Arc::new(InMemoryBackend::new(nodes));

    let system = start(
        SchedulerConfig::default(),
        Policy::Fifo,
        backend.clone(),
        backend,
        vec![],
        vec![],
    )
    .await;

    tracing::info!("zoe scheduler running, press ctrl-c to stop");
    let _ = tokio::signal::ctrl_c().await;
    system.shutdown().await;
}
