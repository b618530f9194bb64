//! Elastic admission/placement scheduler for a Zoe-style container
//! cluster: an in-memory what-if allocator, a FIFO/SIZE/DYNSIZE pending
//! queue, a dead-service detector, and a core-limit rebalancer, driven by
//! a pluggable `Backend` and `ClusterStatsSource`.
//!
//! Concrete backend drivers, REST/WebSocket surfaces, authentication, and
//! persistence are out of scope for this crate; `backend::Backend` and
//! `state_store::StateStore` are the seams a host application implements.

pub mod backend;
pub mod config;
pub mod dead_service;
pub mod error;
pub mod execution;
pub mod platform;
pub mod queue;
pub mod rebalancer;
pub mod resource;
pub mod scheduler;
pub mod service;
pub mod state_store;
pub mod stats;
pub mod supervise;
pub mod sync;
pub mod testutil;

pub use backend::{Backend, ClusterStatsSource, Placements, StartResult};
pub use config::SchedulerConfig;
pub use error::{Result, ZoeError};
pub use execution::{Execution, ExecutionStatus};
pub use queue::{Policy, QueueStats};
pub use scheduler::{start, SchedulerHandle, SchedulerSystem};
pub use service::{BackendStatus, Service, ServiceDescription};
pub use stats::{ClusterStats, NodeStats};
