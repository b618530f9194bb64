//! Error taxonomy for the scheduler (spec §7).

use thiserror::Error;

/// Errors surfaced by the scheduling core.
///
/// This is the single error type returned from the crate's public APIs;
/// internal glue code that talks to `anyhow`-shaped collaborators (the
/// stats source, a backend driver) converts at the boundary rather than
/// leaking `anyhow::Error` out of the crate.
#[derive(Debug, Error)]
pub enum ZoeError {
    /// The backend observed insufficient resources while committing a
    /// placement. Translated to a `requeue` outcome by the caller.
    #[error("not enough resources to start service {service}")]
    NotEnoughResources {
        /// The service whose reservation could not be satisfied.
        service: uuid::Uuid,
    },

    /// Unrecoverable misconfiguration or permanent backend failure.
    /// The execution is dropped from the queues; the backend is
    /// responsible for having set its status to `Error` already.
    #[error("fatal error starting execution: {reason}")]
    StartExecutionFatal {
        /// Human-readable explanation, propagated from the backend.
        reason: String,
    },

    /// The stats source could not produce a snapshot this round.
    #[error("cluster snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// `ElasticScheduler::new` was given a policy it does not implement.
    #[error("unsupported scheduler policy: {0}")]
    UnsupportedSchedulerPolicy(String),

    /// Catch-all for a backend-reported failure that isn't one of the
    /// cases above.
    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, ZoeError>;
