//! Tunable constants for the scheduler (spec §6).
//!
//! These are plain values, not parsed from a config file or CLI flags —
//! reading configuration from the outside world is out of scope for this
//! crate (spec §1).

use std::time::Duration;

/// Tunables controlling scheduler loop timing, DYNSIZE aging, and the
/// termination fan-out.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long the scheduler loop can idle before it self-triggers, in
    /// case platform resources changed outside its control.
    pub self_trigger_timeout: Duration,

    /// Number of idle wake-ups (each gated by `trigger_wait_timeout`)
    /// before the self-trigger fires. `self_trigger_timeout` divided by
    /// `trigger_wait_timeout` in the original implementation; kept as an
    /// explicit counter so the two can be tuned independently.
    pub self_trigger_idle_ticks: u32,

    /// How long one wait on the trigger signal blocks before the loop
    /// checks for idle housekeeping (reaping finished terminations).
    pub trigger_wait_timeout: Duration,

    /// DYNSIZE aging rate: bytes of `size` decayed per second of queued
    /// wait, per spec §4.1.
    pub dynsize_decay_rate_bytes_per_sec: f64,

    /// Capacity of the channel the async termination reaper drains.
    pub termination_channel_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            self_trigger_timeout: Duration::from_secs(60),
            self_trigger_idle_ticks: 60,
            trigger_wait_timeout: Duration::from_secs(1),
            dynsize_decay_rate_bytes_per_sec: 256.0 * 1024.0 * 1024.0,
            termination_channel_capacity: 256,
        }
    }
}
