//! `ExecutionQueue` and the FIFO/SIZE/DYNSIZE ordering policies (spec §4.1).

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ZoeError;
use crate::execution::{Execution, ExecutionProgress, ExecutionStatus};
use crate::sync::TerminationLockGuard;

/// Queue ordering policy. Unlike the original string-typed policy, an
/// unsupported value is a construction-time error, not a runtime string
/// comparison (REDESIGN FLAGS).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Fifo,
    Size,
    Dynsize,
}

impl Policy {
    pub fn parse(name: &str) -> Result<Self, ZoeError> {
        match name {
            "FIFO" => Ok(Policy::Fifo),
            "SIZE" => Ok(Policy::Size),
            "DYNSIZE" => Ok(Policy::Dynsize),
            other => Err(ZoeError::UnsupportedSchedulerPolicy(other.to_string())),
        }
    }
}

/// Statistics snapshot matching the scheduler-statistics endpoint
/// contract in spec §6.
#[derive(Debug, Clone)]
pub struct QueueStats {
    pub queue_length: usize,
    pub running_length: usize,
    pub queue: Vec<Uuid>,
    pub running_queue: Vec<Uuid>,
}

/// Owns the pending and running execution lists plus the scheduler-only
/// metadata (`ExecutionProgress`) tracked per queued execution.
pub struct ExecutionQueue {
    policy: Policy,
    pending: Vec<Execution>,
    running: Vec<Execution>,
    progress: HashMap<Uuid, ExecutionProgress>,
}

impl ExecutionQueue {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            pending: Vec::new(),
            running: Vec::new(),
            progress: HashMap::new(),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    pub fn is_pending_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Seeds the running queue directly, used at startup when reloading
    /// executions the state store already reports as running.
    pub fn seed_running(&mut self, execution: Execution) {
        self.running.push(execution);
    }

    /// Seeds the pending queue directly (startup reload of executions
    /// that were mid-placement when the process last stopped).
    pub fn seed_pending(&mut self, execution: Execution) {
        self.progress.insert(execution.id, ExecutionProgress::new());
        self.pending.push(execution);
    }

    /// `incoming(e)`: appends to the pending queue (spec §4.1).
    pub fn incoming(&mut self, execution: Execution) {
        self.progress.insert(execution.id, ExecutionProgress::new());
        self.pending.push(execution);
    }

    /// Removes `id` from whichever queue holds it. Returns `None` if it
    /// is in neither (the caller logs this as an error, per spec §4.1
    /// `terminate`).
    pub fn remove(&mut self, id: Uuid) -> Option<Execution> {
        if let Some(idx) = self.pending.iter().position(|e| e.id == id) {
            self.progress.remove(&id);
            return Some(self.pending.remove(idx));
        }
        if let Some(idx) = self.running.iter().position(|e| e.id == id) {
            self.progress.remove(&id);
            return Some(self.running.remove(idx));
        }
        None
    }

    /// `_refresh_execution_sizes` + policy sort (spec §4.1). A no-op for
    /// FIFO/SIZE aside from sorting; DYNSIZE additionally ages `size`.
    pub fn prepare_round(&mut self, now_secs: f64, dynsize_decay_rate_bytes_per_sec: f64) {
        if self.policy == Policy::Dynsize {
            for execution in &mut self.pending {
                let last_scheduled = self
                    .progress
                    .get(&execution.id)
                    .map(|p| p.last_time_scheduled)
                    .unwrap_or(0.0);
                if last_scheduled == 0.0 {
                    continue;
                }
                if execution.size <= 0.0 {
                    let reset = (execution.total_reservations.cores.min as f64)
                        * (execution.total_reservations.memory.min as f64);
                    execution.set_size(reset);
                    continue;
                }
                let decayed = execution.size
                    - (now_secs - last_scheduled) * dynsize_decay_rate_bytes_per_sec;
                execution.set_size(decayed);
            }
        }
        match self.policy {
            Policy::Fifo => {}
            Policy::Size | Policy::Dynsize => {
                self.pending
                    .sort_by(|a, b| a.size.partial_cmp(&b.size).unwrap());
            }
        }
    }

    /// `_pop_all`: non-blocking termination-lock acquisition over the
    /// pending queue, in current (already policy-sorted) order.
    /// Executions whose lock is held, or that are already `Terminated`,
    /// are left in the pending queue for this round.
    pub fn pop_all(&mut self) -> Vec<(Execution, TerminationLockGuard)> {
        let taken = std::mem::take(&mut self.pending);
        let mut candidates = Vec::with_capacity(taken.len());
        let mut remaining = Vec::with_capacity(taken.len());
        for execution in taken {
            match execution.termination_lock.try_lock() {
                Some(guard) if execution.status != ExecutionStatus::Terminated => {
                    candidates.push((execution, guard));
                }
                _ => remaining.push(execution),
            }
        }
        self.pending = remaining;
        candidates
    }

    /// `_requeue(e)`: releases the termination lock and records the
    /// scheduling attempt time. The execution was just popped by
    /// `pop_all`, so putting it back always leaves it in the pending
    /// queue — ownership makes the original's "is it still there?"
    /// sanity check unnecessary here.
    pub fn requeue(&mut self, execution: Execution, guard: TerminationLockGuard, now_secs: f64) {
        drop(guard);
        if let Some(progress) = self.progress.get_mut(&execution.id) {
            progress.last_time_scheduled = now_secs;
        }
        self.pending.push(execution);
    }

    /// Moves an execution from pending to running once every service is
    /// active.
    pub fn promote_to_running(&mut self, execution: Execution) {
        self.progress.remove(&execution.id);
        self.running.push(execution);
    }

    /// Moves an execution from running back to pending (an elastic
    /// service died and the dead-service detector wants it rescheduled).
    pub fn demote_to_pending(&mut self, id: Uuid) -> bool {
        if let Some(idx) = self.running.iter().position(|e| e.id == id) {
            let execution = self.running.remove(idx);
            self.progress.insert(execution.id, ExecutionProgress::new());
            self.pending.push(execution);
            true
        } else {
            false
        }
    }

    pub fn running(&self) -> &[Execution] {
        &self.running
    }

    pub fn running_mut(&mut self) -> &mut Vec<Execution> {
        &mut self.running
    }

    pub fn pending(&self) -> &[Execution] {
        &self.pending
    }

    pub fn stats(&self) -> QueueStats {
        let mut queue = self.pending.clone_ids();
        if self.policy == Policy::Size {
            let mut sorted = self.pending.iter().collect::<Vec<_>>();
            sorted.sort_by(|a, b| a.size.partial_cmp(&b.size).unwrap());
            queue = sorted.iter().map(|e| e.id).collect();
        }
        QueueStats {
            queue_length: self.pending.len(),
            running_length: self.running.len(),
            queue,
            running_queue: self.running.clone_ids(),
        }
    }
}

trait CloneIds {
    fn clone_ids(&self) -> Vec<Uuid>;
}

impl CloneIds for Vec<Execution> {
    fn clone_ids(&self) -> Vec<Uuid> {
        self.iter().map(|e| e.id).collect()
    }
}
