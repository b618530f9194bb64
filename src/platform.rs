//! `SimulatedPlatform`: the in-memory what-if allocator (spec §4.2).
//!
//! Pure in-memory model of a `ClusterStats` snapshot; it never calls the
//! backend. Placement is memory-primary: only `memory.min` reservations
//! are tracked here. Core limits are decided later, by the core-limit
//! rebalancer (`rebalancer.rs`), not at placement time — this is the
//! "memory-primary / core-elastic" split spec §1 names as the bin-packing
//! model.

use std::collections::HashMap;

use uuid::Uuid;

use crate::execution::Execution;
use crate::stats::{ClusterStats, NodeStats};

/// An in-memory, mutable deep copy of a cluster snapshot, used to try
/// out placement decisions before they are committed to the real
/// backend.
pub struct SimulatedPlatform {
    nodes: Vec<NodeStats>,
    placements: HashMap<Uuid, String>,
}

impl SimulatedPlatform {
    /// Builds a simulator from a snapshot. The snapshot is deep-copied;
    /// mutating the simulator never writes back into the caller's
    /// `ClusterStats`.
    pub fn new(snapshot: &ClusterStats) -> Self {
        Self {
            nodes: snapshot.nodes.clone(),
            placements: HashMap::new(),
        }
    }

    /// Picks the best-fit node for `required` bytes: the node with the
    /// smallest residual free memory after placement, ties broken by
    /// node name ascending.
    fn best_fit_node(nodes: &[NodeStats], required: u64) -> Option<usize> {
        nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.memory_free() >= required)
            .min_by(|(_, a), (_, b)| {
                let residual_a = a.memory_free() - required;
                let residual_b = b.memory_free() - required;
                residual_a.cmp(&residual_b).then_with(|| a.name.cmp(&b.name))
            })
            .map(|(idx, _)| idx)
    }

    /// Attempts to place every essential service of `execution`.
    /// All-or-nothing: on failure nothing is committed and
    /// `aggregated_free_memory()` is unchanged (testable property 3).
    pub fn allocate_essential(&mut self, execution: &Execution) -> bool {
        let mut trial_nodes = self.nodes.clone();
        let mut new_placements = Vec::new();

        for service in execution.services.iter().filter(|s| s.essential) {
            let required = service.resource_reservation.memory.min;
            match Self::best_fit_node(&trial_nodes, required) {
                Some(idx) => {
                    trial_nodes[idx].memory_reserved += required;
                    new_placements.push((service.id, trial_nodes[idx].name.clone()));
                }
                None => return false,
            }
        }

        self.nodes = trial_nodes;
        for (service_id, node_name) in new_placements {
            self.placements.insert(service_id, node_name);
        }
        true
    }

    /// Greedily places elastic services that still fit. Services that
    /// don't fit are skipped, no rollback. Idempotent on services
    /// already placed (testable property 4).
    pub fn allocate_elastic(&mut self, execution: &Execution) {
        for service in execution.services.iter().filter(|s| !s.essential) {
            if self.placements.contains_key(&service.id) {
                continue;
            }
            let required = service.resource_reservation.memory.min;
            if let Some(idx) = Self::best_fit_node(&self.nodes, required) {
                self.nodes[idx].memory_reserved += required;
                self.placements.insert(service.id, self.nodes[idx].name.clone());
            }
        }
    }

    /// Removes all elastic placements of `execution`, restoring reserved
    /// memory exactly.
    pub fn deallocate_elastic(&mut self, execution: &Execution) {
        for service in execution.services.iter().filter(|s| !s.essential) {
            if let Some(node_name) = self.placements.remove(&service.id) {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.name == node_name) {
                    node.memory_reserved = node
                        .memory_reserved
                        .saturating_sub(service.resource_reservation.memory.min);
                }
            }
        }
    }

    /// Removes all essential placements of `execution`, restoring reserved
    /// memory exactly. Used to undo a candidate's admission when it turns
    /// out to rearrange elastic services unprofitably (spec §4.3 4e/4f).
    pub fn deallocate_essential(&mut self, execution: &Execution) {
        for service in execution.services.iter().filter(|s| s.essential) {
            if let Some(node_name) = self.placements.remove(&service.id) {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.name == node_name) {
                    node.memory_reserved = node
                        .memory_reserved
                        .saturating_sub(service.resource_reservation.memory.min);
                }
            }
        }
    }

    pub fn aggregated_free_memory(&self) -> u64 {
        self.nodes.iter().map(|n| n.memory_free()).sum()
    }

    /// Committed placements (essential + elastic), service id -> node.
    pub fn get_service_allocation(&self) -> HashMap<Uuid, String> {
        self.placements.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Range, ResourceReservation};
    use crate::service::{Service, ServiceDescription};

    fn desc() -> ServiceDescription {
        ServiceDescription {
            docker_image: "zoe/worker".into(),
            command: "run".into(),
            ports: vec![],
            volumes: vec![],
            replicas: 1,
        }
    }

    fn node(name: &str, cores: f64, memory_gib: u64) -> NodeStats {
        NodeStats {
            name: name.into(),
            cores_total: cores,
            cores_reserved: 0.0,
            memory_total: memory_gib * 1024 * 1024 * 1024,
            memory_reserved: 0,
            services: vec![],
        }
    }

    fn service(execution_id: Uuid, essential: bool, memory_gib: u64) -> Service {
        Service::new(
            execution_id,
            "svc",
            essential,
            desc(),
            ResourceReservation::new(Range::new(1, 1), Range::new(memory_gib * 1024 * 1024 * 1024, memory_gib * 1024 * 1024 * 1024)),
        )
    }

    #[test]
    fn simple_placement_fits_single_node() {
        let snapshot = ClusterStats::new(vec![node("N1", 4.0, 8)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let exec = Execution::new("e1", "user", vec![service(id, true, 2)]);

        assert!(sim.allocate_essential(&exec));
        let placement = sim.get_service_allocation();
        assert_eq!(placement.get(&exec.services[0].id), Some(&"N1".to_string()));
    }

    #[test]
    fn essential_cannot_fit_leaves_no_trace() {
        let snapshot = ClusterStats::new(vec![node("N1", 4.0, 4)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let exec = Execution::new("e1", "user", vec![service(id, true, 8)]);

        let before = sim.aggregated_free_memory();
        assert!(!sim.allocate_essential(&exec));
        assert_eq!(sim.aggregated_free_memory(), before);
        assert!(sim.get_service_allocation().is_empty());
    }

    #[test]
    fn allocate_elastic_is_idempotent_without_deallocate() {
        let snapshot = ClusterStats::new(vec![node("N1", 4.0, 8)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let exec = Execution::new("e1", "user", vec![service(id, false, 2)]);

        sim.allocate_elastic(&exec);
        let free_after_first = sim.aggregated_free_memory();
        sim.allocate_elastic(&exec);
        assert_eq!(sim.aggregated_free_memory(), free_after_first);
    }

    #[test]
    fn deallocate_then_allocate_elastic_restores_memory_exactly() {
        let snapshot = ClusterStats::new(vec![node("N1", 4.0, 8)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let exec = Execution::new("e1", "user", vec![service(id, false, 2)]);

        let before = sim.aggregated_free_memory();
        sim.allocate_elastic(&exec);
        sim.deallocate_elastic(&exec);
        assert_eq!(sim.aggregated_free_memory(), before);
        assert!(sim.get_service_allocation().is_empty());
    }

    #[test]
    fn deallocate_essential_restores_memory_exactly() {
        let snapshot = ClusterStats::new(vec![node("N1", 4.0, 8)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let exec = Execution::new("e1", "user", vec![service(id, true, 2)]);

        let before = sim.aggregated_free_memory();
        assert!(sim.allocate_essential(&exec));
        sim.deallocate_essential(&exec);
        assert_eq!(sim.aggregated_free_memory(), before);
        assert!(sim.get_service_allocation().is_empty());
    }

    #[test]
    fn best_fit_prefers_tighter_residual_then_name() {
        let snapshot = ClusterStats::new(vec![node("N2", 4.0, 16), node("N1", 4.0, 4)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let exec = Execution::new("e1", "user", vec![service(id, true, 2)]);

        assert!(sim.allocate_essential(&exec));
        // N1 has less residual memory after a 2 GiB reservation, so it wins
        // even though N2 sorts after it alphabetically.
        assert_eq!(
            sim.get_service_allocation().get(&exec.services[0].id),
            Some(&"N1".to_string())
        );
    }

    #[test]
    fn memory_reserved_never_exceeds_total_under_random_elastic_churn() {
        let snapshot = ClusterStats::new(vec![node("N1", 4.0, 8), node("N2", 4.0, 8)]);
        let mut sim = SimulatedPlatform::new(&snapshot);
        let id = Uuid::new_v4();
        let execs: Vec<Execution> = (0..10)
            .map(|_| Execution::new("e", "user", vec![service(id, false, 1)]))
            .collect();

        for e in &execs {
            sim.allocate_elastic(e);
        }
        for n in &sim.nodes {
            assert!(n.memory_reserved <= n.memory_total);
        }
        for e in &execs {
            sim.deallocate_elastic(e);
        }
        assert_eq!(sim.aggregated_free_memory(), 16 * 1024 * 1024 * 1024);
    }
}
