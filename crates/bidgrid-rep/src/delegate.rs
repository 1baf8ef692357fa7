//! The capacity-management boundary a [`Rep`](crate::Rep) drives.
//!
//! A delegate owns the actual bookkeeping (or the real container runtime).
//! The rep never calls it without holding its own lock, so implementations
//! need no synchronization of their own.

use bidgrid_core::{InstanceId, RepResult, Resources, SimulatedInstance, StartRequest};

/// Capacity manager behind a rep.
pub trait RepDelegate: Send {
    fn remaining_resources(&self) -> RepResult<Resources>;

    fn total_resources(&self) -> RepResult<Resources>;

    /// Committed instances of `workload_id` on this rep.
    fn num_instances_for_workload(&self, workload_id: &str) -> RepResult<u32>;

    /// Committed instance ids of `workload_id` at `index`.
    fn instance_ids_for_workload_and_index(
        &self,
        workload_id: &str,
        index: u32,
    ) -> RepResult<Vec<InstanceId>>;

    /// Tentatively hold the capacity `request` needs.
    fn reserve(&mut self, request: &StartRequest) -> RepResult<()>;

    /// Give back a tentative hold. Releasing twice must not credit twice.
    fn release_reservation(&mut self, request: &StartRequest) -> RepResult<()>;

    /// Commit `request` as a running instance.
    fn run(&mut self, request: &StartRequest) -> RepResult<()>;

    /// Stop a running instance and return its capacity.
    fn stop(&mut self, instance_id: &str) -> RepResult<()>;

    /// Simulation controls, if this delegate has them.
    fn simulation(&mut self) -> Option<&mut dyn SimulationDelegate> {
        None
    }
}

/// Optional capability: direct control over a delegate's instances.
pub trait SimulationDelegate {
    /// Replace every committed instance; drops outstanding reservations.
    fn set_simulated_instances(&mut self, instances: Vec<SimulatedInstance>) -> RepResult<()>;

    fn simulated_instances(&self) -> Vec<SimulatedInstance>;
}
