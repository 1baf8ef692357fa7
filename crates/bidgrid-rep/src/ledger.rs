//! In-memory resource ledger.
//!
//! Tracks total and remaining capacity, tentative reservations keyed by
//! instance guid, and committed instances. This is the delegate used by
//! simulations and tests; it also implements [`SimulationDelegate`].
//!
//! Invariant: `remaining + reserved + committed == total` on every
//! dimension after every call, so `remaining <= total` always holds.

use std::collections::{BTreeMap, HashMap};

use bidgrid_core::{InstanceId, RepError, RepResult, Resources, SimulatedInstance, StartRequest};

use crate::delegate::{RepDelegate, SimulationDelegate};

#[derive(Debug, Clone)]
pub struct ResourceLedger {
    total: Resources,
    remaining: Resources,
    /// Tentative holds: instance guid → held request.
    reservations: HashMap<InstanceId, StartRequest>,
    /// Committed instances, ordered by guid.
    instances: BTreeMap<InstanceId, SimulatedInstance>,
}

impl ResourceLedger {
    /// An empty ledger with the given capacity.
    pub fn new(total: Resources) -> Self {
        Self {
            total,
            remaining: total,
            reservations: HashMap::new(),
            instances: BTreeMap::new(),
        }
    }

    /// A ledger pre-loaded with running instances.
    pub fn with_instances(total: Resources, instances: Vec<SimulatedInstance>) -> RepResult<Self> {
        let mut ledger = Self::new(total);
        ledger.set_simulated_instances(instances)?;
        Ok(ledger)
    }

    /// Outstanding tentative reservations.
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_reserved(&self, instance_guid: &str) -> bool {
        self.reservations.contains_key(instance_guid)
    }

    fn debit(&mut self, amount: Resources) -> RepResult<()> {
        if !amount.fits_within(&self.remaining) {
            return Err(RepError::InsufficientResources);
        }
        self.remaining.memory_mb -= amount.memory_mb;
        self.remaining.disk_mb -= amount.disk_mb;
        self.remaining.containers -= amount.containers;
        Ok(())
    }

    fn credit(&mut self, amount: Resources) {
        self.remaining.memory_mb = (self.remaining.memory_mb + amount.memory_mb).min(self.total.memory_mb);
        self.remaining.disk_mb = (self.remaining.disk_mb + amount.disk_mb).min(self.total.disk_mb);
        self.remaining.containers = (self.remaining.containers + amount.containers).min(self.total.containers);
    }
}

impl RepDelegate for ResourceLedger {
    fn remaining_resources(&self) -> RepResult<Resources> {
        Ok(self.remaining)
    }

    fn total_resources(&self) -> RepResult<Resources> {
        Ok(self.total)
    }

    fn num_instances_for_workload(&self, workload_id: &str) -> RepResult<u32> {
        let count = self
            .instances
            .values()
            .filter(|inst| inst.workload_id == workload_id)
            .count();
        Ok(count as u32)
    }

    fn instance_ids_for_workload_and_index(
        &self,
        workload_id: &str,
        index: u32,
    ) -> RepResult<Vec<InstanceId>> {
        Ok(self
            .instances
            .values()
            .filter(|inst| inst.workload_id == workload_id && inst.index == index)
            .map(|inst| inst.instance_guid.clone())
            .collect())
    }

    fn reserve(&mut self, request: &StartRequest) -> RepResult<()> {
        if self.reservations.contains_key(&request.instance_guid) {
            return Err(RepError::ReservationConflict(format!(
                "instance {} already reserved",
                request.instance_guid
            )));
        }
        if self.instances.contains_key(&request.instance_guid) {
            return Err(RepError::ReservationConflict(format!(
                "instance {} already running",
                request.instance_guid
            )));
        }
        self.debit(request.resources()).map_err(|_| {
            RepError::ReservationConflict(format!(
                "capacity for {} taken by an earlier reservation",
                request.instance_guid
            ))
        })?;
        self.reservations
            .insert(request.instance_guid.clone(), request.clone());
        Ok(())
    }

    fn release_reservation(&mut self, request: &StartRequest) -> RepResult<()> {
        let held = self
            .reservations
            .remove(&request.instance_guid)
            .ok_or_else(|| RepError::NoReservation(request.instance_guid.clone()))?;
        self.credit(held.resources());
        Ok(())
    }

    fn run(&mut self, request: &StartRequest) -> RepResult<()> {
        if self.instances.contains_key(&request.instance_guid) {
            return Err(RepError::ReservationConflict(format!(
                "instance {} already running",
                request.instance_guid
            )));
        }
        // A run without a prior reservation allocates directly.
        if self.reservations.remove(&request.instance_guid).is_none() {
            self.debit(request.resources())?;
        }
        self.instances
            .insert(request.instance_guid.clone(), SimulatedInstance::from(request));
        Ok(())
    }

    fn stop(&mut self, instance_id: &str) -> RepResult<()> {
        let instance = self
            .instances
            .remove(instance_id)
            .ok_or_else(|| RepError::InstanceNotFound(instance_id.to_string()))?;
        self.credit(instance.resources());
        Ok(())
    }

    fn simulation(&mut self) -> Option<&mut dyn SimulationDelegate> {
        Some(self)
    }
}

impl SimulationDelegate for ResourceLedger {
    fn set_simulated_instances(&mut self, instances: Vec<SimulatedInstance>) -> RepResult<()> {
        let mut fresh = ResourceLedger::new(self.total);
        for instance in instances {
            fresh.debit(instance.resources()).map_err(|_| {
                RepError::Delegate(format!(
                    "simulated instance {} exceeds rep capacity",
                    instance.instance_guid
                ))
            })?;
            fresh.instances.insert(instance.instance_guid.clone(), instance);
        }
        *self = fresh;
        Ok(())
    }

    fn simulated_instances(&self) -> Vec<SimulatedInstance> {
        self.instances.values().cloned().collect()
    }
}
