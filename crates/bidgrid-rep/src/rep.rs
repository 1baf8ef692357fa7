//! Rep — a capacity holder that bids in auctions.
//!
//! Every public operation takes the rep's single lock for its whole
//! duration, so no two calls on the same rep ever interleave. In particular
//! `score_then_tentatively_reserve` checks constraints and reserves inside
//! one critical section; two auctions racing for the last slot on a rep
//! cannot both win it.
//!
//! Private helpers below assume the lock is already held.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use bidgrid_core::{
    InstanceId, RepError, RepId, RepResult, RepSnapshot, Resources, SimulatedInstance,
    StartRequest, StopRequest,
};

use crate::delegate::{RepDelegate, SimulationDelegate};
use crate::score::{ScoreInfo, StopScoreInfo, fitness_score, satisfies_constraints};

type Delegate = Box<dyn RepDelegate>;

pub struct Rep {
    guid: RepId,
    delegate: Mutex<Delegate>,
}

impl Rep {
    pub fn new(guid: impl Into<RepId>, delegate: impl RepDelegate + 'static) -> Self {
        Self {
            guid: guid.into(),
            delegate: Mutex::new(Box::new(delegate)),
        }
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    /// Fitness score for hosting `request`. No mutation.
    pub fn score(&self, request: &StartRequest) -> RepResult<f64> {
        let delegate = self.lock();

        let info = score_info(&**delegate, &request.workload_id)?;
        satisfies_constraints(request, &info.remaining)?;
        Ok(fitness_score(&info))
    }

    /// Fitness score plus the instances this rep holds at the requested
    /// workload/index. Fails with `NotRunning` if it holds none.
    pub fn stop_score(&self, request: &StopRequest) -> RepResult<(f64, Vec<InstanceId>)> {
        let delegate = self.lock();

        let stop_info = stop_score_info(&**delegate, request)?;
        if stop_info.instance_ids.is_empty() {
            return Err(RepError::NotRunning {
                workload_id: request.workload_id.clone(),
                index: request.instance_index,
            });
        }
        Ok((fitness_score(&stop_info.info), stop_info.instance_ids))
    }

    /// Score, then reserve the capacity `request` needs, atomically.
    ///
    /// The returned score is the one computed before the reservation.
    pub fn score_then_tentatively_reserve(&self, request: &StartRequest) -> RepResult<f64> {
        let mut delegate = self.lock();

        let info = score_info(&**delegate, &request.workload_id)?;
        satisfies_constraints(request, &info.remaining)?;
        let score = fitness_score(&info);

        delegate.reserve(request)?;
        debug!(rep = %self.guid, instance = %request.instance_guid, score, "tentatively reserved");
        Ok(score)
    }

    pub fn release_reservation(&self, request: &StartRequest) -> RepResult<()> {
        let mut delegate = self.lock();
        delegate.release_reservation(request)?;
        debug!(rep = %self.guid, instance = %request.instance_guid, "reservation released");
        Ok(())
    }

    pub fn run(&self, request: &StartRequest) -> RepResult<()> {
        let mut delegate = self.lock();
        delegate.run(request)?;
        debug!(
            rep = %self.guid,
            workload = %request.workload_id,
            instance = %request.instance_guid,
            "instance running"
        );
        Ok(())
    }

    pub fn stop(&self, instance_id: &str) -> RepResult<()> {
        let mut delegate = self.lock();
        delegate.stop(instance_id)?;
        debug!(rep = %self.guid, instance = %instance_id, "instance stopped");
        Ok(())
    }

    pub fn total_resources(&self) -> RepResult<Resources> {
        self.lock().total_resources()
    }

    pub fn remaining_resources(&self) -> RepResult<Resources> {
        self.lock().remaining_resources()
    }

    // ── Simulation controls ─────────────────────────────────────────

    /// Whether the delegate exposes simulation controls.
    pub fn supports_simulation(&self) -> bool {
        self.lock().simulation().is_some()
    }

    /// Drop every instance and reservation.
    pub fn reset(&self) -> RepResult<()> {
        self.with_simulation(|sim| sim.set_simulated_instances(Vec::new()))?
    }

    pub fn set_simulated_instances(&self, instances: Vec<SimulatedInstance>) -> RepResult<()> {
        self.with_simulation(|sim| sim.set_simulated_instances(instances))?
    }

    pub fn simulated_instances(&self) -> RepResult<Vec<SimulatedInstance>> {
        self.with_simulation(|sim| sim.simulated_instances())
    }

    /// Resources and instances in one consistent read. Delegates without
    /// simulation controls report their resources with no instances.
    pub fn snapshot(&self) -> RepResult<RepSnapshot> {
        let mut delegate = self.lock();
        let remaining = delegate.remaining_resources()?;
        let total = delegate.total_resources()?;
        let instances = delegate
            .simulation()
            .map(|sim| sim.simulated_instances())
            .unwrap_or_default();

        Ok(RepSnapshot {
            rep_id: self.guid.clone(),
            remaining,
            total,
            instances,
        })
    }

    fn with_simulation<T>(&self, f: impl FnOnce(&mut dyn SimulationDelegate) -> T) -> RepResult<T> {
        let mut delegate = self.lock();
        match delegate.simulation() {
            Some(sim) => Ok(f(sim)),
            None => {
                warn!(rep = %self.guid, "simulation controls requested on a rep without them");
                Err(RepError::SimulationUnsupported(self.guid.clone()))
            }
        }
    }

    // Every delegate call completes or fails before mutating, so a panic
    // elsewhere never leaves the ledger half-updated.
    fn lock(&self) -> MutexGuard<'_, Delegate> {
        self.delegate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Rep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rep").field("guid", &self.guid).finish_non_exhaustive()
    }
}

fn score_info(delegate: &dyn RepDelegate, workload_id: &str) -> RepResult<ScoreInfo> {
    Ok(ScoreInfo {
        remaining: delegate.remaining_resources()?,
        total: delegate.total_resources()?,
        instances_for_workload: delegate.num_instances_for_workload(workload_id)?,
    })
}

fn stop_score_info(delegate: &dyn RepDelegate, request: &StopRequest) -> RepResult<StopScoreInfo> {
    let info = score_info(delegate, &request.workload_id)?;
    let instance_ids =
        delegate.instance_ids_for_workload_and_index(&request.workload_id, request.instance_index)?;
    Ok(StopScoreInfo { info, instance_ids })
}
