//! Fitness scoring for a rep's bid.
//!
//! `score = mean(fraction used of containers, disk, memory) + instances of
//! the same workload already on the rep`. Lower is better. The second term
//! is an anti-affinity penalty: once a workload has an instance on a rep,
//! any rep without one wins regardless of utilization.

use bidgrid_core::{InstanceId, RepError, RepResult, Resources, StartRequest};

/// What a rep knows about itself when scoring a start request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInfo {
    pub remaining: Resources,
    pub total: Resources,
    pub instances_for_workload: u32,
}

/// [`ScoreInfo`] plus the instances eligible for removal.
#[derive(Debug, Clone, PartialEq)]
pub struct StopScoreInfo {
    pub info: ScoreInfo,
    pub instance_ids: Vec<InstanceId>,
}

/// Reject the bid unless the request fits in what remains.
pub fn satisfies_constraints(request: &StartRequest, remaining: &Resources) -> RepResult<()> {
    let has_memory = remaining.memory_mb >= request.memory_mb;
    let has_disk = remaining.disk_mb >= request.disk_mb;
    let has_container = remaining.containers > 0;

    if has_memory && has_disk && has_container {
        Ok(())
    } else {
        Err(RepError::InsufficientResources)
    }
}

pub fn fitness_score(info: &ScoreInfo) -> f64 {
    let containers = fraction_used(
        u64::from(info.remaining.containers),
        u64::from(info.total.containers),
    );
    let disk = fraction_used(info.remaining.disk_mb, info.total.disk_mb);
    let memory = fraction_used(info.remaining.memory_mb, info.total.memory_mb);

    (containers + disk + memory) / 3.0 + f64::from(info.instances_for_workload)
}

// A dimension with no capacity counts as fully used.
fn fraction_used(remaining: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    1.0 - remaining as f64 / total as f64
}
