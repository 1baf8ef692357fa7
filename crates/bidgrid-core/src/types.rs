//! Domain types exchanged between reps, pool clients, and the auctioneer.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unique identifier for a rep.
pub type RepId = String;

/// Unique identifier for a workload (every instance of an app shares it).
pub type WorkloadId = String;

/// Unique identifier for a single running instance.
pub type InstanceId = String;

// ── Resources ──────────────────────────────────────────────────────

/// A bundle of capacity: memory, disk and container slots.
///
/// Used both for a rep's total capacity and for what remains of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    pub memory_mb: u64,
    pub disk_mb: u64,
    pub containers: u32,
}

impl Resources {
    pub fn new(memory_mb: u64, disk_mb: u64, containers: u32) -> Self {
        Self {
            memory_mb,
            disk_mb,
            containers,
        }
    }

    /// Whether every dimension of `self` is within `other`.
    pub fn fits_within(&self, other: &Resources) -> bool {
        self.memory_mb <= other.memory_mb
            && self.disk_mb <= other.disk_mb
            && self.containers <= other.containers
    }
}

// ── Requests ───────────────────────────────────────────────────────

/// A request to place one instance of a workload.
///
/// `instance_guid` is the identity the instance takes once it runs;
/// a tentative reservation is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub workload_id: WorkloadId,
    pub instance_guid: InstanceId,
    pub instance_index: u32,
    pub memory_mb: u64,
    pub disk_mb: u64,
}

impl StartRequest {
    /// The resources one placed instance consumes.
    pub fn resources(&self) -> Resources {
        Resources::new(self.memory_mb, self.disk_mb, 1)
    }
}

/// A request to reduce the instances at a workload/index down to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StopRequest {
    pub workload_id: WorkloadId,
    pub instance_index: u32,
}

// ── Rules & outcomes ───────────────────────────────────────────────

/// Per-auction knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuctionRules {
    /// Rounds to attempt before giving up (>= 1).
    pub max_rounds: u32,
    /// Share of the candidate reps sampled each round, in `(0, 1]`.
    pub bidding_pool_fraction: f64,
}

impl AuctionRules {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_rounds == 0 {
            return Err("max_rounds must be at least 1".to_string());
        }
        if !(self.bidding_pool_fraction > 0.0 && self.bidding_pool_fraction <= 1.0) {
            return Err(format!(
                "bidding_pool_fraction must be in (0, 1], got {}",
                self.bidding_pool_fraction
            ));
        }
        Ok(())
    }
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            bidding_pool_fraction: 0.2,
        }
    }
}

/// Result of one start auction.
///
/// An empty `winner` is a normal result: every round failed and the
/// instance should be retried later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionOutcome {
    pub instance_guid: InstanceId,
    pub winner: Option<RepId>,
    pub rounds_used: u32,
    pub communication_count: u32,
    /// Wall-clock time of the auction. Inside a batch, measured from the
    /// start of the batch.
    pub duration: Duration,
}

impl AuctionOutcome {
    pub fn is_placed(&self) -> bool {
        self.winner.is_some()
    }
}

/// Result of one stop auction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopOutcome {
    pub workload_id: WorkloadId,
    pub instance_index: u32,
    /// Rep keeping the surviving instance.
    pub winner: Option<RepId>,
    pub kept_instance: Option<InstanceId>,
    pub stopped_instances: Vec<InstanceId>,
    pub communication_count: u32,
    pub duration: Duration,
}

// ── Simulation ─────────────────────────────────────────────────────

/// An instance as seen by a simulated rep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedInstance {
    pub instance_guid: InstanceId,
    pub workload_id: WorkloadId,
    pub index: u32,
    pub memory_mb: u64,
    pub disk_mb: u64,
}

impl SimulatedInstance {
    pub fn resources(&self) -> Resources {
        Resources::new(self.memory_mb, self.disk_mb, 1)
    }
}

impl From<&StartRequest> for SimulatedInstance {
    fn from(req: &StartRequest) -> Self {
        Self {
            instance_guid: req.instance_guid.clone(),
            workload_id: req.workload_id.clone(),
            index: req.instance_index,
            memory_mb: req.memory_mb,
            disk_mb: req.disk_mb,
        }
    }
}

/// Point-in-time view of one rep, collected for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepSnapshot {
    pub rep_id: RepId,
    pub remaining: Resources,
    pub total: Resources,
    pub instances: Vec<SimulatedInstance>,
}

// ── Candidate sets ─────────────────────────────────────────────────

/// The candidate reps for an auction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepGuids(Vec<RepId>);

impl RepGuids {
    pub fn new(guids: Vec<RepId>) -> Self {
        Self(guids)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[RepId] {
        &self.0
    }

    /// Sample `ceil(len * fraction)` reps without replacement.
    ///
    /// A fraction of 1 or more returns every rep in input order.
    /// A non-empty set always yields at least one rep.
    pub fn random_subset_by_fraction<R: Rng + ?Sized>(&self, fraction: f64, rng: &mut R) -> Vec<RepId> {
        if fraction >= 1.0 {
            return self.0.clone();
        }
        let count = (fraction * self.0.len() as f64).ceil() as usize;
        self.random_subset_by_count(count.max(1), rng)
    }

    /// Sample `count` reps without replacement, in random order.
    pub fn random_subset_by_count<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<RepId> {
        if count >= self.0.len() {
            return self.0.clone();
        }
        rand::seq::index::sample(rng, self.0.len(), count)
            .iter()
            .map(|i| self.0[i].clone())
            .collect()
    }
}

impl From<Vec<RepId>> for RepGuids {
    fn from(guids: Vec<RepId>) -> Self {
        Self(guids)
    }
}

impl FromIterator<RepId> for RepGuids {
    fn from_iter<T: IntoIterator<Item = RepId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
