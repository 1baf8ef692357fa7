//! Batch results and their summaries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bidgrid_core::{AuctionOutcome, RepGuids, RepSnapshot, StopOutcome};

/// Everything a start batch produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuctionReport {
    pub strategy: String,
    pub rep_guids: RepGuids,
    /// Outcomes in completion order.
    pub outcomes: Vec<AuctionOutcome>,
    /// Wall-clock time for the whole batch.
    pub duration: Duration,
    /// Rep state after the last auction finished.
    pub snapshots: Vec<RepSnapshot>,
}

/// Committed instances per rep across a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceDistribution {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl AuctionReport {
    pub fn placed(&self) -> impl Iterator<Item = &AuctionOutcome> {
        self.outcomes.iter().filter(|o| o.is_placed())
    }

    pub fn unplaced(&self) -> impl Iterator<Item = &AuctionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_placed())
    }

    pub fn total_communications(&self) -> u64 {
        self.outcomes.iter().map(|o| o.communication_count as u64).sum()
    }

    pub fn mean_rounds(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let total: u64 = self.outcomes.iter().map(|o| o.rounds_used as u64).sum();
        total as f64 / self.outcomes.len() as f64
    }

    pub fn max_rounds(&self) -> u32 {
        self.outcomes.iter().map(|o| o.rounds_used).max().unwrap_or(0)
    }

    /// When the last auction finished, relative to the batch start.
    pub fn last_completion(&self) -> Duration {
        self.outcomes.iter().map(|o| o.duration).max().unwrap_or_default()
    }

    pub fn instance_distribution(&self) -> InstanceDistribution {
        let counts: Vec<usize> = self.snapshots.iter().map(|s| s.instances.len()).collect();
        if counts.is_empty() {
            return InstanceDistribution::default();
        }
        InstanceDistribution {
            min: counts.iter().copied().min().unwrap_or(0),
            max: counts.iter().copied().max().unwrap_or(0),
            mean: counts.iter().sum::<usize>() as f64 / counts.len() as f64,
        }
    }
}

/// Everything a stop batch produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopReport {
    pub outcomes: Vec<StopOutcome>,
    pub duration: Duration,
}

impl StopReport {
    pub fn total_stopped(&self) -> usize {
        self.outcomes.iter().map(|o| o.stopped_instances.len()).sum()
    }

    pub fn total_communications(&self) -> u64 {
        self.outcomes.iter().map(|o| o.communication_count as u64).sum()
    }
}
