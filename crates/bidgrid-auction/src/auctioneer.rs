//! Strategy dispatch.

use std::time::Instant;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bidgrid_core::{
    AuctionOutcome, AuctionRules, RepGuids, RepPoolClient, StartRequest, StopOutcome, StopRequest,
    StrategyKind,
};

use crate::pick_best::pick_best;
use crate::reserve_n_best::reserve_n_best;
use crate::stop::stop_auction;

/// Reservations held per round by reserve-n-best unless configured.
pub const DEFAULT_TOP_N: usize = 5;

/// Which start auction to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "strategy")]
pub enum Strategy {
    PickBest,
    ReserveNBest { top_n: usize },
}

impl Strategy {
    pub fn from_kind(kind: StrategyKind, top_n: usize) -> Self {
        match kind {
            StrategyKind::PickBest => Strategy::PickBest,
            StrategyKind::ReserveNBest => Strategy::ReserveNBest { top_n },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::PickBest => "pick-best",
            Strategy::ReserveNBest { .. } => "reserve-n-best",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::ReserveNBest { top_n: DEFAULT_TOP_N }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::PickBest => f.write_str(self.name()),
            Strategy::ReserveNBest { top_n } => write!(f, "{}(top_n={top_n})", self.name()),
        }
    }
}

/// Runs single auctions with a fixed strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Auctioneer {
    strategy: Strategy,
}

impl Auctioneer {
    pub fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Place one instance. `duration` covers this auction alone.
    pub async fn auction<C, R>(
        &self,
        client: &C,
        request: &StartRequest,
        rep_guids: &RepGuids,
        rules: &AuctionRules,
        rng: &mut R,
    ) -> AuctionOutcome
    where
        C: RepPoolClient + ?Sized,
        R: Rng + ?Sized,
    {
        let started = Instant::now();
        let mut outcome = match self.strategy {
            Strategy::PickBest => pick_best(client, request, rep_guids, rules, rng).await,
            Strategy::ReserveNBest { top_n } => {
                reserve_n_best(client, request, rep_guids, rules, top_n, rng).await
            }
        };
        outcome.duration = started.elapsed();

        match &outcome.winner {
            Some(rep) => info!(
                instance = %request.instance_guid,
                %rep,
                rounds = outcome.rounds_used,
                communications = outcome.communication_count,
                "instance placed"
            ),
            None => warn!(
                instance = %request.instance_guid,
                rounds = outcome.rounds_used,
                strategy = self.strategy.name(),
                "auction exhausted without a winner"
            ),
        }
        outcome
    }

    /// Resolve one workload index down to a single instance.
    pub async fn stop<C, R>(
        &self,
        client: &C,
        request: &StopRequest,
        rep_guids: &RepGuids,
        rng: &mut R,
    ) -> StopOutcome
    where
        C: RepPoolClient + ?Sized,
        R: Rng + ?Sized,
    {
        let started = Instant::now();
        let mut outcome = stop_auction(client, request, rep_guids, rng).await;
        outcome.duration = started.elapsed();
        outcome
    }
}
