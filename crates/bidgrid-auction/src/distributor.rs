//! Concurrent batch runner.
//!
//! Every request in a batch is an independent auction spawned on the tokio
//! runtime. A semaphore of `max_concurrent` permits bounds how many are in
//! flight; outcomes are collected in the order they finish.
//!
//! Each auction gets its own `SmallRng` drawn from a master RNG. With a
//! fixed seed the per-auction streams are reproducible.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info};

use bidgrid_core::{AuctionRules, RepGuids, SimulationPoolClient, StartRequest, StopRequest};

use crate::auctioneer::{Auctioneer, Strategy};
use crate::error::{AuctionError, AuctionResult};
use crate::report::{AuctionReport, StopReport};

pub struct AuctionDistributor<C> {
    client: Arc<C>,
    auctioneer: Auctioneer,
    max_concurrent: usize,
    seed: Option<u64>,
}

impl<C> AuctionDistributor<C>
where
    C: SimulationPoolClient + 'static,
{
    pub fn new(client: Arc<C>, strategy: Strategy, max_concurrent: usize) -> AuctionResult<Self> {
        if max_concurrent == 0 {
            return Err(AuctionError::InvalidConcurrency);
        }
        if matches!(strategy, Strategy::ReserveNBest { top_n: 0 }) {
            return Err(AuctionError::InvalidTopN);
        }
        Ok(Self {
            client,
            auctioneer: Auctioneer::new(strategy),
            max_concurrent,
            seed: None,
        })
    }

    /// Seed the master RNG. Without a seed it is drawn from the OS.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn strategy(&self) -> Strategy {
        self.auctioneer.strategy()
    }

    /// Run one start auction per request and report the results.
    ///
    /// Each outcome's `duration` is measured from the start of the batch.
    pub async fn hold_auctions_for(
        &self,
        instances: Vec<StartRequest>,
        rep_guids: RepGuids,
        rules: AuctionRules,
    ) -> AuctionResult<AuctionReport> {
        rules.validate().map_err(AuctionError::InvalidRules)?;
        if rep_guids.is_empty() {
            return Err(AuctionError::NoReps);
        }

        info!(
            instances = instances.len(),
            reps = rep_guids.len(),
            strategy = %self.auctioneer.strategy(),
            max_concurrent = self.max_concurrent,
            "starting auctions"
        );

        let started = Instant::now();
        let rep_guids = Arc::new(rep_guids);
        let auctioneer = self.auctioneer;

        let outcomes = self
            .bounded(instances, |request, mut rng| {
                let client = Arc::clone(&self.client);
                let rep_guids = Arc::clone(&rep_guids);
                async move {
                    let mut outcome = auctioneer
                        .auction(&*client, &request, &rep_guids, &rules, &mut rng)
                        .await;
                    outcome.duration = started.elapsed();
                    outcome
                }
            })
            .await;

        let duration = started.elapsed();
        let snapshots = self.client.snapshots(rep_guids.as_slice()).await;

        let report = AuctionReport {
            strategy: self.auctioneer.strategy().to_string(),
            rep_guids: rep_guids.as_ref().clone(),
            outcomes,
            duration,
            snapshots,
        };
        info!(
            placed = report.placed().count(),
            unplaced = report.unplaced().count(),
            communications = report.total_communications(),
            ?duration,
            "auctions finished"
        );
        Ok(report)
    }

    /// Run one stop auction per request.
    pub async fn hold_stop_auctions_for(
        &self,
        requests: Vec<StopRequest>,
        rep_guids: RepGuids,
    ) -> AuctionResult<StopReport> {
        if rep_guids.is_empty() {
            return Err(AuctionError::NoReps);
        }

        let started = Instant::now();
        let rep_guids = Arc::new(rep_guids);
        let auctioneer = self.auctioneer;

        let outcomes = self
            .bounded(requests, |request, mut rng| {
                let client = Arc::clone(&self.client);
                let rep_guids = Arc::clone(&rep_guids);
                async move {
                    let mut outcome = auctioneer.stop(&*client, &request, &rep_guids, &mut rng).await;
                    outcome.duration = started.elapsed();
                    outcome
                }
            })
            .await;

        let report = StopReport {
            outcomes,
            duration: started.elapsed(),
        };
        info!(
            auctions = report.outcomes.len(),
            stopped = report.total_stopped(),
            duration = ?report.duration,
            "stop auctions finished"
        );
        Ok(report)
    }

    fn master_rng(&self) -> SmallRng {
        match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }

    /// Spawn `task` for every item, at most `max_concurrent` at a time.
    async fn bounded<I, T, F, Fut>(&self, items: Vec<I>, mut task: F) -> Vec<T>
    where
        T: Send + 'static,
        F: FnMut(I, SmallRng) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let expected = items.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut master = self.master_rng();

        for item in items {
            let rng = SmallRng::seed_from_u64(master.random());
            let fut = task(item, rng);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                // The receiver only goes away if the batch was dropped.
                let _ = tx.send(fut.await);
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(expected);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        if results.len() < expected {
            error!(expected, received = results.len(), "auction tasks ended without an outcome");
        }
        results
    }
}
