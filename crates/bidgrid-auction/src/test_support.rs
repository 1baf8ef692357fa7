//! Shared fixtures for strategy and distributor tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use bidgrid_core::{
    InstanceId, RepError, RepId, RepPoolClient, Resources, ScoreResult, ScoreResults,
    SimulationPoolClient, StartRequest, StopRequest, StopScoreResults,
};
use bidgrid_rep::{LocalRepPoolClient, Rep, ResourceLedger};

pub fn make_client(n: usize, total: Resources) -> LocalRepPoolClient {
    LocalRepPoolClient::new((0..n).map(|i| Rep::new(format!("rep-{i}"), ResourceLedger::new(total))))
}

pub fn start(guid: &str) -> StartRequest {
    start_for(guid, "w1", 64, 64)
}

pub fn start_for(guid: &str, workload: &str, memory_mb: u64, disk_mb: u64) -> StartRequest {
    StartRequest {
        workload_id: workload.to_string(),
        instance_guid: guid.to_string(),
        instance_index: 0,
        memory_mb,
        disk_mb,
    }
}

pub async fn committed(client: &LocalRepPoolClient, rep_id: &str) -> Vec<InstanceId> {
    client
        .simulated_instances(rep_id)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.instance_guid)
        .collect()
}

/// Container slots held by reservations that were never run or released.
pub async fn total_reservations(client: &LocalRepPoolClient) -> u32 {
    client
        .snapshots(client.rep_guids().as_slice())
        .await
        .iter()
        .map(|s| s.total.containers - s.remaining.containers - s.instances.len() as u32)
        .sum()
}

/// Rejects the first `failures` per-rep reservation attempts as if another
/// auction got there first, then behaves like the wrapped client.
pub struct RacyClient {
    pub inner: LocalRepPoolClient,
    failures: AtomicUsize,
}

impl RacyClient {
    pub fn new(inner: LocalRepPoolClient, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
        }
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl RepPoolClient for RacyClient {
    async fn score(&self, rep_ids: &[RepId], request: &StartRequest) -> ScoreResults {
        self.inner.score(rep_ids, request).await
    }

    async fn score_then_tentatively_reserve(
        &self,
        rep_ids: &[RepId],
        request: &StartRequest,
    ) -> ScoreResults {
        let lost: Vec<bool> = rep_ids.iter().map(|_| self.take_failure()).collect();
        let attempt: Vec<RepId> = rep_ids
            .iter()
            .zip(&lost)
            .filter(|(_, lost)| !**lost)
            .map(|(rep_id, _)| rep_id.clone())
            .collect();
        let mut reserved = self
            .inner
            .score_then_tentatively_reserve(&attempt, request)
            .await
            .0
            .into_iter();

        rep_ids
            .iter()
            .zip(lost)
            .map(|(rep_id, lost)| {
                if lost {
                    ScoreResult {
                        rep_id: rep_id.clone(),
                        result: Err(RepError::ReservationConflict("lost race".to_string())),
                    }
                } else {
                    reserved.next().unwrap()
                }
            })
            .collect::<Vec<_>>()
            .into()
    }

    async fn run(&self, rep_id: &str, request: &StartRequest) {
        self.inner.run(rep_id, request).await
    }

    async fn release_reservation(&self, rep_ids: &[RepId], request: &StartRequest) {
        self.inner.release_reservation(rep_ids, request).await
    }

    async fn stop_score(&self, rep_ids: &[RepId], request: &StopRequest) -> StopScoreResults {
        self.inner.stop_score(rep_ids, request).await
    }

    async fn stop(&self, rep_id: &str, instance_id: &str) {
        self.inner.stop(rep_id, instance_id).await
    }
}
