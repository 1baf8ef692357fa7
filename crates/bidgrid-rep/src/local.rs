//! In-process rep pool client.
//!
//! Holds the reps directly and fans each batch call out as concurrent tokio
//! tasks. Optional per-call latency stands in for the network; a per-call
//! timeout turns a slow rep into an ordinary `Timeout` error for that rep.
//!
//! Batch results always come back in the order the rep ids were given,
//! with one entry per id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{error, warn};

use bidgrid_core::{
    InstanceId, RepError, RepGuids, RepId, RepPoolClient, RepResult, RepSnapshot, ScoreResult,
    ScoreResults, SimulatedInstance, SimulationPoolClient, StartRequest, StopRequest,
    StopScoreResult, StopScoreResults,
};

use crate::rep::Rep;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct LocalRepPoolClient {
    reps: Arc<HashMap<RepId, Arc<Rep>>>,
    latency: Duration,
    timeout: Duration,
}

impl LocalRepPoolClient {
    pub fn new(reps: impl IntoIterator<Item = Rep>) -> Self {
        let reps = reps
            .into_iter()
            .map(|rep| (rep.guid().to_string(), Arc::new(rep)))
            .collect();
        Self {
            reps: Arc::new(reps),
            latency: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Simulated latency added before every rep call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// All rep guids, sorted.
    pub fn rep_guids(&self) -> RepGuids {
        let mut guids: Vec<RepId> = self.reps.keys().cloned().collect();
        guids.sort();
        RepGuids::new(guids)
    }

    pub fn rep(&self, rep_id: &str) -> Option<Arc<Rep>> {
        self.reps.get(rep_id).cloned()
    }

    /// Call one rep, honoring latency and timeout.
    async fn call<T, F>(&self, rep_id: &str, op: F) -> RepResult<T>
    where
        F: FnOnce(&Rep) -> RepResult<T>,
    {
        invoke(self.rep(rep_id), rep_id, self.latency, self.timeout, op).await
    }

    /// Call every rep in `rep_ids` concurrently; results in input order.
    async fn fan_out<T, F>(&self, rep_ids: &[RepId], op: F) -> Vec<(RepId, RepResult<T>)>
    where
        T: Send + 'static,
        F: Fn(&Rep) -> RepResult<T> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        let mut tasks = JoinSet::new();

        for (position, rep_id) in rep_ids.iter().enumerate() {
            let rep = self.rep(rep_id);
            let rep_id = rep_id.clone();
            let op = op.clone();
            let (latency, timeout) = (self.latency, self.timeout);

            tasks.spawn(async move {
                let result = invoke(rep, &rep_id, latency, timeout, |rep| (*op)(rep)).await;
                (position, result)
            });
        }

        let mut slots: Vec<Option<RepResult<T>>> = rep_ids.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => slots[position] = Some(result),
                Err(e) => error!(error = %e, "rep call task failed"),
            }
        }

        // A task that panicked leaves its slot empty.
        rep_ids
            .iter()
            .cloned()
            .zip(slots)
            .map(|(rep_id, slot)| {
                let result = slot.unwrap_or_else(|| Err(RepError::Transport("no response".to_string())));
                (rep_id, result)
            })
            .collect()
    }
}

async fn invoke<T, F>(
    rep: Option<Arc<Rep>>,
    rep_id: &str,
    latency: Duration,
    timeout: Duration,
    op: F,
) -> RepResult<T>
where
    F: FnOnce(&Rep) -> RepResult<T>,
{
    let rep = rep.ok_or_else(|| RepError::UnknownRep(rep_id.to_string()))?;
    let call = async {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        op(&rep)
    };

    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(RepError::Timeout {
            rep_id: rep_id.to_string(),
            after_ms: timeout.as_millis() as u64,
        }),
    }
}

impl RepPoolClient for LocalRepPoolClient {
    async fn score(&self, rep_ids: &[RepId], request: &StartRequest) -> ScoreResults {
        let request = request.clone();
        self.fan_out(rep_ids, move |rep| rep.score(&request))
            .await
            .into_iter()
            .map(|(rep_id, result)| ScoreResult { rep_id, result })
            .collect::<Vec<_>>()
            .into()
    }

    async fn score_then_tentatively_reserve(
        &self,
        rep_ids: &[RepId],
        request: &StartRequest,
    ) -> ScoreResults {
        let request = request.clone();
        self.fan_out(rep_ids, move |rep| rep.score_then_tentatively_reserve(&request))
            .await
            .into_iter()
            .map(|(rep_id, result)| ScoreResult { rep_id, result })
            .collect::<Vec<_>>()
            .into()
    }

    async fn run(&self, rep_id: &str, request: &StartRequest) {
        if let Err(e) = self.call(rep_id, |rep| rep.run(request)).await {
            error!(rep = %rep_id, instance = %request.instance_guid, error = %e, "run failed");
        }
    }

    async fn release_reservation(&self, rep_ids: &[RepId], request: &StartRequest) {
        let owned = request.clone();
        let results = self
            .fan_out(rep_ids, move |rep| rep.release_reservation(&owned))
            .await;
        for (rep_id, result) in results {
            if let Err(e) = result {
                warn!(rep = %rep_id, instance = %request.instance_guid, error = %e, "release failed");
            }
        }
    }

    async fn stop_score(&self, rep_ids: &[RepId], request: &StopRequest) -> StopScoreResults {
        let request = request.clone();
        self.fan_out(rep_ids, move |rep| rep.stop_score(&request))
            .await
            .into_iter()
            .map(|(rep_id, result)| StopScoreResult { rep_id, result })
            .collect::<Vec<_>>()
            .into()
    }

    async fn stop(&self, rep_id: &str, instance_id: &str) {
        if let Err(e) = self.call(rep_id, |rep| rep.stop(instance_id)).await {
            error!(rep = %rep_id, instance = %instance_id, error = %e, "stop failed");
        }
    }
}

impl SimulationPoolClient for LocalRepPoolClient {
    async fn snapshots(&self, rep_ids: &[RepId]) -> Vec<RepSnapshot> {
        self.fan_out(rep_ids, |rep| rep.snapshot())
            .await
            .into_iter()
            .filter_map(|(rep_id, result)| match result {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(rep = %rep_id, error = %e, "snapshot unavailable");
                    None
                }
            })
            .collect()
    }

    async fn reset(&self, rep_ids: &[RepId]) -> RepResult<()> {
        for (_, result) in self.fan_out(rep_ids, |rep| rep.reset()).await {
            result?;
        }
        Ok(())
    }

    async fn set_simulated_instances(
        &self,
        rep_id: &str,
        instances: Vec<SimulatedInstance>,
    ) -> RepResult<()> {
        self.call(rep_id, move |rep| rep.set_simulated_instances(instances))
            .await
    }

    async fn simulated_instances(&self, rep_id: &str) -> RepResult<Vec<SimulatedInstance>> {
        self.call(rep_id, |rep| rep.simulated_instances()).await
    }
}

/// Instance ids committed on each rep, for assertions and reports.
pub async fn instances_by_rep(client: &LocalRepPoolClient) -> HashMap<RepId, Vec<InstanceId>> {
    client
        .snapshots(client.rep_guids().as_slice())
        .await
        .into_iter()
        .map(|snap| {
            let ids = snap.instances.into_iter().map(|i| i.instance_guid).collect();
            (snap.rep_id, ids)
        })
        .collect()
}
