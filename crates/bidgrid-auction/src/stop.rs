//! Stop auction: collapse duplicate instances at one workload index.
//!
//! Every candidate rep is asked which instances it holds at the index.
//! The best-scoring holder keeps its first instance; every other instance
//! reported by any holder is stopped.

use rand::Rng;
use tracing::debug;

use bidgrid_core::{InstanceId, RepGuids, RepId, RepPoolClient, StopOutcome, StopRequest, rank};

pub async fn stop_auction<C, R>(
    client: &C,
    request: &StopRequest,
    rep_guids: &RepGuids,
    rng: &mut R,
) -> StopOutcome
where
    C: RepPoolClient + ?Sized,
    R: Rng + ?Sized,
{
    let mut outcome = StopOutcome {
        workload_id: request.workload_id.clone(),
        instance_index: request.instance_index,
        communication_count: rep_guids.len() as u32,
        ..Default::default()
    };

    let results = client.stop_score(rep_guids.as_slice(), request).await;
    let holders = rank(results.successes(), rng);
    let Some((best, others)) = holders.split_first() else {
        debug!(workload = %request.workload_id, index = request.instance_index, "no rep holds the index");
        return outcome;
    };

    outcome.winner = Some(best.rep_id.clone());
    outcome.kept_instance = best.instance_ids.first().cloned();

    let mut doomed: Vec<(RepId, InstanceId)> = best
        .instance_ids
        .iter()
        .skip(1)
        .map(|id| (best.rep_id.clone(), id.clone()))
        .collect();
    for bid in others {
        doomed.extend(bid.instance_ids.iter().map(|id| (bid.rep_id.clone(), id.clone())));
    }

    for (rep_id, instance_id) in doomed {
        client.stop(&rep_id, &instance_id).await;
        outcome.stopped_instances.push(instance_id);
        outcome.communication_count += 1;
    }

    debug!(
        workload = %request.workload_id,
        index = request.instance_index,
        stopped = outcome.stopped_instances.len(),
        "stop auction settled"
    );
    outcome
}
