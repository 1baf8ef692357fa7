//! Reserve-n-best: hold capacity on several top bidders, keep one.
//!
//! Each round:
//! 1. sample and score exactly like pick-best
//! 2. ask the `top_n` best bidders to tentatively reserve
//! 3. if none could, next round
//! 4. rank the reps that did reserve by their reservation-time score, run
//!    on the best, and release every other reservation
//!
//! Every reservation made in a round is either run or released before the
//! auction returns. A round that reaches step 4 counts one message per
//! reservation result, failed attempts included, on top of the scores and
//! reservation requests.

use rand::Rng;
use tracing::debug;

use bidgrid_core::{
    AuctionOutcome, AuctionRules, RepGuids, RepId, RepPoolClient, StartRequest, rank,
};

pub async fn reserve_n_best<C, R>(
    client: &C,
    request: &StartRequest,
    rep_guids: &RepGuids,
    rules: &AuctionRules,
    top_n: usize,
    rng: &mut R,
) -> AuctionOutcome
where
    C: RepPoolClient + ?Sized,
    R: Rng + ?Sized,
{
    let mut communications = 0u32;

    for round in 1..=rules.max_rounds {
        let sampled = rep_guids.random_subset_by_fraction(rules.bidding_pool_fraction, rng);

        communications += sampled.len() as u32;
        let scores = client.score(&sampled, request).await;
        if scores.all_failed() {
            debug!(
                instance = %request.instance_guid,
                round,
                sampled = sampled.len(),
                unreachable = scores.unreachable(),
                "no rep can host"
            );
            continue;
        }

        let mut ranked = rank(scores.successes(), rng);
        ranked.truncate(top_n.max(1));
        let candidates: Vec<RepId> = ranked.into_iter().map(|bid| bid.rep_id).collect();

        communications += candidates.len() as u32;
        let reserved = client.score_then_tentatively_reserve(&candidates, request).await;
        if reserved.all_failed() {
            debug!(
                instance = %request.instance_guid,
                round,
                candidates = candidates.len(),
                "every reservation lost its race"
            );
            continue;
        }

        let ordered: Vec<RepId> = rank(reserved.successes(), rng)
            .into_iter()
            .map(|bid| bid.rep_id)
            .collect();
        let Some((winner, losers)) = ordered.split_first() else {
            continue;
        };

        communications += reserved.len() as u32;
        client.run(winner, request).await;
        if !losers.is_empty() {
            client.release_reservation(losers, request).await;
        }

        return AuctionOutcome {
            instance_guid: request.instance_guid.clone(),
            winner: Some(winner.clone()),
            rounds_used: round,
            communication_count: communications,
            ..Default::default()
        };
    }

    AuctionOutcome {
        instance_guid: request.instance_guid.clone(),
        winner: None,
        rounds_used: rules.max_rounds,
        communication_count: communications,
        ..Default::default()
    }
}
