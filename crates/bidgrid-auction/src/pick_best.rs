//! Pick-best: reserve only the single best bidder.
//!
//! Each round:
//! 1. sample a subset of the candidate reps
//! 2. ask every sampled rep for a score; if none can host, next round
//! 3. rank the bids and try to reserve on the best rep alone
//! 4. if the reservation lost a race, next round; otherwise run and return

use rand::Rng;
use tracing::debug;

use bidgrid_core::{AuctionOutcome, AuctionRules, RepGuids, RepPoolClient, StartRequest, rank};

pub async fn pick_best<C, R>(
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

        let ranked = rank(scores.successes(), rng);
        let winner = &ranked[0];

        communications += 1;
        let reserved = client
            .score_then_tentatively_reserve(std::slice::from_ref(&winner.rep_id), request)
            .await;
        if reserved.all_failed() {
            debug!(instance = %request.instance_guid, round, rep = %winner.rep_id, "lost reservation race");
            continue;
        }

        communications += 1;
        client.run(&winner.rep_id, request).await;

        return AuctionOutcome {
            instance_guid: request.instance_guid.clone(),
            winner: Some(winner.rep_id.clone()),
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
