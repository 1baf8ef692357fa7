//! Batch-level properties of the auction distributor.
//!
//! - at most one winner per instance, even when every rep is contended
//! - no tentative reservation outlives its auction
//! - unplaceable instances use exactly `max_rounds` rounds
//! - in-flight auctions never exceed `max_concurrent`

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bidgrid_auction::{AuctionDistributor, AuctionReport, Strategy};
use bidgrid_core::{
    AuctionRules, RepId, RepPoolClient, RepResult, RepSnapshot, Resources, ScoreResults,
    SimulatedInstance, SimulationPoolClient, StartRequest, StopRequest, StopScoreResults,
};
use bidgrid_rep::{LocalRepPoolClient, Rep, ResourceLedger};

fn make_reps(n: usize, total: Resources) -> LocalRepPoolClient {
    LocalRepPoolClient::new((0..n).map(|i| Rep::new(format!("rep-{i:02}"), ResourceLedger::new(total))))
}

fn start_requests(apps: usize, per_app: u32) -> Vec<StartRequest> {
    (0..apps)
        .flat_map(|app| {
            (0..per_app).map(move |index| StartRequest {
                workload_id: format!("app-{app}"),
                instance_guid: format!("app-{app}-{index}"),
                instance_index: index,
                memory_mb: 64,
                disk_mb: 64,
            })
        })
        .collect()
}

/// Every placed instance is committed on its winner and nowhere else;
/// unplaced instances are committed nowhere; no reservation is left over.
fn assert_consistent(report: &AuctionReport) {
    let mut holders: HashMap<&str, Vec<&str>> = HashMap::new();
    for snap in &report.snapshots {
        for inst in &snap.instances {
            holders.entry(inst.instance_guid.as_str()).or_default().push(snap.rep_id.as_str());
        }
        let reserved = snap.total.containers - snap.remaining.containers - snap.instances.len() as u32;
        assert_eq!(reserved, 0, "{} leaked {reserved} reservation(s)", snap.rep_id);
    }

    for outcome in &report.outcomes {
        let found = holders.get(outcome.instance_guid.as_str()).cloned().unwrap_or_default();
        match &outcome.winner {
            Some(winner) => assert_eq!(found, vec![winner.as_str()], "{}", outcome.instance_guid),
            None => assert!(found.is_empty(), "unplaced {} is running", outcome.instance_guid),
        }
    }
}

// ── Contention ──────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn at_most_one_winner_when_capacity_is_scarce() {
    for strategy in [Strategy::PickBest, Strategy::ReserveNBest { top_n: 5 }] {
        for seed in 0..6 {
            // 10 single-slot reps, 30 instances all in flight at once.
            let client = make_reps(10, Resources::new(1024, 1024, 1)).with_latency(Duration::from_millis(1));
            let dist = AuctionDistributor::new(Arc::new(client), strategy, 30)
                .unwrap()
                .with_seed(seed);
            let rules = AuctionRules { max_rounds: 5, bidding_pool_fraction: 1.0 };

            let report = dist
                .hold_auctions_for(start_requests(3, 10), dist.client().rep_guids(), rules)
                .await
                .unwrap();

            assert_eq!(report.outcomes.len(), 30);
            assert!(report.placed().count() <= 10);
            assert!(report.snapshots.iter().all(|s| s.instances.len() <= 1));
            assert_consistent(&report);

            let winners: Vec<_> = report.placed().filter_map(|o| o.winner.as_deref()).collect();
            let unique: HashSet<_> = winners.iter().collect();
            assert_eq!(unique.len(), winners.len(), "{strategy}: a rep won twice");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_leaked_reservations_with_plenty_of_room() {
    for strategy in [Strategy::PickBest, Strategy::ReserveNBest { top_n: 3 }] {
        let client = make_reps(20, Resources::new(4096, 4096, 16));
        let dist = AuctionDistributor::new(Arc::new(client), strategy, 8)
            .unwrap()
            .with_seed(99);
        let rules = AuctionRules { max_rounds: 20, bidding_pool_fraction: 0.3 };

        let report = dist
            .hold_auctions_for(start_requests(5, 20), dist.client().rep_guids(), rules)
            .await
            .unwrap();

        assert_eq!(report.placed().count(), 100);
        assert_consistent(&report);

        // Anti-affinity spreads each app: 20 instances over 20 reps.
        let spread = report.instance_distribution();
        assert_eq!(spread.mean, 5.0);
        assert!(spread.max <= 16);
    }
}

// ── Exhaustion ──────────────────────────────────────────────────────

#[tokio::test]
async fn unplaceable_instances_use_every_round() {
    let client = make_reps(8, Resources::new(32, 32, 4));
    let dist = AuctionDistributor::new(Arc::new(client), Strategy::PickBest, 2)
        .unwrap()
        .with_seed(1);
    let rules = AuctionRules { max_rounds: 7, bidding_pool_fraction: 0.25 };

    let report = dist
        .hold_auctions_for(start_requests(1, 3), dist.client().rep_guids(), rules)
        .await
        .unwrap();

    assert_eq!(report.unplaced().count(), 3);
    for outcome in &report.outcomes {
        assert_eq!(outcome.rounds_used, 7);
        // ceil(8 * 0.25) = 2 reps scored per round.
        assert_eq!(outcome.communication_count, 14);
    }
    assert_eq!(report.max_rounds(), 7);
    assert_consistent(&report);
}

// ── Concurrency bound ──────────────────────────────────────────────

/// Counts score calls in flight. Each auction issues its calls one at a
/// time, so this is also a count of auctions in flight.
struct CountingClient {
    inner: LocalRepPoolClient,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RepPoolClient for CountingClient {
    async fn score(&self, rep_ids: &[RepId], request: &StartRequest) -> ScoreResults {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let results = self.inner.score(rep_ids, request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        results
    }

    async fn score_then_tentatively_reserve(&self, rep_ids: &[RepId], request: &StartRequest) -> ScoreResults {
        self.inner.score_then_tentatively_reserve(rep_ids, request).await
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

impl SimulationPoolClient for CountingClient {
    async fn snapshots(&self, rep_ids: &[RepId]) -> Vec<RepSnapshot> {
        self.inner.snapshots(rep_ids).await
    }

    async fn reset(&self, rep_ids: &[RepId]) -> RepResult<()> {
        self.inner.reset(rep_ids).await
    }

    async fn set_simulated_instances(&self, rep_id: &str, instances: Vec<SimulatedInstance>) -> RepResult<()> {
        self.inner.set_simulated_instances(rep_id, instances).await
    }

    async fn simulated_instances(&self, rep_id: &str) -> RepResult<Vec<SimulatedInstance>> {
        self.inner.simulated_instances(rep_id).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_auctions_respect_max_concurrent() {
    let inner = make_reps(10, Resources::new(4096, 4096, 32)).with_latency(Duration::from_millis(5));
    let client = Arc::new(CountingClient {
        inner,
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let dist = AuctionDistributor::new(Arc::clone(&client), Strategy::PickBest, 3)
        .unwrap()
        .with_seed(5);
    let rules = AuctionRules { max_rounds: 5, bidding_pool_fraction: 0.5 };

    let report = dist
        .hold_auctions_for(start_requests(4, 10), client.inner.rep_guids(), rules)
        .await
        .unwrap();

    assert_eq!(report.placed().count(), 40);
    let peak = client.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak {peak} exceeded max_concurrent");
    assert!(peak >= 2, "auctions never overlapped");
}

// ── Reporting ──────────────────────────────────────────────────────

#[tokio::test]
async fn report_serializes_to_json() {
    let client = make_reps(4, Resources::new(1024, 1024, 8));
    let dist = AuctionDistributor::new(Arc::new(client), Strategy::ReserveNBest { top_n: 2 }, 4)
        .unwrap()
        .with_seed(3);

    let report = dist
        .hold_auctions_for(start_requests(2, 3), dist.client().rep_guids(), AuctionRules::default())
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["strategy"], "reserve-n-best(top_n=2)");
    assert_eq!(json["outcomes"].as_array().map(Vec::len), Some(6));
    assert_eq!(json["snapshots"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["rep_guids"].as_array().map(Vec::len), Some(4));

    let back: AuctionReport = serde_json::from_value(json).unwrap();
    assert_eq!(back.placed().count(), 6);
}
