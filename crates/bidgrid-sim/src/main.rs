//! bidgrid-sim — run an auction batch against in-process reps.
//!
//! Builds `reps.count` identical in-memory reps, generates
//! `apps × instances_per_app` start requests, places them through the
//! distributor and logs a summary. Settings come from a TOML file and are
//! overridden by flags.
//!
//! # Usage
//!
//! ```text
//! bidgrid-sim --config bidgrid.toml --strategy pick-best --seed 7 --json
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bidgrid_auction::{AuctionDistributor, AuctionReport, Strategy};
use bidgrid_core::{SimulationConfig, StartRequest, StopRequest, StrategyKind};
use bidgrid_rep::{LocalRepPoolClient, Rep, ResourceLedger};

#[derive(Parser)]
#[command(name = "bidgrid-sim", about = "Simulate decentralized auction placement")]
struct Cli {
    /// TOML settings file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// `pick-best` or `reserve-n-best`.
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Number of simulated reps.
    #[arg(long)]
    reps: Option<usize>,

    /// Number of distinct workloads.
    #[arg(long)]
    apps: Option<usize>,

    /// Instances per workload.
    #[arg(long)]
    instances: Option<u32>,

    #[arg(long)]
    max_concurrent: Option<usize>,

    #[arg(long)]
    max_rounds: Option<u32>,

    /// Share of reps sampled per round, in (0, 1].
    #[arg(long)]
    pool_fraction: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// After placement, run a stop auction for every placed index.
    #[arg(long)]
    stop_sweep: bool,

    /// Print the full report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Print the effective settings as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(strategy) = self.strategy {
            config.auction.strategy = strategy;
        }
        if let Some(reps) = self.reps {
            config.reps.count = reps;
        }
        if let Some(apps) = self.apps {
            config.workload.apps = apps;
        }
        if let Some(instances) = self.instances {
            config.workload.instances_per_app = instances;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            config.auction.max_concurrent = max_concurrent;
        }
        if let Some(max_rounds) = self.max_rounds {
            config.auction.max_rounds = max_rounds;
        }
        if let Some(fraction) = self.pool_fraction {
            config.auction.bidding_pool_fraction = fraction;
        }
        if self.seed.is_some() {
            config.auction.seed = self.seed;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bidgrid=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let config = SimulationConfig::from_file(path)?;
            info!(path = ?path, "settings loaded");
            config
        }
        None => SimulationConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let client = build_reps(&config);
    let strategy = Strategy::from_kind(config.auction.strategy, config.auction.reserve_top_n);
    let mut distributor = AuctionDistributor::new(Arc::new(client), strategy, config.auction.max_concurrent)?;
    if let Some(seed) = config.auction.seed {
        distributor = distributor.with_seed(seed);
    }

    let rep_guids = distributor.client().rep_guids();
    let requests = start_requests(&config);
    let report = distributor
        .hold_auctions_for(requests, rep_guids.clone(), config.auction.rules())
        .await?;
    log_summary(&report);

    if cli.stop_sweep {
        let stops: Vec<StopRequest> = report
            .placed()
            .filter_map(|o| stop_request_for(&o.instance_guid, &config))
            .collect();
        let stop_report = distributor.hold_stop_auctions_for(stops, rep_guids).await?;
        info!(
            auctions = stop_report.outcomes.len(),
            stopped = stop_report.total_stopped(),
            communications = stop_report.total_communications(),
            "stop sweep finished"
        );
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn build_reps(config: &SimulationConfig) -> LocalRepPoolClient {
    let capacity = config.reps.capacity();
    let reps = (0..config.reps.count).map(|i| Rep::new(format!("rep-{i:03}"), ResourceLedger::new(capacity)));

    info!(count = config.reps.count, ?capacity, "reps ready");
    LocalRepPoolClient::new(reps)
        .with_latency(Duration::from_millis(config.reps.latency_ms))
        .with_timeout(Duration::from_millis(config.auction.rep_timeout_ms))
}

fn start_requests(config: &SimulationConfig) -> Vec<StartRequest> {
    let workload = &config.workload;
    (0..workload.apps)
        .flat_map(|app| {
            (0..workload.instances_per_app).map(move |index| StartRequest {
                workload_id: format!("app-{app:03}"),
                instance_guid: format!("app-{app:03}-{index}"),
                instance_index: index,
                memory_mb: workload.memory_mb,
                disk_mb: workload.disk_mb,
            })
        })
        .collect()
}

/// Recover the workload/index an instance guid was generated from.
fn stop_request_for(instance_guid: &str, config: &SimulationConfig) -> Option<StopRequest> {
    let (workload_id, index) = instance_guid.rsplit_once('-')?;
    let instance_index: u32 = index.parse().ok()?;
    (instance_index < config.workload.instances_per_app).then(|| StopRequest {
        workload_id: workload_id.to_string(),
        instance_index,
    })
}

fn log_summary(report: &AuctionReport) {
    let spread = report.instance_distribution();
    info!(
        strategy = %report.strategy,
        placed = report.placed().count(),
        unplaced = report.unplaced().count(),
        communications = report.total_communications(),
        mean_rounds = report.mean_rounds(),
        max_rounds = report.max_rounds(),
        duration = ?report.duration,
        "batch summary"
    );
    info!(min = spread.min, max = spread.max, mean = spread.mean, "instances per rep");

    let unplaced = report.unplaced().count();
    if unplaced > 0 {
        warn!(unplaced, "some instances found no rep; retry them in a later batch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let cli = Cli::parse_from([
            "bidgrid-sim",
            "--strategy",
            "pick-best",
            "--reps",
            "7",
            "--instances",
            "3",
            "--pool-fraction",
            "0.5",
            "--seed",
            "42",
        ]);
        let mut config = SimulationConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.auction.strategy, StrategyKind::PickBest);
        assert_eq!(config.reps.count, 7);
        assert_eq!(config.workload.instances_per_app, 3);
        assert_eq!(config.auction.bidding_pool_fraction, 0.5);
        assert_eq!(config.auction.seed, Some(42));
        assert_eq!(config.auction.max_rounds, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn generates_apps_times_instances() {
        let mut config = SimulationConfig::default();
        config.workload.apps = 4;
        config.workload.instances_per_app = 5;

        let requests = start_requests(&config);
        assert_eq!(requests.len(), 20);
        assert_eq!(requests[6].workload_id, "app-001");
        assert_eq!(requests[6].instance_index, 1);
    }

    #[test]
    fn stop_requests_round_trip_generated_guids() {
        let config = SimulationConfig::default();
        let stop = stop_request_for("app-002-7", &config).unwrap();
        assert_eq!(stop.workload_id, "app-002");
        assert_eq!(stop.instance_index, 7);
        assert!(stop_request_for("garbage", &config).is_none());
    }

    #[tokio::test]
    async fn small_batch_places_everything() {
        let mut config = SimulationConfig::default();
        config.reps.count = 5;
        config.workload.apps = 2;
        config.workload.instances_per_app = 5;
        config.auction.seed = Some(1);

        let distributor = AuctionDistributor::new(
            Arc::new(build_reps(&config)),
            Strategy::from_kind(config.auction.strategy, config.auction.reserve_top_n),
            config.auction.max_concurrent,
        )
        .unwrap()
        .with_seed(1);
        let report = distributor
            .hold_auctions_for(start_requests(&config), distributor.client().rep_guids(), config.auction.rules())
            .await
            .unwrap();

        assert_eq!(report.placed().count(), 10);
        assert_eq!(report.instance_distribution().mean, 2.0);
    }
}
