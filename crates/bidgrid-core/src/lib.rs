//! bidgrid-core — shared types for decentralized auction placement.
//!
//! Reps bid on start requests with a fitness score computed from their own
//! resource state; the auctioneer samples reps, ranks bids, tentatively
//! reserves on the apparent winner, and confirms or retries. This crate
//! holds what every participant agrees on:
//!
//! - **`types`** — resources, requests, rules, outcomes, candidate sets
//! - **`bids`** — per-rep score responses and tie-safe ranking
//! - **`client`** — the `RepPoolClient` contract strategies talk through
//! - **`config`** — `bidgrid.toml` simulation settings
//! - **`error`** — the per-rep error taxonomy

pub mod bids;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use bids::{Bid, ScoreResult, ScoreResults, Scored, StopBid, StopScoreResult, StopScoreResults, rank};
pub use client::{RepPoolClient, SimulationPoolClient};
pub use config::{AuctionConfig, RepsConfig, SimulationConfig, StrategyKind, WorkloadConfig};
pub use error::{ConfigError, ConfigResult, RepError, RepResult};
pub use types::*;
