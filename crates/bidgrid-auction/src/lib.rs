//! bidgrid-auction — the auctioneer side.
//!
//! Strategies talk to reps only through a `RepPoolClient` and never fail:
//! an auction either names a winner or reports that every round came up
//! empty. The distributor runs whole batches concurrently and collects a
//! report.
//!
//! # Architecture
//!
//! ```text
//! AuctionDistributor (semaphore-bounded tokio tasks)
//!   └── Auctioneer (Strategy)
//!       ├── pick_best       reserve on the single best bidder
//!       ├── reserve_n_best  reserve on the top n, keep one, release the rest
//!       └── stop_auction    collapse duplicates at one workload index
//! ```

pub mod auctioneer;
pub mod distributor;
pub mod error;
pub mod pick_best;
pub mod report;
pub mod reserve_n_best;
pub mod stop;

#[cfg(test)]
mod test_support;

pub use auctioneer::{Auctioneer, DEFAULT_TOP_N, Strategy};
pub use distributor::AuctionDistributor;
pub use error::{AuctionError, AuctionResult};
pub use pick_best::pick_best;
pub use report::{AuctionReport, InstanceDistribution, StopReport};
pub use reserve_n_best::reserve_n_best;
pub use stop::stop_auction;
