//! bidgrid-rep — the bidding side of the auction.
//!
//! A [`Rep`] wraps a capacity-management delegate behind a single lock and
//! exposes the operations auctions drive: score, stop-score, score-then-
//! tentatively-reserve, release, run, and stop. Each is indivisible with
//! respect to every other call on the same rep, which is the whole basis of
//! the at-most-one-winner guarantee.
//!
//! # Components
//!
//! - **`rep`** — the atomic state machine
//! - **`delegate`** — the capacity-management boundary and the optional
//!   simulation capability
//! - **`score`** — fitness scoring and constraint checks
//! - **`ledger`** — in-memory delegate used by simulations and tests
//! - **`local`** — in-process `RepPoolClient` over a set of reps

pub mod delegate;
pub mod ledger;
pub mod local;
pub mod rep;
pub mod score;

pub use delegate::{RepDelegate, SimulationDelegate};
pub use ledger::ResourceLedger;
pub use local::{LocalRepPoolClient, instances_by_rep};
pub use rep::Rep;
pub use score::{ScoreInfo, StopScoreInfo, fitness_score, satisfies_constraints};
