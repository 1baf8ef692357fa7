//! Auction error types.
//!
//! Per-rep failures never show up here: they are absorbed by the round
//! that saw them. These errors reject a batch before any auction starts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("no candidate reps")]
    NoReps,

    #[error("invalid auction rules: {0}")]
    InvalidRules(String),

    #[error("max_concurrent must be at least 1")]
    InvalidConcurrency,

    #[error("reserve-n-best needs top_n of at least 1")]
    InvalidTopN,
}

pub type AuctionResult<T> = Result<T, AuctionError>;
