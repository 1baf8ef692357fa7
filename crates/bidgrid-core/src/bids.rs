//! Score responses and bid ranking.
//!
//! Every pool-client batch call returns one result per rep asked, in the
//! order the reps were given. Strategies drop the errors and rank what is
//! left with [`rank`], which shuffles before a stable ascending sort so a
//! tie is never won by position in the input.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::RepResult;
use crate::types::{InstanceId, RepId};

/// Anything that carries a fitness score (lower is better).
pub trait Scored {
    fn score(&self) -> f64;
}

/// A successful start bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub rep_id: RepId,
    pub score: f64,
}

impl Scored for Bid {
    fn score(&self) -> f64 {
        self.score
    }
}

/// A successful stop bid: the rep's score plus the instances it holds at
/// the requested index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopBid {
    pub rep_id: RepId,
    pub score: f64,
    pub instance_ids: Vec<InstanceId>,
}

impl Scored for StopBid {
    fn score(&self) -> f64 {
        self.score
    }
}

/// One rep's answer to a score or reserve request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub rep_id: RepId,
    pub result: RepResult<f64>,
}

impl ScoreResult {
    pub fn ok(rep_id: impl Into<RepId>, score: f64) -> Self {
        Self {
            rep_id: rep_id.into(),
            result: Ok(score),
        }
    }
}

/// One rep's answer to a stop-score request.
#[derive(Debug, Clone, PartialEq)]
pub struct StopScoreResult {
    pub rep_id: RepId,
    pub result: RepResult<(f64, Vec<InstanceId>)>,
}

/// Ordered batch of [`ScoreResult`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreResults(pub Vec<ScoreResult>);

impl ScoreResults {
    /// True when no rep produced a score (including the empty batch).
    pub fn all_failed(&self) -> bool {
        self.0.iter().all(|r| r.result.is_err())
    }

    /// Successful bids, errors dropped, input order kept.
    pub fn successes(&self) -> Vec<Bid> {
        self.0
            .iter()
            .filter_map(|r| match &r.result {
                Ok(score) => Some(Bid {
                    rep_id: r.rep_id.clone(),
                    score: *score,
                }),
                Err(_) => None,
            })
            .collect()
    }

    /// Reps that failed for a reason other than capacity.
    pub fn unreachable(&self) -> usize {
        self.0
            .iter()
            .filter(|r| matches!(&r.result, Err(e) if !e.is_capacity()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreResult> {
        self.0.iter()
    }
}

impl From<Vec<ScoreResult>> for ScoreResults {
    fn from(results: Vec<ScoreResult>) -> Self {
        Self(results)
    }
}

/// Ordered batch of [`StopScoreResult`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopScoreResults(pub Vec<StopScoreResult>);

impl StopScoreResults {
    pub fn all_failed(&self) -> bool {
        self.0.iter().all(|r| r.result.is_err())
    }

    pub fn successes(&self) -> Vec<StopBid> {
        self.0
            .iter()
            .filter_map(|r| match &r.result {
                Ok((score, instance_ids)) => Some(StopBid {
                    rep_id: r.rep_id.clone(),
                    score: *score,
                    instance_ids: instance_ids.clone(),
                }),
                Err(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<StopScoreResult>> for StopScoreResults {
    fn from(results: Vec<StopScoreResult>) -> Self {
        Self(results)
    }
}

/// Shuffle, then stable-sort ascending by score. Best bid first.
pub fn rank<T: Scored, R: Rng + ?Sized>(mut bids: Vec<T>, rng: &mut R) -> Vec<T> {
    bids.shuffle(rng);
    bids.sort_by(|a, b| a.score().total_cmp(&b.score()));
    bids
}
