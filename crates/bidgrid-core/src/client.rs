//! The rep pool client contract.
//!
//! Auction strategies only ever talk to reps through a [`RepPoolClient`].
//! Whether the reps live in-process or behind a network transport is the
//! implementor's business; the contract is the same:
//!
//! - batch calls return one result per rep, in the order the reps were given
//! - a rep that cannot answer (timeout, transport failure) yields an error
//!   entry, never a hang and never a missing entry
//! - `run`, `release_reservation` and `stop` are fire-and-forget; the
//!   implementor logs their failures

use std::future::Future;

use crate::bids::{ScoreResults, StopScoreResults};
use crate::error::RepResult;
use crate::types::{RepId, RepSnapshot, SimulatedInstance, StartRequest, StopRequest};

/// Request/response surface over a set of reps.
pub trait RepPoolClient: Send + Sync {
    /// Ask each rep for its fitness score for `request`. No mutation.
    fn score(
        &self,
        rep_ids: &[RepId],
        request: &StartRequest,
    ) -> impl Future<Output = ScoreResults> + Send;

    /// Ask each rep to score and, if it can host `request`, tentatively
    /// reserve the capacity.
    fn score_then_tentatively_reserve(
        &self,
        rep_ids: &[RepId],
        request: &StartRequest,
    ) -> impl Future<Output = ScoreResults> + Send;

    /// Commit `request` on the rep holding its reservation.
    fn run(&self, rep_id: &str, request: &StartRequest) -> impl Future<Output = ()> + Send;

    /// Undo tentative reservations made for `request`.
    fn release_reservation(
        &self,
        rep_ids: &[RepId],
        request: &StartRequest,
    ) -> impl Future<Output = ()> + Send;

    /// Ask each rep for its score and the instances it holds at the
    /// requested workload/index.
    fn stop_score(
        &self,
        rep_ids: &[RepId],
        request: &StopRequest,
    ) -> impl Future<Output = StopScoreResults> + Send;

    /// Stop a running instance on a rep.
    fn stop(&self, rep_id: &str, instance_id: &str) -> impl Future<Output = ()> + Send;
}

/// Simulation controls layered over a pool client.
pub trait SimulationPoolClient: RepPoolClient {
    /// Resource and instance snapshot for each rep that can produce one.
    fn snapshots(&self, rep_ids: &[RepId]) -> impl Future<Output = Vec<RepSnapshot>> + Send;

    /// Drop every simulated instance and reservation on the given reps.
    fn reset(&self, rep_ids: &[RepId]) -> impl Future<Output = RepResult<()>> + Send;

    /// Replace one rep's instances.
    fn set_simulated_instances(
        &self,
        rep_id: &str,
        instances: Vec<SimulatedInstance>,
    ) -> impl Future<Output = RepResult<()>> + Send;

    /// Instances currently committed on a rep.
    fn simulated_instances(
        &self,
        rep_id: &str,
    ) -> impl Future<Output = RepResult<Vec<SimulatedInstance>>> + Send;
}

