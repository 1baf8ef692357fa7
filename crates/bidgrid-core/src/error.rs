//! Error types shared by reps, pool clients, and auction strategies.

use thiserror::Error;

/// Result type alias for rep and pool-client operations.
pub type RepResult<T> = Result<T, RepError>;

/// Errors a single rep (or the transport in front of it) can return.
///
/// These are always recovered inside an auction round: a rep that errors
/// simply drops out of that round's candidate set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepError {
    #[error("insufficient resources")]
    InsufficientResources,

    #[error("no running instance for {workload_id} at index {index}")]
    NotRunning { workload_id: String, index: u32 },

    #[error("reservation conflict: {0}")]
    ReservationConflict(String),

    #[error("no tentative reservation for instance {0}")]
    NoReservation(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("rep {0} does not support simulation controls")]
    SimulationUnsupported(String),

    #[error("unknown rep: {0}")]
    UnknownRep(String),

    #[error("rep {rep_id} timed out after {after_ms}ms")]
    Timeout { rep_id: String, after_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("delegate error: {0}")]
    Delegate(String),
}

impl RepError {
    /// Whether the error means the rep lost a race for capacity, as opposed
    /// to being unreachable or misconfigured.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            RepError::InsufficientResources | RepError::ReservationConflict(_)
        )
    }
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a simulation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
