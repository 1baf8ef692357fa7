//! Simulation configuration (`bidgrid.toml`).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AuctionRules, Resources};

/// Which auction algorithm places start requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    PickBest,
    #[default]
    ReserveNBest,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::PickBest => "pick-best",
            StrategyKind::ReserveNBest => "reserve-n-best",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pick-best" | "pick_best" => Ok(StrategyKind::PickBest),
            "reserve-n-best" | "reserve_n_best" => Ok(StrategyKind::ReserveNBest),
            other => Err(ConfigError::Invalid(format!("unknown strategy: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub auction: AuctionConfig,
    pub reps: RepsConfig,
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    pub strategy: StrategyKind,
    pub max_rounds: u32,
    pub bidding_pool_fraction: f64,
    pub max_concurrent: usize,
    /// How many of the best bidders `reserve-n-best` reserves each round.
    pub reserve_top_n: usize,
    /// Per-call deadline for a rep before it is counted as failed.
    pub rep_timeout_ms: u64,
    pub seed: Option<u64>,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        let rules = AuctionRules::default();
        Self {
            strategy: StrategyKind::default(),
            max_rounds: rules.max_rounds,
            bidding_pool_fraction: rules.bidding_pool_fraction,
            max_concurrent: 20,
            reserve_top_n: 5,
            rep_timeout_ms: 500,
            seed: None,
        }
    }
}

impl AuctionConfig {
    pub fn rules(&self) -> AuctionRules {
        AuctionRules {
            max_rounds: self.max_rounds,
            bidding_pool_fraction: self.bidding_pool_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepsConfig {
    pub count: usize,
    pub memory_mb: u64,
    pub disk_mb: u64,
    pub containers: u32,
    /// Simulated per-call latency.
    pub latency_ms: u64,
}

impl Default for RepsConfig {
    fn default() -> Self {
        Self {
            count: 100,
            memory_mb: 1024,
            disk_mb: 1024,
            containers: 64,
            latency_ms: 0,
        }
    }
}

impl RepsConfig {
    pub fn capacity(&self) -> Resources {
        Resources::new(self.memory_mb, self.disk_mb, self.containers)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub apps: usize,
    pub instances_per_app: u32,
    pub memory_mb: u64,
    pub disk_mb: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            apps: 10,
            instances_per_app: 10,
            memory_mb: 64,
            disk_mb: 64,
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.auction.rules().validate().map_err(ConfigError::Invalid)?;

        if self.auction.max_concurrent == 0 {
            return Err(ConfigError::Invalid("max_concurrent must be at least 1".into()));
        }
        if self.auction.reserve_top_n == 0 {
            return Err(ConfigError::Invalid("reserve_top_n must be at least 1".into()));
        }
        if self.reps.count == 0 {
            return Err(ConfigError::Invalid("reps.count must be at least 1".into()));
        }
        let capacity = self.reps.capacity();
        if capacity.memory_mb == 0 || capacity.disk_mb == 0 || capacity.containers == 0 {
            return Err(ConfigError::Invalid(
                "rep memory, disk and containers must all be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.auction.strategy, StrategyKind::ReserveNBest);
        assert_eq!(config.auction.max_rounds, 100);
    }

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
[auction]
strategy = "pick-best"
max_rounds = 5
bidding_pool_fraction = 0.5
seed = 17

[reps]
count = 3
containers = 4
"#;
        let config = SimulationConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.auction.strategy, StrategyKind::PickBest);
        assert_eq!(config.auction.rules().max_rounds, 5);
        assert_eq!(config.auction.seed, Some(17));
        assert_eq!(config.reps.count, 3);
        assert_eq!(config.reps.capacity().containers, 4);
        assert_eq!(config.reps.memory_mb, 1024);
    }

    #[test]
    fn rejects_bad_fraction() {
        let err = SimulationConfig::from_toml_str("[auction]\nbidding_pool_fraction = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut config = SimulationConfig::default();
        config.auction.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_strategy() {
        let err = SimulationConfig::from_toml_str("[auction]\nstrategy = \"first-fit\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!("first-fit".parse::<StrategyKind>().is_err());
        assert_eq!("pick_best".parse::<StrategyKind>().unwrap(), StrategyKind::PickBest);
    }

    #[test]
    fn toml_roundtrip_through_file() {
        let mut config = SimulationConfig::default();
        config.auction.seed = Some(99);
        config.reps.count = 7;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bidgrid.toml");
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        let loaded = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/bidgrid.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
