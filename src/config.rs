use std::env;
use std::path::{Path, PathBuf};

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

const LOB_PRICE0: &str = "LOB_PRICE0";
const LOB_STEPS: &str = "LOB_STEPS";
const LOB_P_LIMIT: &str = "LOB_P_LIMIT";
const LOB_P_SELL: &str = "LOB_P_SELL";
const LOB_MAX_QUANTITY: &str = "LOB_MAX_QUANTITY";
const LOB_MAX_DELTA_PRICE: &str = "LOB_MAX_DELTA_PRICE";
const LOB_SEED: &str = "LOB_SEED";
const LOB_VERBOSE: &str = "LOB_VERBOSE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse environment variable {name}={value}")]
    InvalidVar { name: &'static str, value: String },

    #[error("{name} out of range: {reason}")]
    OutOfRange { name: &'static str, reason: String },
}

/// Parameters of a Maslov order-flow simulation.
///
/// Loaded in layers: defaults, then an optional JSON file, then `LOB_*`
/// environment variables (a `.env` file is honoured), then CLI flags applied
/// by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Reference price used until the first trade
    pub price0: i64,
    /// Number of orders to generate
    pub steps: u64,
    /// Probability that an order is a limit order
    pub p_limit: f64,
    /// Probability that an order is a sell
    pub p_sell: f64,
    /// Largest order size
    pub max_quantity: u64,
    /// Largest distance of a limit price from the reference price
    pub max_delta_price: u64,
    /// RNG seed; random when absent
    pub seed: Option<u64>,
    /// Log cancelled orders
    pub verbose: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            price0: 100,
            steps: 1000,
            p_limit: 0.5,
            p_sell: 0.5,
            max_quantity: 10,
            max_delta_price: 5,
            seed: None,
            verbose: false,
        }
    }
}

impl SimulationConfig {
    /// Loads a config from a JSON file; missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(file).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overridden by the process environment.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Applies `LOB_*` variables from the process environment on top of `self`.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        // Load .env file
        dotenv().ok();
        self.with_vars(|name| env::var(name).ok())
    }

    /// Applies variables from `lookup` on top of `self`.
    pub fn with_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parse_var(&lookup, LOB_PRICE0)? {
            self.price0 = value;
        }
        if let Some(value) = parse_var(&lookup, LOB_STEPS)? {
            self.steps = value;
        }
        if let Some(value) = parse_var(&lookup, LOB_P_LIMIT)? {
            self.p_limit = value;
        }
        if let Some(value) = parse_var(&lookup, LOB_P_SELL)? {
            self.p_sell = value;
        }
        if let Some(value) = parse_var(&lookup, LOB_MAX_QUANTITY)? {
            self.max_quantity = value;
        }
        if let Some(value) = parse_var(&lookup, LOB_MAX_DELTA_PRICE)? {
            self.max_delta_price = value;
        }
        if let Some(value) = parse_var(&lookup, LOB_SEED)? {
            self.seed = Some(value);
        }
        if let Some(value) = parse_var(&lookup, LOB_VERBOSE)? {
            self.verbose = value;
        }
        info!("Simulation config: {:?}", self);
        Ok(self)
    }

    /// Checks that every parameter is usable by the generator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.p_limit) {
            return Err(ConfigError::OutOfRange {
                name: "p_limit",
                reason: format!("{} is not a probability", self.p_limit),
            });
        }
        if !(0.0..=1.0).contains(&self.p_sell) {
            return Err(ConfigError::OutOfRange {
                name: "p_sell",
                reason: format!("{} is not a probability", self.p_sell),
            });
        }
        if self.max_quantity < 1 {
            return Err(ConfigError::OutOfRange {
                name: "max_quantity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_quantity > i64::MAX as u64 {
            return Err(ConfigError::OutOfRange {
                name: "max_quantity",
                reason: format!("must not exceed {}", i64::MAX),
            });
        }
        if self.max_delta_price < 1 {
            return Err(ConfigError::OutOfRange {
                name: "max_delta_price",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_delta_price > i64::MAX as u64 {
            return Err(ConfigError::OutOfRange {
                name: "max_delta_price",
                reason: format!("must not exceed {}", i64::MAX),
            });
        }
        if self.steps < 1 {
            return Err(ConfigError::OutOfRange {
                name: "steps",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
    }
}
