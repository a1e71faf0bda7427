// For reading and storing the configuration file info. Game parameters
// (stacks, blinds, bucket counts) are constants in trainer_utils and
// card_abstraction, not configuration.

use crate::error::{SolverError, SolverResult};
use crate::trainer_utils::HistoryAbstraction;
use serde::{Deserialize, Serialize};
use std::fs;

pub const CONFIG_PATH: &str = "params.toml";
pub const DEFAULT_DEPTH_CAP: u32 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Training
    pub train_iters: u64,
    pub report_every: u64,
    // Worker threads, 0 for one per core
    pub threads: usize,
    pub seed: Option<u64>,
    pub warm_start: bool,

    // Abstraction
    pub history_abstraction: HistoryAbstraction,
    pub depth_cap: u32,

    // File paths. Nodes are checkpointed after every epoch when set.
    pub nodes_path: Option<String>,
    pub blueprint_path: String,
    pub json_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            train_iters: 1_000_000,
            report_every: 10_000,
            threads: 0,
            seed: None,
            warm_start: false,
            history_abstraction: HistoryAbstraction::Sorted,
            depth_cap: DEFAULT_DEPTH_CAP,
            nodes_path: None,
            blueprint_path: "products/blueprint.bin".to_string(),
            json_path: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> SolverResult<Config> {
        let config_string = fs::read_to_string(path).map_err(|e| SolverError::io(path, e))?;
        Config::parse(&config_string)
    }

    pub fn parse(config_string: &str) -> SolverResult<Config> {
        Ok(toml::from_str(config_string)?)
    }
}
