//! Referee Configuration Module
//!
//! Every tunable (clock policy, motion parameters, penalty rules, camera and
//! server settings) is loaded from TOML instead of being hardcoded.
//!
//! ## Loading Order
//!
//! 1. `REFEREE_CONFIG` environment variable (path to TOML file)
//! 2. `referee.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = RefereeConfig::load();
//! let rules = config.game_rules()?;
//! let params = config.motion_params();
//! ```

mod referee_config;
pub mod defaults;
pub mod validation;

pub use referee_config::*;
