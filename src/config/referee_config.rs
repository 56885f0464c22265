//! Referee Configuration - every tunable as an operator-editable TOML value
//!
//! Each section implements `Default` with the shipped constants from
//! [`defaults`](super::defaults), so a missing file or a partial file always
//! yields a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults::{
    DEFAULT_BLUR_KERNEL, DEFAULT_DIFF_CUTOFF, DEFAULT_DILATE_ITERATIONS, DEFAULT_FRAME_HEIGHT,
    DEFAULT_FRAME_WIDTH, DEFAULT_GAME_OVER_COOLDOWN_SECS, DEFAULT_GREEN_SECS, DEFAULT_INTERVAL_SECS,
    DEFAULT_PENALTY_COOLDOWN_MS, DEFAULT_PENALTY_DEDUCT_SECS, DEFAULT_PLACEHOLDER_FPS,
    DEFAULT_RED_SECS, DEFAULT_SERVER_ADDR, DEFAULT_THRESHOLD_AREA, DEFAULT_TOTAL_SECS,
};
use crate::game::{ClockPolicy, DebounceMode, GameOverPolicy, GameRules, PenaltyAction, PenaltyRules};
use crate::motion::MotionParams;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "REFEREE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "referee.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one referee deployment.
///
/// Load with [`RefereeConfig::load()`] which searches:
/// 1. `$REFEREE_CONFIG` env var
/// 2. `./referee.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefereeConfig {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub penalty: PenaltyConfig,

    #[serde(default)]
    pub placeholder: PlaceholderConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl RefereeConfig {
    /// Load configuration using the standard search order. Failures fall
    /// through to the next candidate with a warning.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), policy = ?config.clock.policy, "Loaded referee config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(policy = ?config.clock.policy, "Loaded referee config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate TOML text, logging unknown-key warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate cross-field requirements and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let c = &self.clock;
        match c.policy {
            ClockPolicyKind::FixedDuration => {
                if c.green_secs == 0 || c.red_secs == 0 {
                    errors.push(format!(
                        "clock.green_secs ({}) and clock.red_secs ({}) must be > 0 for fixed_duration",
                        c.green_secs, c.red_secs
                    ));
                }
                match c.game_over {
                    None => errors.push(
                        "clock.game_over must be set to \"terminal\" or \"auto_restart\" when policy = \"fixed_duration\""
                            .to_string(),
                    ),
                    Some(GameOverSetting::AutoRestart) if c.cooldown_secs == 0 => {
                        errors.push("clock.cooldown_secs must be > 0 for auto_restart".to_string());
                    }
                    Some(_) => {}
                }
            }
            ClockPolicyKind::Budgeted => {
                if c.total_secs == 0 || c.interval_secs == 0 {
                    errors.push(format!(
                        "clock.total_secs ({}) and clock.interval_secs ({}) must be > 0 for budgeted",
                        c.total_secs, c.interval_secs
                    ));
                }
            }
            ClockPolicyKind::ClientDriven => {}
        }

        if self.penalty.action == PenaltyActionKind::Deduct && self.penalty.deduct_secs == 0 {
            errors.push("penalty.deduct_secs must be > 0 when action = \"deduct\"".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Resolved clock strategy. Call after [`validate`](Self::validate); an
    /// unset fixed-duration `game_over` is reported as a validation error.
    pub fn clock_policy(&self) -> Result<ClockPolicy, ConfigError> {
        let c = &self.clock;
        Ok(match c.policy {
            ClockPolicyKind::FixedDuration => {
                let game_over = match c.game_over {
                    Some(GameOverSetting::Terminal) => GameOverPolicy::Terminal,
                    Some(GameOverSetting::AutoRestart) => GameOverPolicy::AutoRestart {
                        cooldown_secs: c.cooldown_secs,
                    },
                    None => {
                        return Err(ConfigError::Validation(vec![
                            "clock.game_over is required for fixed_duration".to_string(),
                        ]))
                    }
                };
                ClockPolicy::FixedDuration {
                    green_secs: c.green_secs,
                    red_secs: c.red_secs,
                    game_over,
                }
            }
            ClockPolicyKind::Budgeted => ClockPolicy::Budgeted {
                total_secs: c.total_secs,
                interval_secs: c.interval_secs,
            },
            ClockPolicyKind::ClientDriven => ClockPolicy::ClientDriven,
        })
    }

    pub fn penalty_rules(&self) -> PenaltyRules {
        let p = &self.penalty;
        PenaltyRules {
            cooldown: Duration::from_millis(p.cooldown_ms),
            debounce: p.debounce,
            action: match p.action {
                PenaltyActionKind::Flash => PenaltyAction::Flash,
                PenaltyActionKind::Deduct => PenaltyAction::Deduct {
                    secs: p.deduct_secs,
                },
                PenaltyActionKind::Eliminate => PenaltyAction::Eliminate,
            },
        }
    }

    pub fn game_rules(&self) -> Result<GameRules, ConfigError> {
        Ok(GameRules {
            clock: self.clock_policy()?,
            penalty: self.penalty_rules(),
        })
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            blur_kernel: self.motion.blur_kernel,
            diff_cutoff: self.motion.diff_cutoff,
            dilate_iterations: self.motion.dilate_iterations,
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Camera
// ============================================================================

/// Frame source selection. Device enumeration is left to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: u32,

    /// Backend hint passed through to the camera backend (e.g. "v4l2")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_hint: Option<String>,

    /// Frame width for raw sources
    #[serde(default = "default_frame_width")]
    pub width: usize,

    /// Frame height for raw sources
    #[serde(default = "default_frame_height")]
    pub height: usize,
}

fn default_frame_width() -> usize { DEFAULT_FRAME_WIDTH }
fn default_frame_height() -> usize { DEFAULT_FRAME_HEIGHT }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            backend_hint: None,
            width: default_frame_width(),
            height: default_frame_height(),
        }
    }
}

// ============================================================================
// Motion
// ============================================================================

/// Motion classifier tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Component area (pixels) above which motion is declared
    #[serde(default = "default_threshold_area")]
    pub threshold_area: u32,

    /// Gaussian kernel size, odd
    #[serde(default = "default_blur_kernel")]
    pub blur_kernel: usize,

    /// Binarization cutoff on the absolute difference (0-255)
    #[serde(default = "default_diff_cutoff")]
    pub diff_cutoff: u8,

    /// 3×3 dilation passes
    #[serde(default = "default_dilate_iterations")]
    pub dilate_iterations: usize,
}

fn default_threshold_area() -> u32 { DEFAULT_THRESHOLD_AREA }
fn default_blur_kernel() -> usize { DEFAULT_BLUR_KERNEL }
fn default_diff_cutoff() -> u8 { DEFAULT_DIFF_CUTOFF }
fn default_dilate_iterations() -> usize { DEFAULT_DILATE_ITERATIONS }

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold_area: default_threshold_area(),
            blur_kernel: default_blur_kernel(),
            diff_cutoff: default_diff_cutoff(),
            dilate_iterations: default_dilate_iterations(),
        }
    }
}

// ============================================================================
// Clock
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockPolicyKind {
    FixedDuration,
    #[default]
    Budgeted,
    ClientDriven,
}

/// GAME_OVER handling for the fixed-duration policy. Deliberately has no
/// default: the operator must choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverSetting {
    Terminal,
    AutoRestart,
}

/// Clock policy selection and durations (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default)]
    pub policy: ClockPolicyKind,

    #[serde(default = "default_green_secs")]
    pub green_secs: u32,

    #[serde(default = "default_red_secs")]
    pub red_secs: u32,

    /// Required when `policy = "fixed_duration"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over: Option<GameOverSetting>,

    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u32,

    #[serde(default = "default_total_secs")]
    pub total_secs: u32,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u32,
}

fn default_green_secs() -> u32 { DEFAULT_GREEN_SECS }
fn default_red_secs() -> u32 { DEFAULT_RED_SECS }
fn default_cooldown_secs() -> u32 { DEFAULT_GAME_OVER_COOLDOWN_SECS }
fn default_total_secs() -> u32 { DEFAULT_TOTAL_SECS }
fn default_interval_secs() -> u32 { DEFAULT_INTERVAL_SECS }

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            policy: ClockPolicyKind::default(),
            green_secs: default_green_secs(),
            red_secs: default_red_secs(),
            game_over: None,
            cooldown_secs: default_cooldown_secs(),
            total_secs: default_total_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

// ============================================================================
// Penalty
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyActionKind {
    #[default]
    Flash,
    Deduct,
    Eliminate,
}

/// Penalty acceptance and effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyConfig {
    /// Debounce window between accepted penalties
    #[serde(default = "default_penalty_cooldown_ms")]
    pub cooldown_ms: u64,

    #[serde(default)]
    pub debounce: DebounceMode,

    #[serde(default)]
    pub action: PenaltyActionKind,

    /// Seconds removed per penalty when `action = "deduct"`
    #[serde(default = "default_deduct_secs")]
    pub deduct_secs: u32,
}

fn default_penalty_cooldown_ms() -> u64 { DEFAULT_PENALTY_COOLDOWN_MS }
fn default_deduct_secs() -> u32 { DEFAULT_PENALTY_DEDUCT_SECS }

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_penalty_cooldown_ms(),
            debounce: DebounceMode::default(),
            action: PenaltyActionKind::default(),
            deduct_secs: default_deduct_secs(),
        }
    }
}

// ============================================================================
// Placeholder Stream
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderConfig {
    /// Frames per second while the camera is unavailable
    #[serde(default = "default_placeholder_fps")]
    pub fps: u32,
}

fn default_placeholder_fps() -> u32 { DEFAULT_PLACEHOLDER_FPS }

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            fps: default_placeholder_fps(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `REFEREE_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    DEFAULT_SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
