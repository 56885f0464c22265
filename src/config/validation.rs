//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;
use std::net::SocketAddr;

use super::defaults::MAX_THRESHOLD_AREA;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for RefereeConfig.
///
/// Maintained by hand against referee_config.rs; a new field needs an entry here.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [camera]
        "camera",
        "camera.device_index",
        "camera.backend_hint",
        "camera.width",
        "camera.height",
        // [motion]
        "motion",
        "motion.threshold_area",
        "motion.blur_kernel",
        "motion.diff_cutoff",
        "motion.dilate_iterations",
        // [clock]
        "clock",
        "clock.policy",
        "clock.green_secs",
        "clock.red_secs",
        "clock.game_over",
        "clock.cooldown_secs",
        "clock.total_secs",
        "clock.interval_secs",
        // [penalty]
        "penalty",
        "penalty.cooldown_ms",
        "penalty.debounce",
        "penalty.action",
        "penalty.deduct_secs",
        // [placeholder]
        "placeholder",
        "placeholder.fps",
        // [server]
        "server",
        "server.addr",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
/// Ties resolve to the lexicographically smaller key so output is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Only warns. Parse errors are left for serde to report.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed RefereeConfig.
///
/// Returns (errors, warnings). Errors are values the referee cannot run
/// with; warnings are legal but unlikely to be what the operator meant.
pub fn validate_ranges(config: &super::RefereeConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let m = &config.motion;
    if m.threshold_area == 0 || m.threshold_area > MAX_THRESHOLD_AREA {
        errors.push(format!(
            "motion.threshold_area = {} is outside 1..={MAX_THRESHOLD_AREA}",
            m.threshold_area
        ));
    }
    if m.blur_kernel == 0 {
        errors.push("motion.blur_kernel must be >= 1".to_string());
    } else if m.blur_kernel % 2 == 0 {
        warnings.push(ValidationWarning {
            field: "motion.blur_kernel".to_string(),
            message: format!(
                "motion.blur_kernel = {} is even; it will be widened to {}",
                m.blur_kernel,
                m.blur_kernel + 1
            ),
            suggestion: None,
        });
    }
    if m.diff_cutoff == u8::MAX {
        warnings.push(ValidationWarning {
            field: "motion.diff_cutoff".to_string(),
            message: "motion.diff_cutoff = 255 can never be exceeded; motion will never be detected"
                .to_string(),
            suggestion: None,
        });
    }

    let cam = &config.camera;
    if cam.width == 0 || cam.height == 0 {
        errors.push(format!(
            "camera.width x camera.height = {}x{} must both be > 0",
            cam.width, cam.height
        ));
    }

    if config.placeholder.fps == 0 || config.placeholder.fps > 120 {
        errors.push(format!(
            "placeholder.fps = {} is outside 1..=120",
            config.placeholder.fps
        ));
    }

    if config.penalty.cooldown_ms > 60_000 {
        warnings.push(ValidationWarning {
            field: "penalty.cooldown_ms".to_string(),
            message: format!(
                "penalty.cooldown_ms = {} is longer than a minute; most penalties will be debounced",
                config.penalty.cooldown_ms
            ),
            suggestion: None,
        });
    }

    if config.server.addr.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "server.addr = '{}' is not a valid socket address",
            config.server.addr
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
