//! Penalty policy: what an accepted motion violation does, and when a
//! violation is accepted at all.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::defaults::DEFAULT_PENALTY_COOLDOWN_MS;

/// Debounce discipline for consecutive penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceMode {
    /// Accept once the cooldown has elapsed since the last accepted penalty
    #[default]
    TimeOnly,
    /// Additionally require the previous flash to have been read by a client
    TimeAndFlag,
}

/// Effect of an accepted penalty. Every action raises the penalty flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenaltyAction {
    /// Raise the flash only
    #[default]
    Flash,
    /// Remove seconds from the total budget (floored at 0)
    Deduct { secs: u32 },
    /// End the game immediately
    Eliminate,
}

impl std::fmt::Display for PenaltyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PenaltyAction::Flash => write!(f, "flash"),
            PenaltyAction::Deduct { secs } => write!(f, "deduct {secs}s"),
            PenaltyAction::Eliminate => write!(f, "eliminate"),
        }
    }
}

/// Complete penalty configuration as seen by the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyRules {
    pub cooldown: Duration,
    pub debounce: DebounceMode,
    pub action: PenaltyAction,
}

impl Default for PenaltyRules {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(DEFAULT_PENALTY_COOLDOWN_MS),
            debounce: DebounceMode::TimeOnly,
            action: PenaltyAction::Flash,
        }
    }
}

/// Result of offering a penalty to the game state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenaltyOutcome {
    /// Recorded; carries the running penalty count
    Accepted { count: u32 },
    /// Inside the debounce window (or flash still unread)
    Debounced,
    /// The game is not in the active phase
    NotActive,
}

impl PenaltyOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, PenaltyOutcome::Accepted { .. })
    }
}
