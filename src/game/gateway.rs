//! State Gateway
//!
//! Query/command surface consumed by the boundary layer. Each operation is a
//! single critical section on the shared state, so every answer is
//! consistent with some serialization of clock ticks and analysis updates.

use thiserror::Error;
use tracing::info;

use super::state::{GameSnapshot, SharedReferee};
use crate::config::defaults::MAX_THRESHOLD_AREA;
use crate::types::Mode;

/// Rejections returned to callers. None of these affect the running game.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid mode '{0}': expected GREEN or RED")]
    InvalidMode(String),

    #[error("invalid threshold {0}: expected 1..={max}", max = MAX_THRESHOLD_AREA)]
    InvalidThreshold(i64),
}

/// Command and query entry points over a [`SharedReferee`].
#[derive(Debug, Clone)]
pub struct StateGateway {
    referee: SharedReferee,
}

impl StateGateway {
    pub fn new(referee: SharedReferee) -> Self {
        Self { referee }
    }

    pub fn referee(&self) -> &SharedReferee {
        &self.referee
    }

    /// Report the game and clear the penalty flash in the same critical
    /// section, so each penalty is delivered to at most one poll.
    pub fn get_state(&self) -> GameSnapshot {
        self.referee
            .with_state(|state, rules| state.take_snapshot(&rules.clock))
    }

    /// Force GREEN or RED. Re-requesting the current mode changes nothing,
    /// and neither does any request while a terminal GAME_OVER is in force.
    pub fn set_mode(&self, requested: &str) -> Result<GameSnapshot, GatewayError> {
        let mode = requested
            .parse::<Mode>()
            .ok()
            .filter(|m| matches!(m, Mode::Green | Mode::Red))
            .ok_or_else(|| GatewayError::InvalidMode(requested.to_string()))?;

        let (transition, snapshot) = self.referee.with_state(|state, rules| {
            let locked = state.mode() == Mode::GameOver && rules.clock.game_over_is_terminal();
            let transition = if locked || state.mode() == mode {
                None
            } else {
                state.enter(mode, &rules.clock)
            };
            (transition, state.snapshot(&rules.clock))
        });
        if let Some(t) = transition {
            info!(from = %t.from, to = %t.to, "SetMode");
        }
        Ok(snapshot)
    }

    /// Begin a round: GREEN, fresh timers, no penalties.
    pub fn start(&self) -> GameSnapshot {
        let snapshot = self.referee.with_state(|state, rules| {
            state.start(&rules.clock);
            state.snapshot(&rules.clock)
        });
        info!(total = snapshot.total_time_remaining, "Game started");
        snapshot
    }

    /// Force GAME_OVER.
    pub fn end(&self) -> GameSnapshot {
        let snapshot = self.referee.with_state(|state, rules| {
            state.enter(Mode::GameOver, &rules.clock);
            state.snapshot(&rules.clock)
        });
        info!("Game ended by command");
        snapshot
    }

    /// Reset every game field to its process-start value. The live motion
    /// threshold is tuning, not game progress, and is carried over.
    pub fn restart(&self) -> GameSnapshot {
        let snapshot = self.referee.with_state(|state, rules| {
            let threshold = state.motion_threshold();
            *state = super::state::RefereeState::initial(&rules.clock, threshold);
            state.snapshot(&rules.clock)
        });
        info!(mode = %snapshot.mode, "Game restarted");
        snapshot
    }

    /// Change the motion area threshold used from the next analysed frame on.
    pub fn set_threshold(&self, threshold: i64) -> Result<GameSnapshot, GatewayError> {
        let value = u32::try_from(threshold)
            .ok()
            .filter(|t| (1..=MAX_THRESHOLD_AREA).contains(t))
            .ok_or(GatewayError::InvalidThreshold(threshold))?;

        let snapshot = self.referee.with_state(|state, rules| {
            state.motion_threshold = value;
            state.snapshot(&rules.clock)
        });
        info!(threshold = value, "Motion threshold updated");
        Ok(snapshot)
    }
}
