//! Game Clock
//!
//! Three timing policies coexist as variants of [`ClockPolicy`], selected at
//! configuration time:
//!
//! - **Fixed-duration**: GREEN for G seconds, RED for R seconds, repeat.
//!   GAME_OVER is either terminal or restarts GREEN after a cooldown.
//! - **Budgeted**: one tick decrements both the session budget and the phase
//!   interval; an exhausted budget ends the game for good, an exhausted
//!   interval flips GREEN/RED.
//! - **Client-driven**: no autonomous timer at all; only gateway commands
//!   change the mode.
//!
//! The policy arithmetic is synchronous ([`ClockPolicy::advance`]); the
//! [`GameClock`] task only paces it at 1 Hz.

use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::state::{RefereeState, SharedReferee, Transition};
use crate::config::defaults::{CLOCK_TICK_SECS, DEFAULT_INTERVAL_SECS, DEFAULT_TOTAL_SECS};
use crate::types::Mode;

// ============================================================================
// Policies
// ============================================================================

/// What happens once a fixed-duration game reaches GAME_OVER.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverPolicy {
    /// Stay in GAME_OVER until Start/Restart
    Terminal,
    /// Count down `cooldown_secs`, then begin a new GREEN phase
    AutoRestart { cooldown_secs: u32 },
}

/// Selectable timing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPolicy {
    FixedDuration {
        green_secs: u32,
        red_secs: u32,
        game_over: GameOverPolicy,
    },
    Budgeted {
        total_secs: u32,
        interval_secs: u32,
    },
    ClientDriven,
}

impl Default for ClockPolicy {
    fn default() -> Self {
        ClockPolicy::Budgeted {
            total_secs: DEFAULT_TOTAL_SECS,
            interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl ClockPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ClockPolicy::FixedDuration { .. } => "fixed_duration",
            ClockPolicy::Budgeted { .. } => "budgeted",
            ClockPolicy::ClientDriven => "client_driven",
        }
    }

    /// Whether a background timer drives this policy.
    pub fn is_timed(&self) -> bool {
        !matches!(self, ClockPolicy::ClientDriven)
    }

    /// Whether GAME_OVER holds until an explicit Start or Restart.
    pub fn game_over_is_terminal(&self) -> bool {
        matches!(
            self,
            ClockPolicy::Budgeted { .. }
                | ClockPolicy::FixedDuration {
                    game_over: GameOverPolicy::Terminal,
                    ..
                }
        )
    }

    /// Mode at process start and after Restart.
    pub fn initial_mode(&self) -> Mode {
        match self {
            ClockPolicy::FixedDuration { .. } => Mode::Green,
            ClockPolicy::Budgeted { .. } | ClockPolicy::ClientDriven => Mode::Idle,
        }
    }

    /// Session budget loaded on Start/Restart (0 when the policy has none).
    pub fn total_budget(&self) -> u32 {
        match self {
            ClockPolicy::Budgeted { total_secs, .. } => *total_secs,
            _ => 0,
        }
    }

    /// Interval timer loaded when entering `mode`.
    pub fn phase_duration(&self, mode: Mode) -> u32 {
        match (self, mode) {
            (ClockPolicy::FixedDuration { green_secs, .. }, Mode::Green) => *green_secs,
            (ClockPolicy::FixedDuration { red_secs, .. }, Mode::Red) => *red_secs,
            (
                ClockPolicy::FixedDuration {
                    game_over: GameOverPolicy::AutoRestart { cooldown_secs },
                    ..
                },
                Mode::GameOver,
            ) => *cooldown_secs,
            (ClockPolicy::Budgeted { interval_secs, .. }, Mode::Green | Mode::Red) => *interval_secs,
            _ => 0,
        }
    }

    /// Apply one tick to `state`. Never fails; timers saturate at 0.
    pub fn advance(&self, state: &mut RefereeState) -> Option<Transition> {
        match *self {
            ClockPolicy::ClientDriven => None,
            ClockPolicy::FixedDuration { game_over, .. } => {
                let next = match (state.mode, game_over) {
                    (Mode::Idle, _) | (Mode::GameOver, GameOverPolicy::Terminal) => return None,
                    (Mode::Green, _) => Mode::Red,
                    (Mode::Red | Mode::GameOver, _) => Mode::Green,
                };
                state.interval_time_remaining = state.interval_time_remaining.saturating_sub(1);
                if state.interval_time_remaining == 0 {
                    state.enter(next, self)
                } else {
                    None
                }
            }
            ClockPolicy::Budgeted { .. } => {
                if !state.mode.is_playing() {
                    return None;
                }
                state.total_time_remaining = state.total_time_remaining.saturating_sub(1);
                state.interval_time_remaining = state.interval_time_remaining.saturating_sub(1);
                if state.total_time_remaining == 0 {
                    let transition = state.enter(Mode::GameOver, self);
                    state.interval_time_remaining = 0;
                    transition
                } else if state.interval_time_remaining == 0 {
                    let next = if state.mode == Mode::Green { Mode::Red } else { Mode::Green };
                    state.enter(next, self)
                } else {
                    None
                }
            }
        }
    }
}

// ============================================================================
// Clock Task
// ============================================================================

/// Counters reported when the clock task exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockStats {
    pub ticks: u64,
    pub transitions: u64,
}

/// Background task pacing [`ClockPolicy::advance`] at 1 Hz.
pub struct GameClock {
    referee: SharedReferee,
    cancel_token: CancellationToken,
    period: Duration,
}

impl GameClock {
    pub fn new(referee: SharedReferee, cancel_token: CancellationToken) -> Self {
        Self {
            referee,
            cancel_token,
            period: Duration::from_secs(CLOCK_TICK_SECS),
        }
    }

    /// Tick until process shutdown. Returns immediately for client-driven games.
    pub async fn run(self) -> ClockStats {
        let mut stats = ClockStats::default();
        let policy = self.referee.rules().clock;

        if !policy.is_timed() {
            info!("[GameClock] Client-driven policy: no autonomous timer");
            return stats;
        }

        info!("[GameClock] Running {} policy at {:?} per tick", policy.name(), self.period);

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the first
        // decrement lands one full period after start.
        interval.tick().await;

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("[GameClock] Shutdown after {} ticks", stats.ticks);
                    return stats;
                }
                _ = interval.tick() => {
                    stats.ticks += 1;
                    if let Some(transition) = self.referee.tick() {
                        stats.transitions += 1;
                        let snap = self.referee.peek();
                        info!(
                            from = %transition.from,
                            to = %transition.to,
                            interval = snap.interval_time_remaining,
                            total = snap.total_time_remaining,
                            "Phase change"
                        );
                    } else {
                        debug!("[GameClock] tick {}", stats.ticks);
                    }
                }
            }
        }
    }
}
