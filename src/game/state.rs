//! Referee State and Locking Discipline
//!
//! One [`RefereeState`] record holds the phase, both timers and the penalty
//! bookkeeping. It lives behind a single `std::sync::Mutex` inside
//! [`SharedReferee`], which the clock task, the frame analysis loop and the
//! gateway all clone. Every access is a short critical section over plain
//! field reads and writes; nothing sleeps, reads frames, encodes or does
//! network I/O while holding the guard.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::warn;

use super::clock::ClockPolicy;
use super::penalty::{DebounceMode, PenaltyAction, PenaltyOutcome, PenaltyRules};
use crate::types::Mode;

// ============================================================================
// Referee State
// ============================================================================

/// The single mutable game record.
#[derive(Debug, Clone)]
pub struct RefereeState {
    pub(crate) mode: Mode,
    /// Session budget; only the budgeted policy uses it
    pub(crate) total_time_remaining: u32,
    /// Time left in the current phase (or GAME_OVER cooldown)
    pub(crate) interval_time_remaining: u32,
    /// Raised by an accepted penalty, cleared by the next GetState
    pub(crate) penalty_flash: bool,
    pub(crate) last_penalty_at: Option<Instant>,
    pub(crate) penalty_count: u32,
    /// Live area threshold for the motion classifier
    pub(crate) motion_threshold: u32,
}

/// A phase change produced by a tick or a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
}

impl RefereeState {
    /// State at process start and after Restart.
    pub fn initial(policy: &ClockPolicy, motion_threshold: u32) -> Self {
        let mode = policy.initial_mode();
        Self {
            mode,
            total_time_remaining: policy.total_budget(),
            interval_time_remaining: policy.phase_duration(mode),
            penalty_flash: false,
            last_penalty_at: None,
            penalty_count: 0,
            motion_threshold,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn total_time_remaining(&self) -> u32 {
        self.total_time_remaining
    }

    pub fn interval_time_remaining(&self) -> u32 {
        self.interval_time_remaining
    }

    pub fn penalty_flash(&self) -> bool {
        self.penalty_flash
    }

    pub fn penalty_count(&self) -> u32 {
        self.penalty_count
    }

    pub fn motion_threshold(&self) -> u32 {
        self.motion_threshold
    }

    /// Switch phase and load that phase's timer. Returns the transition if
    /// the mode actually changed.
    pub(crate) fn enter(&mut self, mode: Mode, policy: &ClockPolicy) -> Option<Transition> {
        let from = self.mode;
        self.mode = mode;
        self.interval_time_remaining = policy.phase_duration(mode);
        (from != mode).then_some(Transition { from, to: mode })
    }

    /// Begin a fresh round in GREEN with a full budget and no penalties.
    pub(crate) fn start(&mut self, policy: &ClockPolicy) -> Option<Transition> {
        self.total_time_remaining = policy.total_budget();
        self.clear_penalties();
        self.enter(Mode::Green, policy)
    }

    pub(crate) fn clear_penalties(&mut self) {
        self.penalty_flash = false;
        self.last_penalty_at = None;
        self.penalty_count = 0;
    }

    /// Offer a detected motion event as a penalty at time `now`.
    pub fn register_penalty(
        &mut self,
        now: Instant,
        rules: &PenaltyRules,
        policy: &ClockPolicy,
    ) -> PenaltyOutcome {
        if !self.mode.is_active() {
            return PenaltyOutcome::NotActive;
        }
        if let Some(last) = self.last_penalty_at {
            if now.saturating_duration_since(last) <= rules.cooldown {
                return PenaltyOutcome::Debounced;
            }
        }
        if rules.debounce == DebounceMode::TimeAndFlag && self.penalty_flash {
            return PenaltyOutcome::Debounced;
        }

        self.last_penalty_at = Some(now);
        self.penalty_flash = true;
        self.penalty_count = self.penalty_count.saturating_add(1);

        match rules.action {
            PenaltyAction::Flash => {}
            PenaltyAction::Deduct { secs } => {
                self.total_time_remaining = self.total_time_remaining.saturating_sub(secs);
            }
            PenaltyAction::Eliminate => {
                self.enter(Mode::GameOver, policy);
            }
        }

        PenaltyOutcome::Accepted {
            count: self.penalty_count,
        }
    }

    /// Copy out for display without touching the flash.
    pub fn snapshot(&self, policy: &ClockPolicy) -> GameSnapshot {
        GameSnapshot {
            mode: self.mode,
            total_time_remaining: self.total_time_remaining,
            interval_time_remaining: self.interval_time_remaining,
            penalty_flash: self.penalty_flash,
            penalty_count: self.penalty_count,
            motion_threshold: self.motion_threshold,
            policy: policy.name().to_string(),
        }
    }

    /// Copy out and clear the flash in the same critical section.
    pub fn take_snapshot(&mut self, policy: &ClockPolicy) -> GameSnapshot {
        let snapshot = self.snapshot(policy);
        self.penalty_flash = false;
        snapshot
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Point-in-time copy of the game record, as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub mode: Mode,
    pub total_time_remaining: u32,
    pub interval_time_remaining: u32,
    pub penalty_flash: bool,
    pub penalty_count: u32,
    pub motion_threshold: u32,
    /// Active clock policy name
    pub policy: String,
}

// ============================================================================
// Shared Handle
// ============================================================================

/// Immutable rules the state is interpreted under.
#[derive(Debug, Clone, Default)]
pub struct GameRules {
    pub clock: ClockPolicy,
    pub penalty: PenaltyRules,
}

/// Cloneable handle to the lock-guarded state.
#[derive(Debug, Clone)]
pub struct SharedReferee {
    state: Arc<Mutex<RefereeState>>,
    rules: Arc<GameRules>,
}

impl SharedReferee {
    pub fn new(rules: GameRules, motion_threshold: u32) -> Self {
        let state = RefereeState::initial(&rules.clock, motion_threshold);
        Self {
            state: Arc::new(Mutex::new(state)),
            rules: Arc::new(rules),
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Acquire the state lock, recovering from poisoning.
    ///
    /// All mutations are single field assignments, so a panicking holder
    /// cannot leave the record half-updated in a way later readers care about.
    fn lock(&self) -> MutexGuard<'_, RefereeState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Referee state mutex poisoned, recovering");
            e.into_inner()
        })
    }

    /// Run `f` inside the critical section.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RefereeState, &GameRules) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard, &self.rules)
    }

    /// Advance the clock by one tick.
    pub fn tick(&self) -> Option<Transition> {
        self.with_state(|state, rules| rules.clock.advance(state))
    }

    /// Non-clearing snapshot for overlays and logs.
    pub fn peek(&self) -> GameSnapshot {
        self.with_state(|state, rules| state.snapshot(&rules.clock))
    }

    /// Current mode and threshold, read together for one analysed frame.
    pub fn frame_context(&self) -> (Mode, u32) {
        self.with_state(|state, _| (state.mode, state.motion_threshold))
    }

    /// Offer a motion event observed at `now`.
    pub fn register_penalty(&self, now: Instant) -> PenaltyOutcome {
        self.with_state(|state, rules| state.register_penalty(now, &rules.penalty, &rules.clock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::clock::GameOverPolicy;
    use std::time::Duration;

    fn budgeted() -> ClockPolicy {
        ClockPolicy::Budgeted {
            total_secs: 60,
            interval_secs: 5,
        }
    }

    fn red_state(policy: &ClockPolicy) -> RefereeState {
        let mut state = RefereeState::initial(policy, 5000);
        state.start(policy);
        state.enter(Mode::Red, policy);
        state
    }

    #[test]
    fn test_initial_state_per_policy() {
        let fixed = ClockPolicy::FixedDuration {
            green_secs: 5,
            red_secs: 4,
            game_over: GameOverPolicy::Terminal,
        };
        let state = RefereeState::initial(&fixed, 5000);
        assert_eq!(state.mode(), Mode::Green);
        assert_eq!(state.interval_time_remaining(), 5);

        let state = RefereeState::initial(&budgeted(), 5000);
        assert_eq!(state.mode(), Mode::Idle);
        assert_eq!(state.total_time_remaining(), 60);
        assert_eq!(state.interval_time_remaining(), 0);

        let state = RefereeState::initial(&ClockPolicy::ClientDriven, 5000);
        assert_eq!(state.mode(), Mode::Idle);
    }

    #[test]
    fn test_penalty_ignored_outside_red() {
        let policy = budgeted();
        let mut state = RefereeState::initial(&policy, 5000);
        state.start(&policy);
        let outcome = state.register_penalty(Instant::now(), &PenaltyRules::default(), &policy);
        assert_eq!(outcome, PenaltyOutcome::NotActive);
        assert!(!state.penalty_flash());
    }

    #[test]
    fn test_debounce_time_only() {
        let policy = budgeted();
        let rules = PenaltyRules::default();
        let mut state = red_state(&policy);
        let t0 = Instant::now();

        assert!(state.register_penalty(t0, &rules, &policy).is_accepted());
        let second = state.register_penalty(t0 + Duration::from_millis(200), &rules, &policy);
        assert_eq!(second, PenaltyOutcome::Debounced);
        // Exactly the cooldown is still inside the window
        let third = state.register_penalty(t0 + Duration::from_millis(1000), &rules, &policy);
        assert_eq!(third, PenaltyOutcome::Debounced);
        let fourth = state.register_penalty(t0 + Duration::from_millis(1001), &rules, &policy);
        assert_eq!(fourth, PenaltyOutcome::Accepted { count: 2 });
    }

    #[test]
    fn test_debounce_time_and_flag_waits_for_read() {
        let policy = budgeted();
        let rules = PenaltyRules {
            debounce: DebounceMode::TimeAndFlag,
            ..PenaltyRules::default()
        };
        let mut state = red_state(&policy);
        let t0 = Instant::now();

        assert!(state.register_penalty(t0, &rules, &policy).is_accepted());
        let later = t0 + Duration::from_secs(3);
        assert_eq!(state.register_penalty(later, &rules, &policy), PenaltyOutcome::Debounced);

        let snap = state.take_snapshot(&policy);
        assert!(snap.penalty_flash);
        assert!(state.register_penalty(later, &rules, &policy).is_accepted());
    }

    #[test]
    fn test_deduct_floors_at_zero() {
        let policy = budgeted();
        let rules = PenaltyRules {
            action: PenaltyAction::Deduct { secs: 45 },
            ..PenaltyRules::default()
        };
        let mut state = red_state(&policy);
        let t0 = Instant::now();
        state.register_penalty(t0, &rules, &policy);
        assert_eq!(state.total_time_remaining(), 15);
        state.register_penalty(t0 + Duration::from_secs(2), &rules, &policy);
        assert_eq!(state.total_time_remaining(), 0);
        // Deduction alone never changes the mode; the clock does that
        assert_eq!(state.mode(), Mode::Red);
    }

    #[test]
    fn test_eliminate_ends_game() {
        let policy = budgeted();
        let rules = PenaltyRules {
            action: PenaltyAction::Eliminate,
            ..PenaltyRules::default()
        };
        let mut state = red_state(&policy);
        state.register_penalty(Instant::now(), &rules, &policy);
        assert_eq!(state.mode(), Mode::GameOver);
        assert!(state.penalty_flash());
    }

    #[test]
    fn test_take_snapshot_clears_flash_once() {
        let policy = budgeted();
        let mut state = red_state(&policy);
        state.register_penalty(Instant::now(), &PenaltyRules::default(), &policy);

        assert!(state.snapshot(&policy).penalty_flash, "peek must not clear");
        assert!(state.take_snapshot(&policy).penalty_flash);
        assert!(!state.take_snapshot(&policy).penalty_flash);
        assert_eq!(state.penalty_count(), 1);
    }

    #[test]
    fn test_shared_referee_clones_share_state() {
        let referee = SharedReferee::new(
            GameRules {
                clock: budgeted(),
                penalty: PenaltyRules::default(),
            },
            5000,
        );
        let other = referee.clone();
        referee.with_state(|state, rules| state.start(&rules.clock));
        assert_eq!(other.peek().mode, Mode::Green);
        assert_eq!(other.frame_context(), (Mode::Green, 5000));
    }
}
