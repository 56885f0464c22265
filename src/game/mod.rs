//! Game State Machine
//!
//! ```text
//!            ┌────────── GameClock (1 Hz) ──────────┐
//!            │                                      ▼
//! StateGateway ──► SharedReferee { Mutex<RefereeState> } ◄── FrameAnalysisLoop
//! ```
//!
//! All three actors serialize through the one mutex; none of them holds it
//! across a sleep, frame read, encode or network call.

pub mod clock;
pub mod gateway;
pub mod penalty;
pub mod state;

pub use clock::{ClockPolicy, ClockStats, GameClock, GameOverPolicy};
pub use gateway::{GatewayError, StateGateway};
pub use penalty::{DebounceMode, PenaltyAction, PenaltyOutcome, PenaltyRules};
pub use state::{GameRules, GameSnapshot, RefereeState, SharedReferee, Transition};
