//! Red Light Referee: freeze-when-red motion game referee
//!
//! ## Architecture
//!
//! - **Game** (`game`): lock-guarded referee state, the phase clock, penalty
//!   rules and the [`StateGateway`] command surface
//! - **Motion** (`motion`): blur, difference, dilate, connected components
//! - **Pipeline** (`pipeline`): frame sources, the analysis loop, overlay rendering
//! - **API** (`api`): axum routes over the gateway plus the frame feed
//! - **Config** (`config`): TOML configuration with validation

pub mod api;
pub mod config;
pub mod game;
pub mod motion;
pub mod pipeline;
pub mod types;

pub use config::RefereeConfig;

pub use game::{
    ClockPolicy, DebounceMode, GameClock, GameOverPolicy, GameRules, GameSnapshot, GatewayError,
    PenaltyAction, PenaltyRules, SharedReferee, StateGateway,
};

pub use motion::{MotionClassifier, MotionDetector, MotionParams, MotionVerdict};

pub use pipeline::{
    AnalysisStats, FrameAnalysisLoop, FrameRenderer, FrameSource, Overlay, PpmRenderer,
    RenderedFrame,
};

pub use types::{Frame, FrameOrigin, GrayFrame, Mode};
