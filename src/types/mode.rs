//! Game phase enumeration

use serde::{Deserialize, Serialize};

// ============================================================================
// Mode
// ============================================================================

/// Discrete game phase.
///
/// Only RED is the active phase: motion is classified and penalized while
/// the game is in RED and nowhere else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Waiting for an explicit Start
    #[default]
    Idle,
    /// Participants may move
    Green,
    /// Forbidden-movement phase
    Red,
    /// Session finished (terminal or cooling down, depending on policy)
    GameOver,
}

impl Mode {
    /// Whether frames must be classified for motion in this phase.
    pub fn is_active(self) -> bool {
        self == Mode::Red
    }

    /// Whether the phase clock counts down in this phase.
    pub fn is_playing(self) -> bool {
        matches!(self, Mode::Green | Mode::Red)
    }

    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::Green => "GREEN",
            Mode::Red => "RED",
            Mode::GameOver => "GAME_OVER",
        }
    }

    /// Overlay colour for this phase as RGB.
    pub fn overlay_color(self) -> [u8; 3] {
        match self {
            Mode::Idle => [160, 160, 160],
            Mode::Green => [0, 255, 0],
            Mode::Red => [255, 0, 0],
            Mode::GameOver => [255, 255, 0],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}'")]
pub struct UnknownMode(pub String);

impl std::str::FromStr for Mode {
    type Err = UnknownMode;

    /// Case-insensitive; accepts `GAME_OVER`, `GAME-OVER` and `GAMEOVER`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDLE" => Ok(Mode::Idle),
            "GREEN" => Ok(Mode::Green),
            "RED" => Ok(Mode::Red),
            "GAME_OVER" | "GAME-OVER" | "GAMEOVER" => Ok(Mode::GameOver),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_case_insensitive() {
        assert_eq!("red".parse::<Mode>(), Ok(Mode::Red));
        assert_eq!(" Green ".parse::<Mode>(), Ok(Mode::Green));
        assert_eq!("game-over".parse::<Mode>(), Ok(Mode::GameOver));
        assert!("BLUE".parse::<Mode>().is_err());
    }

    #[test]
    fn test_mode_serde_matches_display() {
        for mode in [Mode::Idle, Mode::Green, Mode::Red, Mode::GameOver] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{mode}\""));
        }
    }

    #[test]
    fn test_only_red_is_active() {
        assert!(Mode::Red.is_active());
        assert!(!Mode::Green.is_active());
        assert!(!Mode::Idle.is_active());
        assert!(!Mode::GameOver.is_active());
    }
}
