//! System-wide default constants.
//!
//! Centralises the tunables the referee ships with. Grouped by subsystem.
//! Values marked "original deployment" reproduce the first hardware setup.

// ============================================================================
// Motion Classification
// ============================================================================

/// Minimum component area (pixels) that counts as motion. Original deployment.
pub const DEFAULT_THRESHOLD_AREA: u32 = 5_000;

/// Upper bound accepted for the area threshold (a full 4K frame).
pub const MAX_THRESHOLD_AREA: u32 = 3840 * 2160;

/// Gaussian kernel size used to suppress sensor noise.
pub const DEFAULT_BLUR_KERNEL: usize = 21;

/// Per-pixel intensity difference above which a pixel is foreground.
pub const DEFAULT_DIFF_CUTOFF: u8 = 25;

/// 3×3 dilation passes applied to the foreground mask.
pub const DEFAULT_DILATE_ITERATIONS: usize = 2;

// ============================================================================
// Game Clock
// ============================================================================

/// Period of one clock tick (seconds).
pub const CLOCK_TICK_SECS: u64 = 1;

/// Fixed-duration GREEN phase (seconds). Original deployment.
pub const DEFAULT_GREEN_SECS: u32 = 5;

/// Fixed-duration RED phase (seconds). Original deployment.
pub const DEFAULT_RED_SECS: u32 = 4;

/// GAME_OVER cooldown before an auto-restart (seconds). Original deployment.
pub const DEFAULT_GAME_OVER_COOLDOWN_SECS: u32 = 5;

/// Budgeted policy: whole-session budget (seconds).
pub const DEFAULT_TOTAL_SECS: u32 = 120;

/// Budgeted policy: GREEN/RED flip interval (seconds).
pub const DEFAULT_INTERVAL_SECS: u32 = 5;

// ============================================================================
// Penalties
// ============================================================================

/// Minimum spacing between accepted penalties (milliseconds).
///
/// One sustained movement spans 15-30 frames; anything shorter than a second
/// would count it repeatedly.
pub const DEFAULT_PENALTY_COOLDOWN_MS: u64 = 1_000;

/// Seconds removed from the budget by a `deduct` penalty.
pub const DEFAULT_PENALTY_DEDUCT_SECS: u32 = 5;

// ============================================================================
// Frame Sources
// ============================================================================

/// Default capture width when the source does not describe itself.
pub const DEFAULT_FRAME_WIDTH: usize = 640;

/// Default capture height when the source does not describe itself.
pub const DEFAULT_FRAME_HEIGHT: usize = 480;

/// Placeholder stream rate while the camera is unavailable.
pub const DEFAULT_PLACEHOLDER_FPS: u32 = 10;

/// Fixed first overlay line on placeholder frames.
pub const PLACEHOLDER_TEXT: &str = "CAMERA UNAVAILABLE";

/// Consecutive failed reads before the camera is abandoned for placeholders.
pub const MAX_CONSECUTIVE_READ_FAILURES: u32 = 30;

// ============================================================================
// HTTP
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:5000";

/// Multipart boundary used by the frame feed.
pub const FEED_BOUNDARY: &str = "frame";
