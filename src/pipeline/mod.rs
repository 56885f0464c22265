//! Frame Pipeline
//!
//! ```text
//! FrameSource ──► FrameAnalysisLoop ──► FrameRenderer ──► watch channel ──► /video_feed
//!                        │  ▲
//!     register_penalty   ▼  │  frame_context / peek
//!                   SharedReferee
//! ```
//!
//! Placeholder frames replace the camera whenever it cannot be opened or
//! keeps failing; they are rendered but never classified.

pub mod analysis_loop;
pub mod overlay;
pub mod source;

pub use analysis_loop::{frame_channel, AnalysisStats, FrameAnalysisLoop, FrameFeed};
pub use overlay::{FrameRenderer, Overlay, PpmRenderer, RenderError, RenderedFrame};
pub use source::{
    open_or_placeholder, CameraBackend, FrameEvent, FrameSource, NoCaptureBackend,
    PlaceholderSource, RawStdinSource, ReplaySource, SourceError, SourceGuard, StdinBackend,
};
