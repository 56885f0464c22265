//! Frame analysis loop: pull a frame, classify it while RED, offer penalties,
//! render the overlay, publish the result.
//!
//! The loop owns the motion baseline. It reads game state through short
//! [`SharedReferee`] calls and never holds the state lock across a frame
//! read or a render.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::overlay::{FrameRenderer, Overlay, RenderedFrame};
use super::source::{FrameEvent, FrameSource, PlaceholderSource, SourceError, SourceGuard};
use crate::config::defaults::{
    DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, DEFAULT_PLACEHOLDER_FPS,
    MAX_CONSECUTIVE_READ_FAILURES,
};
use crate::game::{PenaltyOutcome, SharedReferee};
use crate::motion::{MotionClassifier, MotionDetector, Observation};
use crate::types::Frame;

/// Latest rendered frame, shared with the HTTP feed.
pub type FrameFeed = watch::Receiver<Option<Arc<RenderedFrame>>>;

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub frames: u64,
    /// Frames compared against a baseline
    pub classified: u64,
    pub motion_frames: u64,
    pub penalties_accepted: u64,
    pub placeholder_frames: u64,
    pub read_failures: u64,
    pub render_failures: u64,
}

/// Create the channel the loop publishes rendered frames on.
pub fn frame_channel() -> (watch::Sender<Option<Arc<RenderedFrame>>>, FrameFeed) {
    watch::channel(None)
}

/// Owns everything the per-frame step needs.
///
/// Built with [`new()`](FrameAnalysisLoop::new), optionally given placeholder
/// geometry with [`with_placeholder()`](FrameAnalysisLoop::with_placeholder),
/// then consumed by [`run()`](FrameAnalysisLoop::run).
pub struct FrameAnalysisLoop {
    referee: SharedReferee,
    classifier: MotionClassifier,
    detector: MotionDetector,
    renderer: Arc<dyn FrameRenderer>,
    frames_tx: watch::Sender<Option<Arc<RenderedFrame>>>,
    placeholder: (usize, usize, u32),
    cancel_token: CancellationToken,
}

impl FrameAnalysisLoop {
    pub fn new(
        referee: SharedReferee,
        classifier: MotionClassifier,
        renderer: Arc<dyn FrameRenderer>,
        frames_tx: watch::Sender<Option<Arc<RenderedFrame>>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            referee,
            classifier,
            detector: MotionDetector::new(classifier),
            renderer,
            frames_tx,
            placeholder: (DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT, DEFAULT_PLACEHOLDER_FPS),
            cancel_token,
        }
    }

    /// Geometry and rate of the stream substituted after repeated read failures.
    pub fn with_placeholder(mut self, width: usize, height: usize, fps: u32) -> Self {
        self.placeholder = (width, height, fps);
        self
    }

    fn placeholder_source(&self) -> PlaceholderSource {
        let (width, height, fps) = self.placeholder;
        PlaceholderSource::new(width, height, fps)
    }

    /// Run until the source ends or shutdown is requested.
    ///
    /// The source is released exactly once on every exit path.
    pub async fn run(mut self, source: Box<dyn FrameSource>) -> AnalysisStats {
        let mut stats = AnalysisStats::default();
        let mut guard = SourceGuard::new(source);
        let mut consecutive_failures = 0u32;

        info!(source = guard.source_name(), "Frame analysis started");

        loop {
            let result = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[FrameAnalysis] Shutdown signal received");
                    break;
                }
                result = guard.next_frame() => result,
            };

            let frame = match result {
                Ok(FrameEvent::Frame(frame)) => {
                    consecutive_failures = 0;
                    frame
                }
                Ok(FrameEvent::Eof) => {
                    info!(
                        source = guard.source_name(),
                        frames = stats.frames,
                        "[FrameAnalysis] Source reached end of stream"
                    );
                    break;
                }
                Err(e @ SourceError::Unavailable { .. }) => {
                    warn!(error = %e, "Camera lost, streaming placeholder frames");
                    guard.replace(Box::new(self.placeholder_source()));
                    continue;
                }
                Err(e) => {
                    stats.read_failures += 1;
                    consecutive_failures += 1;
                    debug!(error = %e, consecutive_failures, "Skipping unreadable frame");
                    if consecutive_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        warn!(
                            source = guard.source_name(),
                            consecutive_failures,
                            "Camera keeps failing, streaming placeholder frames"
                        );
                        guard.replace(Box::new(self.placeholder_source()));
                        consecutive_failures = 0;
                    }
                    continue;
                }
            };

            if let Some(rendered) = self.process_frame(&frame, &mut stats).await {
                self.frames_tx.send_replace(Some(Arc::new(rendered)));
            }

            if stats.frames % 300 == 0 {
                debug!(
                    frames = stats.frames,
                    classified = stats.classified,
                    penalties = stats.penalties_accepted,
                    "Frame analysis progress"
                );
            }
        }

        guard.release();

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("FRAME ANALYSIS STATISTICS");
        info!("   Frames:              {}", stats.frames);
        info!("   Classified:          {}", stats.classified);
        info!("   Motion Frames:       {}", stats.motion_frames);
        info!("   Penalties Accepted:  {}", stats.penalties_accepted);
        info!("   Placeholder Frames:  {}", stats.placeholder_frames);
        info!("   Read Failures:       {}", stats.read_failures);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        stats
    }

    /// Smooth and compare on the blocking pool. The detector travels with
    /// the job and comes back with the verdict; if the job dies, a fresh
    /// detector takes its place and the next frame becomes the baseline.
    async fn observe_off_runtime(&mut self, frame: &Frame, threshold: u32) -> Option<Observation> {
        let gray = frame.to_gray();
        let mut detector =
            std::mem::replace(&mut self.detector, MotionDetector::new(self.classifier));

        let joined = tokio::task::spawn_blocking(move || {
            let observation = detector.observe(&gray, threshold);
            (detector, observation)
        })
        .await;

        match joined {
            Ok((detector, Ok(observation))) => {
                self.detector = detector;
                Some(observation)
            }
            Ok((detector, Err(e))) => {
                self.detector = detector;
                warn!(error = %e, "Motion classification skipped");
                None
            }
            Err(e) => {
                warn!(error = %e, "Motion classification task failed, baseline dropped");
                None
            }
        }
    }

    /// The per-frame step.
    async fn process_frame(&mut self, frame: &Frame, stats: &mut AnalysisStats) -> Option<RenderedFrame> {
        stats.frames += 1;
        if frame.is_placeholder() {
            stats.placeholder_frames += 1;
        }

        let (mode, threshold) = self.referee.frame_context();
        if mode.is_active() && !frame.is_placeholder() {
            match self.observe_off_runtime(frame, threshold).await {
                None | Some(Observation::InsufficientHistory) => {}
                Some(Observation::Still(_)) => stats.classified += 1,
                Some(Observation::Motion(verdict)) => {
                    stats.classified += 1;
                    stats.motion_frames += 1;
                    match self.referee.register_penalty(Instant::now()) {
                        PenaltyOutcome::Accepted { count } => {
                            stats.penalties_accepted += 1;
                            info!(count, largest_area = verdict.largest_area, "Penalty");
                        }
                        PenaltyOutcome::Debounced => {
                            debug!(largest_area = verdict.largest_area, "Motion debounced");
                        }
                        PenaltyOutcome::NotActive => {
                            debug!("Motion seen after RED ended");
                        }
                    }
                }
            }
        } else {
            self.detector.reset();
        }

        let snapshot = self.referee.peek();
        let overlay = Overlay::compose(&snapshot, &self.referee.rules().clock, frame);
        match self.renderer.render(frame, &overlay) {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                stats.render_failures += 1;
                warn!(error = %e, "Frame render failed, skipping");
                None
            }
        }
    }
}
