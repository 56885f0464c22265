//! Frame source abstraction for camera ingestion.
//!
//! Provides a unified trait for pulling frames from different places: a
//! camera backend, raw RGB24 on stdin (e.g. piped from ffmpeg), an in-memory
//! replay, or the synthetic placeholder stream used while no camera is
//! available.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::defaults::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, DEFAULT_PLACEHOLDER_FPS};
use crate::types::{Frame, FrameOrigin};

/// Events produced by a frame source.
pub enum FrameEvent {
    /// A frame was read.
    Frame(Frame),
    /// Source reached end of stream.
    Eof,
}

#[derive(Error, Debug)]
pub enum SourceError {
    /// Camera could not be opened. Handled once by falling back to placeholders.
    #[error("camera {device_index} unavailable: {reason}")]
    Unavailable { device_index: u32, reason: String },

    /// One bad read; the caller skips it.
    #[error("frame read failed: {0}")]
    Transient(String),

    #[error("frame source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait abstracting where frames come from.
///
/// The analysis loop calls [`next_frame`](FrameSource::next_frame) inside a
/// `select!` with cancellation, and [`release`](FrameSource::release) exactly
/// once when it stops using the source.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Read the next frame.
    ///
    /// Returns `FrameEvent::Eof` when the stream has ended for good.
    async fn next_frame(&mut self) -> Result<FrameEvent, SourceError>;

    /// Human-readable name for logging (e.g. "stdin", "placeholder").
    fn source_name(&self) -> &str;

    /// Free the underlying device. Default: nothing to free.
    fn release(&mut self) {}
}

/// Opens a camera device. Device and backend enumeration live behind this
/// trait; the referee only knows an index and an optional hint.
pub trait CameraBackend: Send + Sync {
    fn name(&self) -> &str;

    fn open(
        &self,
        device_index: u32,
        backend_hint: Option<&str>,
    ) -> Result<Box<dyn FrameSource>, SourceError>;
}

// ============================================================================
// Placeholder Source
// ============================================================================

/// Dark frames at a fixed rate. Never ends.
pub struct PlaceholderSource {
    width: usize,
    height: usize,
    period: Duration,
    yielded_first: bool,
}

impl PlaceholderSource {
    pub fn new(width: usize, height: usize, fps: u32) -> Self {
        Self {
            width,
            height,
            period: Duration::from_secs(1) / fps.max(1),
            yielded_first: false,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for PlaceholderSource {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT, DEFAULT_PLACEHOLDER_FPS)
    }
}

#[async_trait]
impl FrameSource for PlaceholderSource {
    async fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        if self.yielded_first {
            tokio::time::sleep(self.period).await;
        }
        self.yielded_first = true;
        Ok(FrameEvent::Frame(Frame::filled(
            self.width,
            self.height,
            [16, 16, 16],
            FrameOrigin::Placeholder,
        )))
    }

    fn source_name(&self) -> &str {
        "placeholder"
    }
}

// ============================================================================
// Replay Source (in-memory frames)
// ============================================================================

/// Replays pre-loaded frames with optional inter-frame delay.
///
/// `Err` entries are returned as-is, which lets tests inject read failures.
pub struct ReplaySource {
    frames: std::vec::IntoIter<Result<Frame, SourceError>>,
    delay: Duration,
    yielded_first: bool,
    releases: Arc<AtomicUsize>,
}

impl ReplaySource {
    pub fn new(frames: Vec<Frame>, delay: Duration) -> Self {
        Self::scripted(frames.into_iter().map(Ok).collect(), delay)
    }

    pub fn scripted(frames: Vec<Result<Frame, SourceError>>, delay: Duration) -> Self {
        Self {
            frames: frames.into_iter(),
            delay,
            yielded_first: false,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter incremented on every [`release`](FrameSource::release).
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        if self.yielded_first && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.yielded_first = true;
        match self.frames.next() {
            Some(Ok(frame)) => Ok(FrameEvent::Frame(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(FrameEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "replay"
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Stdin Source (raw RGB24)
// ============================================================================

/// Reads fixed-size raw RGB24 frames from stdin.
///
/// `ffmpeg -f v4l2 -i /dev/video0 -s 640x480 -f rawvideo -pix_fmt rgb24 - | redlight-referee --stdin`
pub struct RawStdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    width: usize,
    height: usize,
}

impl RawStdinSource {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            reader: tokio::io::BufReader::with_capacity(width * height * 3, tokio::io::stdin()),
            width,
            height,
        }
    }
}

#[async_trait]
impl FrameSource for RawStdinSource {
    async fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        use tokio::io::AsyncReadExt;

        let mut buf = vec![0u8; self.width * self.height * 3];
        match self.reader.read_exact(&mut buf).await {
            Ok(_) => {}
            // A partial trailing frame is treated as end of stream.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(FrameEvent::Eof),
            Err(e) => return Err(SourceError::Io(e)),
        }
        Frame::from_rgb(self.width, self.height, buf)
            .map(FrameEvent::Frame)
            .map_err(|e| SourceError::Transient(e.to_string()))
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

/// Backend that serves stdin regardless of device index.
pub struct StdinBackend {
    pub width: usize,
    pub height: usize,
}

impl CameraBackend for StdinBackend {
    fn name(&self) -> &str {
        "stdin-rgb24"
    }

    fn open(
        &self,
        _device_index: u32,
        _backend_hint: Option<&str>,
    ) -> Result<Box<dyn FrameSource>, SourceError> {
        Ok(Box::new(RawStdinSource::new(self.width, self.height)))
    }
}

/// Backend for builds without a capture driver: every open fails.
pub struct NoCaptureBackend;

impl CameraBackend for NoCaptureBackend {
    fn name(&self) -> &str {
        "none"
    }

    fn open(
        &self,
        device_index: u32,
        backend_hint: Option<&str>,
    ) -> Result<Box<dyn FrameSource>, SourceError> {
        Err(SourceError::Unavailable {
            device_index,
            reason: format!(
                "no capture driver compiled in (hint: {})",
                backend_hint.unwrap_or("none")
            ),
        })
    }
}

// ============================================================================
// Opening & Release
// ============================================================================

/// Open `device_index`, falling back to `placeholder` with a single warning.
pub fn open_or_placeholder(
    backend: &dyn CameraBackend,
    device_index: u32,
    backend_hint: Option<&str>,
    placeholder: PlaceholderSource,
) -> Box<dyn FrameSource> {
    match backend.open(device_index, backend_hint) {
        Ok(source) => {
            info!(
                backend = backend.name(),
                device_index,
                source = source.source_name(),
                "Camera opened"
            );
            source
        }
        Err(e) => {
            warn!(
                backend = backend.name(),
                error = %e,
                "Camera unavailable, streaming placeholder frames"
            );
            Box::new(placeholder)
        }
    }
}

/// Owns the active source and releases it exactly once: on explicit
/// [`release`](SourceGuard::release), on [`replace`](SourceGuard::replace),
/// or on drop.
pub struct SourceGuard {
    source: Option<Box<dyn FrameSource>>,
}

impl SourceGuard {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.as_ref().map_or("released", |s| s.source_name())
    }

    /// Read from the held source. A released guard reports end of stream.
    pub async fn next_frame(&mut self) -> Result<FrameEvent, SourceError> {
        match self.source.as_mut() {
            Some(source) => source.next_frame().await,
            None => Ok(FrameEvent::Eof),
        }
    }

    /// Release the current source and hold `next` instead.
    pub fn replace(&mut self, next: Box<dyn FrameSource>) {
        self.release();
        self.source = Some(next);
    }

    pub fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            debug!(source = source.source_name(), "Releasing frame source");
            source.release();
        }
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.release();
    }
}
