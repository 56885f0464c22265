//! Overlay annotation and the rendering seam.
//!
//! The analysis loop builds an [`Overlay`] from a non-clearing snapshot and
//! hands it with the raw frame to a [`FrameRenderer`]. The referee never
//! looks at the encoded bytes.

use thiserror::Error;

use crate::config::defaults::PLACEHOLDER_TEXT;
use crate::game::{ClockPolicy, GameSnapshot};
use crate::types::Frame;

/// Height in pixels of the mode-coloured band drawn by [`PpmRenderer`].
const BAND_HEIGHT: usize = 12;
/// Width in pixels of the flash border drawn by [`PpmRenderer`].
const FLASH_BORDER: usize = 6;

/// Text and colour to draw over one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub lines: Vec<String>,
    pub color: [u8; 3],
    pub flash: bool,
}

impl Overlay {
    /// Compose the annotation for `frame` from the current game snapshot.
    pub fn compose(snapshot: &GameSnapshot, policy: &ClockPolicy, frame: &Frame) -> Self {
        let mut lines = Vec::with_capacity(6);
        if frame.is_placeholder() {
            lines.push(PLACEHOLDER_TEXT.to_string());
        }
        lines.push(format!("STATUS: {}", snapshot.mode));
        lines.push(format!("TIMER: {}", snapshot.interval_time_remaining));
        if matches!(policy, ClockPolicy::Budgeted { .. }) {
            lines.push(format!("TOTAL: {}", snapshot.total_time_remaining));
        }
        lines.push(format!("PENALTIES: {}", snapshot.penalty_count));
        if snapshot.penalty_flash {
            lines.push("PENALTY!".to_string());
        }
        Self {
            lines,
            color: snapshot.mode.overlay_color(),
            flash: snapshot.penalty_flash,
        }
    }

    /// Lines joined for a single-line header.
    pub fn joined(&self) -> String {
        self.lines.join(" | ")
    }
}

/// An encoded frame ready for the feed.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    pub overlay_text: String,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot render an empty {width}x{height} frame")]
    EmptyFrame { width: usize, height: usize },
}

/// Draws an overlay onto a frame and encodes the result.
pub trait FrameRenderer: Send + Sync {
    fn render(&self, frame: &Frame, overlay: &Overlay) -> Result<RenderedFrame, RenderError>;
}

// ============================================================================
// PPM Renderer
// ============================================================================

/// Binary PPM (P6) encoder. Paints a mode-coloured band across the top, and a
/// red border while the penalty flash is up. Text travels alongside in
/// [`RenderedFrame::overlay_text`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PpmRenderer;

impl PpmRenderer {
    fn paint_rect(frame: &mut Frame, x0: usize, y0: usize, w: usize, h: usize, rgb: [u8; 3]) {
        let (fw, fh) = (frame.width(), frame.height());
        let x1 = (x0 + w).min(fw);
        let y1 = (y0 + h).min(fh);
        let pixels = frame.pixels_mut();
        for y in y0.min(fh)..y1 {
            for x in x0.min(fw)..x1 {
                let i = (y * fw + x) * 3;
                pixels[i..i + 3].copy_from_slice(&rgb);
            }
        }
    }
}

impl FrameRenderer for PpmRenderer {
    fn render(&self, frame: &Frame, overlay: &Overlay) -> Result<RenderedFrame, RenderError> {
        let (w, h) = (frame.width(), frame.height());
        if w == 0 || h == 0 {
            return Err(RenderError::EmptyFrame {
                width: w,
                height: h,
            });
        }

        let mut canvas = frame.clone();
        Self::paint_rect(&mut canvas, 0, 0, w, BAND_HEIGHT, overlay.color);
        if overlay.flash {
            let red = [255, 0, 0];
            Self::paint_rect(&mut canvas, 0, 0, w, FLASH_BORDER, red);
            Self::paint_rect(&mut canvas, 0, h.saturating_sub(FLASH_BORDER), w, FLASH_BORDER, red);
            Self::paint_rect(&mut canvas, 0, 0, FLASH_BORDER, h, red);
            Self::paint_rect(&mut canvas, w.saturating_sub(FLASH_BORDER), 0, FLASH_BORDER, h, red);
        }

        let header = format!("P6\n{w} {h}\n255\n");
        let mut bytes = Vec::with_capacity(header.len() + canvas.pixels().len());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(canvas.pixels());

        Ok(RenderedFrame {
            content_type: "image/x-portable-pixmap",
            bytes,
            overlay_text: overlay.joined(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{GameOverPolicy, GameRules, SharedReferee};
    use crate::types::{FrameOrigin, Mode};

    fn snapshot(mode: Mode, flash: bool) -> GameSnapshot {
        GameSnapshot {
            mode,
            total_time_remaining: 90,
            interval_time_remaining: 3,
            penalty_flash: flash,
            penalty_count: u32::from(flash),
            motion_threshold: 5000,
            policy: "budgeted".to_string(),
        }
    }

    #[test]
    fn test_compose_budgeted_lines() {
        let frame = Frame::filled(4, 4, [0, 0, 0], FrameOrigin::Camera);
        let overlay = Overlay::compose(&snapshot(Mode::Red, true), &ClockPolicy::default(), &frame);
        assert_eq!(
            overlay.lines,
            vec!["STATUS: RED", "TIMER: 3", "TOTAL: 90", "PENALTIES: 1", "PENALTY!"]
        );
        assert_eq!(overlay.color, [255, 0, 0]);
        assert!(overlay.flash);
    }

    #[test]
    fn test_compose_placeholder_leads_with_fixed_text() {
        let frame = Frame::filled(4, 4, [0, 0, 0], FrameOrigin::Placeholder);
        let policy = ClockPolicy::FixedDuration {
            green_secs: 5,
            red_secs: 4,
            game_over: GameOverPolicy::Terminal,
        };
        let overlay = Overlay::compose(&snapshot(Mode::Green, false), &policy, &frame);
        assert_eq!(overlay.lines[0], PLACEHOLDER_TEXT);
        assert!(!overlay.lines.iter().any(|l| l.starts_with("TOTAL")));
        assert_eq!(overlay.color, [0, 255, 0]);
    }

    #[test]
    fn test_compose_from_live_peek() {
        let referee = SharedReferee::new(GameRules::default(), 5000);
        let frame = Frame::filled(4, 4, [0, 0, 0], FrameOrigin::Camera);
        let overlay = Overlay::compose(&referee.peek(), &referee.rules().clock, &frame);
        assert_eq!(overlay.lines[0], "STATUS: IDLE");
        assert_eq!(overlay.color, [160, 160, 160]);
    }

    #[test]
    fn test_ppm_header_band_and_border() {
        let frame = Frame::filled(20, 20, [0, 0, 0], FrameOrigin::Camera);
        let overlay = Overlay {
            lines: vec!["STATUS: GREEN".into()],
            color: [0, 255, 0],
            flash: false,
        };
        let out = PpmRenderer.render(&frame, &overlay).unwrap();
        let header = b"P6\n20 20\n255\n";
        assert!(out.bytes.starts_with(header));
        assert_eq!(out.bytes.len(), header.len() + 20 * 20 * 3);
        // Top-left pixel sits in the green band, bottom-right is untouched.
        assert_eq!(&out.bytes[header.len()..header.len() + 3], &[0, 255, 0]);
        assert_eq!(&out.bytes[out.bytes.len() - 3..], &[0, 0, 0]);
        assert_eq!(out.overlay_text, "STATUS: GREEN");

        let flashing = Overlay { flash: true, ..overlay };
        let out = PpmRenderer.render(&frame, &flashing).unwrap();
        assert_eq!(&out.bytes[out.bytes.len() - 3..], &[255, 0, 0]);
    }

    #[test]
    fn test_ppm_rejects_empty_frame() {
        let frame = Frame::filled(0, 0, [0, 0, 0], FrameOrigin::Camera);
        let overlay = Overlay {
            lines: Vec::new(),
            color: [0, 0, 0],
            flash: false,
        };
        assert!(matches!(
            PpmRenderer.render(&frame, &overlay),
            Err(RenderError::EmptyFrame { .. })
        ));
    }
}
