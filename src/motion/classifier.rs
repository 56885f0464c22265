//! Frame-pair motion classification and the stateful baseline wrapper

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::blur::gaussian_blur;
use super::components::{find_regions, Region};
use super::morphology::{difference_mask, dilate, fill_holes};
use crate::config::defaults::{DEFAULT_BLUR_KERNEL, DEFAULT_DIFF_CUTOFF, DEFAULT_DILATE_ITERATIONS};
use crate::types::GrayFrame;

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MotionError {
    #[error("frame dimensions differ: previous {prev_w}x{prev_h}, current {cur_w}x{cur_h}")]
    DimensionMismatch {
        prev_w: usize,
        prev_h: usize,
        cur_w: usize,
        cur_h: usize,
    },
}

// ============================================================================
// Parameters & Verdict
// ============================================================================

/// Fixed image-processing constants. The area threshold is passed per call
/// because it can be tuned live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Gaussian kernel size (odd)
    pub blur_kernel: usize,
    /// Pixels whose difference exceeds this become foreground
    pub diff_cutoff: u8,
    /// 3×3 dilation passes
    pub dilate_iterations: usize,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            blur_kernel: DEFAULT_BLUR_KERNEL,
            diff_cutoff: DEFAULT_DIFF_CUTOFF,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
        }
    }
}

/// Result of comparing two frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionVerdict {
    /// True iff some component's area exceeds the threshold
    pub motion: bool,
    /// Components whose area exceeded the threshold. Area counts every pixel
    /// inside a component's outer boundary, enclosed holes included.
    pub regions: Vec<Region>,
    /// Total components found, triggering or not
    pub components: usize,
    /// Largest component area (0 when the mask is empty)
    pub largest_area: usize,
}

// ============================================================================
// Classifier
// ============================================================================

/// Stateless frame-pair classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotionClassifier {
    params: MotionParams,
}

impl MotionClassifier {
    pub fn new(params: MotionParams) -> Self {
        Self { params }
    }

    /// Gaussian-smooth a frame with the configured kernel.
    pub fn smooth(&self, frame: &GrayFrame) -> GrayFrame {
        gaussian_blur(frame, self.params.blur_kernel)
    }

    /// Smooth both raw frames, then compare them.
    pub fn classify(
        &self,
        previous: &GrayFrame,
        current: &GrayFrame,
        threshold: u32,
    ) -> Result<MotionVerdict, MotionError> {
        check_dimensions(previous, current)?;
        self.classify_smoothed(&self.smooth(previous), &self.smooth(current), threshold)
    }

    /// Compare two frames that have already been smoothed.
    pub fn classify_smoothed(
        &self,
        previous: &GrayFrame,
        current: &GrayFrame,
        threshold: u32,
    ) -> Result<MotionVerdict, MotionError> {
        check_dimensions(previous, current)?;

        let mask = difference_mask(previous, current, self.params.diff_cutoff);
        if mask.is_empty() {
            return Ok(MotionVerdict {
                motion: false,
                regions: Vec::new(),
                components: 0,
                largest_area: 0,
            });
        }

        let mask = fill_holes(&dilate(&mask, self.params.dilate_iterations));
        let regions = find_regions(&mask);
        let components = regions.len();
        let largest_area = regions.iter().map(|r| r.area).max().unwrap_or(0);
        let limit = threshold as usize;
        let triggering: Vec<Region> = regions.into_iter().filter(|r| r.area > limit).collect();

        Ok(MotionVerdict {
            motion: !triggering.is_empty(),
            regions: triggering,
            components,
            largest_area,
        })
    }
}

fn check_dimensions(previous: &GrayFrame, current: &GrayFrame) -> Result<(), MotionError> {
    if previous.same_dimensions(current) {
        Ok(())
    } else {
        Err(MotionError::DimensionMismatch {
            prev_w: previous.width(),
            prev_h: previous.height(),
            cur_w: current.width(),
            cur_h: current.height(),
        })
    }
}

// ============================================================================
// Detector (baseline owner)
// ============================================================================

/// Outcome of feeding one frame to a [`MotionDetector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// No baseline yet; the frame became the baseline
    InsufficientHistory,
    /// Compared against the baseline, no qualifying motion
    Still(MotionVerdict),
    /// Compared against the baseline, motion detected
    Motion(MotionVerdict),
}

impl Observation {
    pub fn is_motion(&self) -> bool {
        matches!(self, Observation::Motion(_))
    }
}

/// Owns the smoothed baseline frame for consecutive-frame differencing.
///
/// The baseline is exclusive to the analysis loop; [`reset`](Self::reset)
/// must be called whenever the game leaves the active phase.
#[derive(Debug, Default)]
pub struct MotionDetector {
    classifier: MotionClassifier,
    baseline: Option<GrayFrame>,
}

impl MotionDetector {
    pub fn new(classifier: MotionClassifier) -> Self {
        Self {
            classifier,
            baseline: None,
        }
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    /// Drop the baseline so the next frame is treated as the first.
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Smooth `frame`, compare it with the baseline, then make it the new baseline.
    ///
    /// On a dimension mismatch the new frame still replaces the baseline so
    /// the following frame compares cleanly.
    pub fn observe(&mut self, frame: &GrayFrame, threshold: u32) -> Result<Observation, MotionError> {
        let smoothed = self.classifier.smooth(frame);
        let compared = self
            .baseline
            .take()
            .map(|previous| self.classifier.classify_smoothed(&previous, &smoothed, threshold));
        self.baseline = Some(smoothed);

        let Some(verdict) = compared.transpose()? else {
            return Ok(Observation::InsufficientHistory);
        };
        Ok(if verdict.motion {
            Observation::Motion(verdict)
        } else {
            Observation::Still(verdict)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_block(x: usize, y: usize) -> GrayFrame {
        let mut frame = GrayFrame::filled(160, 120, 40);
        frame.fill_rect(x, y, 40, 40, 220);
        frame
    }

    #[test]
    fn test_identical_frames_never_move() {
        let classifier = MotionClassifier::default();
        let frame = scene_with_block(20, 20);
        let verdict = classifier.classify(&frame, &frame, 0).unwrap();
        assert!(!verdict.motion);
        assert_eq!(verdict.components, 0);
    }

    #[test]
    fn test_moved_block_is_motion() {
        let classifier = MotionClassifier::default();
        let verdict = classifier
            .classify(&scene_with_block(20, 20), &scene_with_block(90, 50), 500)
            .unwrap();
        assert!(verdict.motion);
        assert!(!verdict.regions.is_empty());
        assert!(verdict.largest_area > 500);
    }

    #[test]
    fn test_threshold_suppresses_small_motion() {
        let classifier = MotionClassifier::default();
        let a = scene_with_block(20, 20);
        let b = scene_with_block(90, 50);
        let verdict = classifier.classify(&a, &b, u32::MAX).unwrap();
        assert!(!verdict.motion);
        assert!(verdict.regions.is_empty());
        assert!(verdict.components > 0);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = MotionClassifier::default();
        let a = scene_with_block(10, 10);
        let b = scene_with_block(14, 12);
        let first = classifier.classify(&a, &b, 300).unwrap();
        for _ in 0..3 {
            assert_eq!(classifier.classify(&a, &b, 300).unwrap(), first);
        }
    }

    #[test]
    fn test_hollow_outline_counts_enclosed_area() {
        let classifier = MotionClassifier::default();
        let before = GrayFrame::filled(160, 160, 40);
        let mut after = before.clone();
        after.fill_rect(20, 20, 120, 1, 220);
        after.fill_rect(20, 139, 120, 1, 220);
        after.fill_rect(20, 20, 1, 120, 220);
        after.fill_rect(139, 20, 1, 120, 220);

        // Dilated ring alone is 124² - 114² = 2380 pixels; filled it is 124²
        let verdict = classifier.classify_smoothed(&before, &after, 5000).unwrap();
        assert!(verdict.motion);
        assert_eq!(verdict.components, 1);
        assert_eq!(verdict.largest_area, 124 * 124);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let classifier = MotionClassifier::default();
        let err = classifier
            .classify(&GrayFrame::filled(10, 10, 0), &GrayFrame::filled(12, 10, 0), 1)
            .unwrap_err();
        assert!(matches!(err, MotionError::DimensionMismatch { cur_w: 12, .. }));
    }

    #[test]
    fn test_detector_first_frame_is_insufficient_history() {
        let mut detector = MotionDetector::default();
        let obs = detector.observe(&scene_with_block(20, 20), 500).unwrap();
        assert_eq!(obs, Observation::InsufficientHistory);
        assert!(detector.has_baseline());

        let obs = detector.observe(&scene_with_block(90, 50), 500).unwrap();
        assert!(obs.is_motion());
    }

    #[test]
    fn test_detector_reset_reapplies_first_frame_rule() {
        let mut detector = MotionDetector::default();
        detector.observe(&scene_with_block(20, 20), 500).unwrap();
        detector.reset();
        assert!(!detector.has_baseline());
        // Would be motion against the stale baseline
        let obs = detector.observe(&scene_with_block(90, 50), 500).unwrap();
        assert_eq!(obs, Observation::InsufficientHistory);
    }

    #[test]
    fn test_detector_mismatch_still_replaces_baseline() {
        let mut detector = MotionDetector::default();
        detector.observe(&GrayFrame::filled(40, 40, 10), 100).unwrap();
        assert!(detector.observe(&GrayFrame::filled(48, 40, 10), 100).is_err());
        let obs = detector.observe(&GrayFrame::filled(48, 40, 10), 100).unwrap();
        assert!(matches!(obs, Observation::Still(_)));
    }

    #[test]
    fn test_detector_advances_baseline() {
        let mut detector = MotionDetector::default();
        detector.observe(&scene_with_block(20, 20), 500).unwrap();
        assert!(detector.observe(&scene_with_block(90, 50), 500).unwrap().is_motion());
        // Same position as the previous frame: still
        let obs = detector.observe(&scene_with_block(90, 50), 500).unwrap();
        assert!(matches!(obs, Observation::Still(_)));
    }
}
