use log::{debug, info, warn};

use crate::depth_image::{GrayImage, saturating_difference, weighted_sum};

/// Weight of the existing reference when blending in another captured frame
const REFERENCE_WEIGHT: f32 = 0.7;

/// Weight of the newly captured frame
const FRAME_WEIGHT: f32 = 0.3;

/// A reference "empty scene" image, captured over a handful of frames and
/// subtracted from live frames to leave only what is in front of it.
#[derive(Debug, Default)]
pub struct BackgroundModel {
    reference: Option<GrayImage>,
    is_defined: bool,
    capturing: bool,
    first_step: bool,
    remaining_capture_frames: usize,
}

impl BackgroundModel {
    pub fn new() -> Self {
        BackgroundModel::default()
    }

    /// Start (or restart) a capture run. The current reference, if any, stays in
    /// use until the run completes.
    pub fn begin_capture(&mut self, frame_count: usize) {
        let frame_count = frame_count.max(1);
        info!("Capture background over {} frames", frame_count);
        self.remaining_capture_frames = frame_count;
        self.capturing = true;
        self.first_step = true;
    }

    /** Feed one (unsubtracted) frame into the current capture run; does nothing
     * unless a capture is in progress. Returns true on the step that completes
     * the run.
     */
    pub fn capture_step(&mut self, frame: &GrayImage) -> bool {
        if !self.capturing {
            return false;
        }

        let blended = match (&self.reference, self.first_step) {
            (Some(reference), false) if reference.dim() == frame.dim() => {
                weighted_sum(reference, REFERENCE_WEIGHT, frame, FRAME_WEIGHT)
            }
            _ => frame.clone(),
        };
        self.reference = Some(blended);
        self.first_step = false;

        self.remaining_capture_frames -= 1;
        debug!(
            "Captured background frame; {} remaining",
            self.remaining_capture_frames
        );

        if self.remaining_capture_frames == 0 {
            self.capturing = false;
            self.is_defined = true;
            info!("Background capture complete");
            true
        } else {
            false
        }
    }

    /// Remove the reference from `frame`, clamping at zero. A copy of the frame is
    /// returned unchanged if subtraction is disabled or no reference is defined yet.
    pub fn subtract(&self, frame: &GrayImage, enabled: bool) -> GrayImage {
        if !enabled || !self.is_defined {
            return frame.clone();
        }
        match &self.reference {
            Some(reference) if reference.dim() == frame.dim() => {
                saturating_difference(frame, reference)
            }
            Some(reference) => {
                warn!(
                    "Background is {:?} but frame is {:?}; skipping subtraction, please recapture",
                    reference.dim(),
                    frame.dim()
                );
                frame.clone()
            }
            None => frame.clone(),
        }
    }

    /// Forget the reference entirely, e.g. when the crop area changes
    pub fn reset(&mut self) {
        *self = BackgroundModel::default();
    }

    pub fn is_defined(&self) -> bool {
        self.is_defined
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn remaining_capture_frames(&self) -> usize {
        self.remaining_capture_frames
    }

    pub fn reference(&self) -> Option<&GrayImage> {
        self.reference.as_ref()
    }
}
