pub mod background;
pub mod blobs;
pub mod head_estimation;
pub mod position_remapping;
pub mod smoothing;

use background::BackgroundModel;
use blobs::{BlobExtractor, ConnectedComponents};
use head_estimation::{HeadSettings, estimate_head};
use log::debug;
use position_remapping::{FrameGeometry, remap_head};
use smoothing::HeadSmoother;

use crate::{
    depth_image::{DepthFrame, GrayImage, threshold},
    tracker_config::TrackerConfig,
    tracking::TrackedHead,
};

/// Everything carried from one frame to the next
#[derive(Debug, Default)]
pub struct TrackingState {
    pub background: BackgroundModel,
    pub smoother: HeadSmoother,
}

impl TrackingState {
    pub fn new() -> Self {
        TrackingState::default()
    }
}

/// Intermediate images and (if a person was found) the tracking result for one frame
pub struct FrameResult {
    /// Cropped depth image, before background subtraction
    pub depth_image: GrayImage,
    pub threshold_image: GrayImage,
    pub tracked: Option<TrackedHead>,
}

/// Run one depth frame through the whole pipeline: crop, background
/// subtraction/capture, threshold, blob extraction, head estimation,
/// smoothing and remapping.
pub fn process_frame(
    frame: &DepthFrame,
    config: &TrackerConfig,
    state: &mut TrackingState,
    extractor: &impl BlobExtractor,
) -> FrameResult {
    let tracking = &config.tracking;

    let crop = config.crop_rect(frame.width(), frame.height());
    let cropped = frame.crop(&crop);
    let depth_image = cropped.to_gray(tracking.near_clipping, tracking.far_clipping);

    // Subtract using the background as it was before this frame
    let foreground = state
        .background
        .subtract(&depth_image, tracking.background_subtraction);
    state.background.capture_step(&depth_image);

    let threshold_image = threshold(&foreground, tracking.threshold);

    let blobs = extractor.find_blobs(
        &threshold_image,
        tracking.person_min_area,
        tracking.person_max_area,
    );

    let Some(estimate) = estimate_head(
        &blobs,
        &HeadSettings {
            highest_point_threshold: tracking.highest_point_threshold,
            head_interpolation: tracking.head_interpolation,
        },
    ) else {
        debug!("No person-sized blob this frame");
        return FrameResult {
            depth_image,
            threshold_image,
            tracked: None,
        };
    };

    let (head_x, head_y) = estimate.head;
    let raw_head = estimate.raw_head(cropped.distance_at(head_x, head_y) as f32);
    let smoothed_head = state.smoother.update(&raw_head, tracking.smooth_head);
    let mapped_head = remap_head(
        &smoothed_head,
        &FrameGeometry::new(frame.width(), frame.height(), crop),
        config,
    );

    let tracked = TrackedHead {
        crop,
        person: estimate.person,
        highest_point: estimate.highest_point,
        raw_head,
        smoothed_head,
        mapped_head,
    };
    FrameResult {
        depth_image,
        threshold_image,
        tracked: Some(tracked),
    }
}

pub struct Systems {
    pub state: TrackingState,
    pub blob_extractor: ConnectedComponents,
}

impl Systems {
    pub fn new() -> Systems {
        Systems {
            state: TrackingState::new(),
            blob_extractor: ConnectedComponents,
        }
    }

    pub fn process_frame(&mut self, frame: &DepthFrame, config: &TrackerConfig) -> FrameResult {
        process_frame(frame, config, &mut self.state, &self.blob_extractor)
    }
}

impl Default for Systems {
    fn default() -> Self {
        Systems::new()
    }
}
