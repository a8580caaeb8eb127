use std::fs;

use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::depth_image::{Rect, clamp_rect};

/// Which intermediate image to publish for remote viewing
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayImage {
    None,
    #[default]
    Threshold,
    Depth,
    Background,
}

impl DisplayImage {
    /// Next mode, wrapping back round to None
    pub fn next(self) -> Self {
        match self {
            DisplayImage::None => DisplayImage::Threshold,
            DisplayImage::Threshold => DisplayImage::Depth,
            DisplayImage::Depth => DisplayImage::Background,
            DisplayImage::Background => DisplayImage::None,
        }
    }
}

/// Pixels to trim from each edge of the sensor frame
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropMargins {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl CropMargins {
    pub fn to_rect(&self, frame_width: usize, frame_height: usize) -> Rect {
        let rect = Rect::new(
            self.left,
            self.top,
            frame_width.saturating_sub(self.left.saturating_add(self.right)),
            frame_height.saturating_sub(self.top.saturating_add(self.bottom)),
        );
        clamp_rect(&rect, frame_width, frame_height)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrigonometrySettings {
    /// Horizontal field of view of the depth camera, in degrees
    pub fov_h: f32,
    /// Vertical field of view of the depth camera, in degrees
    pub fov_v: f32,
    /// Added to the output y; the height (mm) of the sensor above the floor
    pub distance_floor: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSettings {
    /// Depth image threshold, 0-255; brighter (closer) pixels count as foreground
    pub threshold: u8,
    /// Near clipping plane in mm; maps to 255 in the depth image
    pub near_clipping: f32,
    /// Far clipping plane in mm; maps to 0 in the depth image
    pub far_clipping: f32,
    /// Minimum area (pixels) to consider when looking for person blobs
    pub person_min_area: usize,
    /// Maximum area (pixels) to consider when looking for person blobs
    pub person_max_area: usize,
    /// Only consider highest points within +/- this distance (pixels) of the
    /// person centroid
    pub highest_point_threshold: f32,
    /// How far to interpolate between person centroid (0) and highest point (1)
    pub head_interpolation: f32,
    /// How much of the previous head position to keep each frame
    /// (0 is no smoothing, 1 is frozen)
    pub smooth_head: f32,
    /// Output real-world mm (from field of view trigonometry) instead of
    /// normalised/scaled image coordinates
    pub real_world_values: bool,
    pub background_subtraction: bool,
    /// How many frames to blend together when capturing the background
    pub background_capture_frames: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

/// Scaling happens after normalisation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleSettings {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub x_amount: f32,
    pub y_amount: f32,
    pub z_amount: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OscDestination {
    pub host: String,
    pub port: u16,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OscSettings {
    /// OSC address pattern for head messages
    pub address: String,
    /// Every destination gets every message
    pub destinations: Vec<OscDestination>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    pub display_image: DisplayImage,
    pub crop: CropMargins,
    pub trigonometry: TrigonometrySettings,
    pub tracking: TrackingSettings,
    pub normalize: AxisFlags,
    pub scale: ScaleSettings,
    pub osc: OscSettings,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            display_image: DisplayImage::Threshold,
            crop: CropMargins::default(),
            trigonometry: TrigonometrySettings {
                fov_h: 78.,
                fov_v: 42.,
                distance_floor: 1384.,
            },
            tracking: TrackingSettings {
                threshold: 160,
                near_clipping: 500.,
                far_clipping: 4000.,
                person_min_area: 3000,
                person_max_area: 640 * 480 / 2,
                highest_point_threshold: 50.,
                head_interpolation: 0.6,
                smooth_head: 0.7,
                real_world_values: true,
                background_subtraction: true,
                background_capture_frames: 7,
            },
            normalize: AxisFlags::default(),
            scale: ScaleSettings {
                x: false,
                y: false,
                z: false,
                x_amount: 1.,
                y_amount: 1.,
                z_amount: 1.,
            },
            osc: OscSettings {
                address: String::from("/head"),
                destinations: vec![OscDestination {
                    host: String::from("127.0.0.1"),
                    port: 9000,
                }],
            },
        }
    }
}

impl TrackerConfig {
    /// Replace the whole config with one sent remotely (MessagePack)
    pub fn parse_remote_config(&mut self, payload: &[u8]) -> Result<()> {
        match rmp_serde::from_slice::<TrackerConfig>(payload) {
            Ok(config) => {
                *self = config;
                Ok(())
            }
            Err(e) => Err(anyhow!("Failed to parse Config from message: {}", e)),
        }
    }

    pub fn write_config_to_file(&self, config_file_path: &str) -> Result<()> {
        debug!("Current state of config: {:?}", self);
        let text = serde_json::to_string_pretty(self)?;
        match fs::write(config_file_path, text) {
            Ok(()) => {
                info!("Wrote config to file: {:?}", config_file_path);
                Ok(())
            }
            Err(e) => {
                error!("Error writing config to file: {:?}", e);
                Err(anyhow!("Failed to write config to {}: {}", config_file_path, e))
            }
        }
    }

    pub fn crop_rect(&self, frame_width: usize, frame_height: usize) -> Rect {
        self.crop.to_rect(frame_width, frame_height)
    }
}

/// Load settings from disk, on top of `current`: any key missing from the file
/// keeps its current value. A missing file is not an error.
pub fn load_config_from_file(config_file_path: &str, current: &TrackerConfig) -> Result<TrackerConfig> {
    match fs::read_to_string(config_file_path) {
        Err(e) => {
            if e.kind() == std::io::ErrorKind::NotFound {
                warn!(
                    "Tracker Config file not found at {}; keeping current settings",
                    &config_file_path
                );
                Ok(current.clone())
            } else {
                Err(anyhow!(
                    "Failed to load Tracker Config from disk; error: {:?}",
                    e
                ))
            }
        }
        Ok(s) => {
            let loaded: Value = serde_json::from_str(&s)
                .map_err(|e| anyhow!("Failed to parse config data: {}", e))?;
            let mut merged = serde_json::to_value(current)?;
            merge_values(&mut merged, loaded);
            let config = serde_json::from_value::<TrackerConfig>(merged)
                .map_err(|e| anyhow!("Invalid config data: {}", e))?;
            info!("Loaded Tracker config OK from \"{}\"", config_file_path);
            debug!("Config parsed data from file: {:?}", &config);
            Ok(config)
        }
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge key by key,
/// anything else replaces
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
