//! Runtime adjustments: small parameter nudges, toggles and mode changes.

use anyhow::{Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{systems::TrackingState, tracker_config::TrackerConfig};

const SMOOTHING_STEP: f32 = 0.01;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Command {
    ThresholdDown,
    ThresholdUp,
    SmoothingDown,
    SmoothingUp,
    ToggleNormalizeX,
    ToggleNormalizeY,
    ToggleNormalizeZ,
    ToggleBackgroundSubtraction,
    CaptureBackground,
    ToggleRealWorld,
    CycleDisplayImage,
    SaveSettings,
    LoadSettings,
    ResetSettings,
}

/// As sent on the command channel, e.g. `{ "type": "thresholdUp" }`
#[derive(Serialize, Deserialize, Debug)]
pub struct CommandMessage {
    pub r#type: Command,
}

/// What the caller still has to do after a command has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    /// Nothing more to do
    None,
    /// Config changed in memory; re-publish it
    ConfigChanged,
    Save,
    Load,
}

pub fn parse_command(payload: &[u8]) -> Result<Command> {
    rmp_serde::from_slice::<CommandMessage>(payload)
        .map(|m| m.r#type)
        .map_err(|e| anyhow!("Failed to parse tracker command: {}", e))
}

/// Apply a command to the in-memory config and tracking state. File I/O is left
/// to the caller, as indicated by the returned effect.
pub fn apply_command(
    config: &mut TrackerConfig,
    state: &mut TrackingState,
    command: Command,
) -> CommandEffect {
    let tracking = &mut config.tracking;
    match command {
        Command::ThresholdDown => {
            tracking.threshold = tracking.threshold.saturating_sub(1);
            info!("threshold: {}", tracking.threshold);
            CommandEffect::ConfigChanged
        }
        Command::ThresholdUp => {
            tracking.threshold = tracking.threshold.saturating_add(1);
            info!("threshold: {}", tracking.threshold);
            CommandEffect::ConfigChanged
        }
        Command::SmoothingDown => {
            tracking.smooth_head = (tracking.smooth_head - SMOOTHING_STEP).clamp(0., 1.);
            info!("smoothHead: {:.2}", tracking.smooth_head);
            CommandEffect::ConfigChanged
        }
        Command::SmoothingUp => {
            tracking.smooth_head = (tracking.smooth_head + SMOOTHING_STEP).clamp(0., 1.);
            info!("smoothHead: {:.2}", tracking.smooth_head);
            CommandEffect::ConfigChanged
        }
        Command::ToggleNormalizeX => {
            config.normalize.x = !config.normalize.x;
            CommandEffect::ConfigChanged
        }
        Command::ToggleNormalizeY => {
            config.normalize.y = !config.normalize.y;
            CommandEffect::ConfigChanged
        }
        Command::ToggleNormalizeZ => {
            config.normalize.z = !config.normalize.z;
            CommandEffect::ConfigChanged
        }
        Command::ToggleBackgroundSubtraction => {
            tracking.background_subtraction = !tracking.background_subtraction;
            info!("background subtraction: {}", tracking.background_subtraction);
            CommandEffect::ConfigChanged
        }
        Command::CaptureBackground => {
            state
                .background
                .begin_capture(tracking.background_capture_frames);
            CommandEffect::None
        }
        Command::ToggleRealWorld => {
            tracking.real_world_values = !tracking.real_world_values;
            info!("real world values: {}", tracking.real_world_values);
            CommandEffect::ConfigChanged
        }
        Command::CycleDisplayImage => {
            config.display_image = config.display_image.next();
            info!("display image: {:?}", config.display_image);
            CommandEffect::ConfigChanged
        }
        Command::SaveSettings => CommandEffect::Save,
        Command::LoadSettings => CommandEffect::Load,
        Command::ResetSettings => {
            info!("Reset all settings to defaults");
            replace_config(config, state, TrackerConfig::default());
            CommandEffect::ConfigChanged
        }
    }
}

/// Swap in a whole new config. A different crop invalidates the captured
/// background and the smoothed head, which are both in cropped coordinates.
pub fn replace_config(
    config: &mut TrackerConfig,
    state: &mut TrackingState,
    new_config: TrackerConfig,
) {
    if new_config.crop != config.crop {
        info!("Crop area changed; background needs to be captured again");
        state.background.reset();
        state.smoother.reset();
    }
    *config = new_config;
}
