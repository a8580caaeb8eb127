use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tether_agent::{ChannelDefinition, ChannelOptionsBuilder, TetherAgent};

use crate::{
    control::{CommandEffect, apply_command, parse_command, replace_config},
    depth_image::{DepthFrame, GrayImage},
    osc_output::{OscEmitter, send_tracked_head},
    systems::{FrameResult, Systems},
    tracker_config::{DisplayImage, TrackerConfig, load_config_from_file},
};

/// A single frame from the depth sensor agent: row-major distances in mm
#[derive(Serialize, Deserialize, Debug)]
pub struct DepthFrameMessage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl DepthFrameMessage {
    pub fn into_frame(self) -> Result<DepthFrame> {
        DepthFrame::from_samples(self.width, self.height, self.data)
    }
}

/// Grayscale debug image (row-major), for remote viewing
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct DisplayImageMessage {
    pub kind: DisplayImage,
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl DisplayImageMessage {
    fn from_image(kind: DisplayImage, image: &GrayImage) -> Self {
        let (height, width) = image.dim();
        DisplayImageMessage {
            kind,
            width,
            height,
            data: image.iter().copied().collect(),
        }
    }
}

/// The image selected by the current display mode, if there is one to show
pub fn display_image_message(
    mode: DisplayImage,
    result: &FrameResult,
    systems: &Systems,
) -> Option<DisplayImageMessage> {
    let image = match mode {
        DisplayImage::None => return None,
        DisplayImage::Threshold => &result.threshold_image,
        DisplayImage::Depth => &result.depth_image,
        DisplayImage::Background => systems.state.background.reference()?,
    };
    Some(DisplayImageMessage::from_image(mode, image))
}

pub struct Outputs {
    pub config_output: ChannelDefinition,
    pub tracked_head_output: ChannelDefinition,
    pub display_image_output: ChannelDefinition,
}

impl Outputs {
    pub fn new(tether_agent: &mut TetherAgent) -> Outputs {
        let config_output = ChannelOptionsBuilder::create_sender("provideTrackerConfig")
            .qos(Some(2))
            .retain(Some(true))
            .build(tether_agent)
            .expect("failed to create Output Plug");

        let tracked_head_output = ChannelOptionsBuilder::create_sender("trackedHead")
            .qos(Some(0))
            .build(tether_agent)
            .expect("failed to create Output Plug");

        // Debug images are large; never worth retrying
        let display_image_output = ChannelOptionsBuilder::create_sender("displayImage")
            .qos(Some(0))
            .build(tether_agent)
            .expect("failed to create Output Plug");

        Outputs {
            config_output,
            tracked_head_output,
            display_image_output,
        }
    }
}

pub struct Inputs {
    pub depth_frames_input: ChannelDefinition,
    pub command_input: ChannelDefinition,
    pub save_config_input: ChannelDefinition,
}

impl Inputs {
    pub fn new(tether_agent: &mut TetherAgent) -> Inputs {
        let depth_frames_input = ChannelOptionsBuilder::create_receiver("depthFrames")
            .qos(Some(0))
            .build(tether_agent)
            .expect("failed to create Input Plug");
        let command_input = ChannelOptionsBuilder::create_receiver("trackerCommand")
            .qos(Some(2))
            .build(tether_agent)
            .expect("failed to create Input Plug");
        let save_config_input = ChannelOptionsBuilder::create_receiver("saveTrackerConfig")
            .qos(Some(2))
            .build(tether_agent)
            .expect("failed to create Input Plug");

        Inputs {
            depth_frames_input,
            command_input,
            save_config_input,
        }
    }
}

pub fn publish_config(config: &TrackerConfig, tether_agent: &TetherAgent, outputs: &Outputs) {
    match rmp_serde::to_vec_named(config) {
        Ok(payload) => {
            if let Err(e) = tether_agent.send(&outputs.config_output, Some(&payload)) {
                error!("Failed to publish config: {}", e);
            }
        }
        Err(e) => error!("Failed to serialize config: {}", e),
    }
}

pub fn handle_depth_frame_message(
    payload: &[u8],
    config: &TrackerConfig,
    tether_agent: &TetherAgent,
    systems: &mut Systems,
    outputs: &Outputs,
    osc: &OscEmitter,
) -> Result<()> {
    let frame = rmp_serde::from_slice::<DepthFrameMessage>(payload)
        .map_err(|e| anyhow!("Failed to decode depth frame: {}", e))?
        .into_frame()?;

    let result = systems.process_frame(&frame, config);

    send_tracked_head(&result, osc);

    if let Some(tracked) = &result.tracked {
        let payload = rmp_serde::to_vec_named(tracked)?;
        tether_agent.send(&outputs.tracked_head_output, Some(&payload))?;
    }

    if let Some(message) = display_image_message(config.display_image, &result, systems) {
        let payload = rmp_serde::to_vec_named(&message)?;
        tether_agent.send(&outputs.display_image_output, Some(&payload))?;
    }

    Ok(())
}

pub fn handle_command_message(
    payload: &[u8],
    config: &mut TrackerConfig,
    tether_agent: &TetherAgent,
    systems: &mut Systems,
    outputs: &Outputs,
    osc: &mut OscEmitter,
    config_file_path: &str,
) -> Result<()> {
    let command = parse_command(payload)?;
    debug!("Received command {:?}", command);

    match apply_command(config, &mut systems.state, command) {
        CommandEffect::None => {}
        CommandEffect::ConfigChanged => {
            osc.configure(&config.osc);
            publish_config(config, tether_agent, outputs);
        }
        CommandEffect::Save => {
            config.write_config_to_file(config_file_path)?;
            publish_config(config, tether_agent, outputs);
        }
        CommandEffect::Load => match load_config_from_file(config_file_path, config) {
            Ok(loaded) => {
                replace_config(config, &mut systems.state, loaded);
                osc.configure(&config.osc);
                publish_config(config, tether_agent, outputs);
            }
            Err(e) => {
                warn!("Could not load settings; keeping current values: {}", e);
            }
        },
    }

    Ok(())
}

/// A complete config sent remotely replaces the current one, then is saved and
/// re-published
pub fn handle_save_config_message(
    payload: &[u8],
    config: &mut TrackerConfig,
    tether_agent: &TetherAgent,
    systems: &mut Systems,
    outputs: &Outputs,
    osc: &mut OscEmitter,
    config_file_path: &str,
) -> Result<()> {
    let mut new_config = config.clone();
    new_config
        .parse_remote_config(payload)
        .map_err(|e| anyhow!("Handle save-message failure: {e}"))?;

    info!("Remote-provided config parsed OK; now save to disk and (re) publish");
    replace_config(config, &mut systems.state, new_config);
    osc.configure(&config.osc);
    config.write_config_to_file(config_file_path)?;
    publish_config(config, tether_agent, outputs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    #[test]
    fn test_depth_frame_message() {
        let message = DepthFrameMessage {
            width: 3,
            height: 2,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let payload = rmp_serde::to_vec_named(&message).unwrap();
        let decoded: DepthFrameMessage = rmp_serde::from_slice(&payload).unwrap();
        let frame = decoded.into_frame().unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.distances()[[1, 0]], 4);

        let short = DepthFrameMessage {
            width: 3,
            height: 2,
            data: vec![1, 2, 3],
        };
        assert!(short.into_frame().is_err());
    }

    #[test]
    fn test_display_image_selection() {
        let mut systems = Systems::new();
        let result = FrameResult {
            depth_image: Array2::from_elem((2, 3), 7),
            threshold_image: Array2::from_elem((2, 3), 255),
            tracked: None,
        };

        assert!(display_image_message(DisplayImage::None, &result, &systems).is_none());

        let threshold = display_image_message(DisplayImage::Threshold, &result, &systems).unwrap();
        assert_eq!((threshold.width, threshold.height), (3, 2));
        assert_eq!(threshold.data, vec![255; 6]);

        let depth = display_image_message(DisplayImage::Depth, &result, &systems).unwrap();
        assert_eq!(depth.kind, DisplayImage::Depth);
        assert_eq!(depth.data, vec![7; 6]);

        // Nothing to show until a background has been captured
        assert!(display_image_message(DisplayImage::Background, &result, &systems).is_none());
        systems.state.background.begin_capture(1);
        systems.state.background.capture_step(&result.depth_image);
        let background =
            display_image_message(DisplayImage::Background, &result, &systems).unwrap();
        assert_eq!(background.data, vec![7; 6]);
    }
}
