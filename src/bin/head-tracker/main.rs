use std::thread;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{debug, info, warn};
use tether_agent::TetherAgentOptionsBuilder;

use tether_depth_head_tracker::osc_output::OscEmitter;
use tether_depth_head_tracker::systems::Systems;
use tether_depth_head_tracker::tether_interface::{
    Inputs, Outputs, handle_command_message, handle_depth_frame_message,
    handle_save_config_message, publish_config,
};
use tether_depth_head_tracker::tracker_config::{TrackerConfig, load_config_from_file};

mod cli;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize the logger from the environment
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level))
        .filter_module("paho_mqtt", log::LevelFilter::Warn)
        .filter_module("tether_agent", log::LevelFilter::Warn)
        .filter_module("rumqttc", log::LevelFilter::Warn)
        .init();

    debug!("Started; args: {:?}", cli);

    let mut tether_agent = TetherAgentOptionsBuilder::new(&cli.agent_role)
        .id(Some(&cli.agent_group))
        .host(Some(&cli.tether_host.to_string()))
        .build()
        .expect("failed to init and/or connect Tether Agent");

    let inputs = Inputs::new(&mut tether_agent);
    let outputs = Outputs::new(&mut tether_agent);

    let mut config = match load_config_from_file(&cli.config_path, &TrackerConfig::default()) {
        Ok(config) => config,
        Err(e) => {
            warn!("Could not load settings, using defaults: {}", e);
            TrackerConfig::default()
        }
    };

    // Always publish on first start/load...
    info!("Publish tracker config with retain=true");
    publish_config(&config, &tether_agent, &outputs);

    let mut osc = OscEmitter::new(&config.osc, cli.osc_address.clone())
        .expect("failed to bind UDP socket for OSC");
    let mut systems = Systems::new();

    loop {
        let mut work_done = false;

        if let Some((topic, payload)) = tether_agent.check_messages() {
            work_done = true;

            if inputs.depth_frames_input.matches(&topic) {
                if let Err(e) = handle_depth_frame_message(
                    &payload,
                    &config,
                    &tether_agent,
                    &mut systems,
                    &outputs,
                    &osc,
                ) {
                    warn!("Skipping depth frame: {}", e);
                }
            }

            if inputs.command_input.matches(&topic) {
                if let Err(e) = handle_command_message(
                    &payload,
                    &mut config,
                    &tether_agent,
                    &mut systems,
                    &outputs,
                    &mut osc,
                    &cli.config_path,
                ) {
                    warn!("Command failed: {}", e);
                }
            }

            if inputs.save_config_input.matches(&topic) {
                if let Err(e) = handle_save_config_message(
                    &payload,
                    &mut config,
                    &tether_agent,
                    &mut systems,
                    &outputs,
                    &mut osc,
                    &cli.config_path,
                ) {
                    warn!("Config was not saved: {}", e);
                }
            }
        }

        if !work_done {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
