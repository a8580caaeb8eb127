use std::net::{IpAddr, Ipv4Addr};

use clap::{Parser, command};

// Some defaults; some of which can be overriden via CLI args
const CONFIG_FILE_PATH: &str = "./headTracker.json";
const TETHER_HOST: std::net::IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Where to load and save tracker settings
    #[arg(long="configPath",default_value_t=String::from(CONFIG_FILE_PATH))]
    pub config_path: String,

    /// The IP address of the MQTT broker (server)
    #[arg(long = "tether.host", default_value_t=TETHER_HOST)]
    pub tether_host: std::net::IpAddr,

    /// The Agent Role (type)
    #[arg(long="tether.role",default_value_t=String::from("headTracker"))]
    pub agent_role: String,

    /// The Agent Group (ID)
    #[arg(long="tether.group",default_value_t=String::from("any"))]
    pub agent_group: String,

    #[arg(long = "loglevel",default_value_t=String::from("info"))]
    pub log_level: String,

    /// Override the OSC address pattern for head messages (e.g. "/head"); stays
    /// in effect when settings are loaded or reset
    #[arg(long = "oscAddress")]
    pub osc_address: Option<String>,
}
