pub mod control;
pub mod depth_image;
pub mod geometry_utils;
pub mod osc_output;
pub mod systems;
pub mod tether_interface;
pub mod tracker_config;
pub mod tracking;

pub type Point2D = (f32, f32);
