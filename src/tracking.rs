use serde::{Deserialize, Serialize};

use crate::{Point2D, depth_image::Rect};

/// Image-space head estimate; `z` is distance in mm
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct HeadPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Final output coordinates, after real-world or normalised/scaled conversion
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct MappedPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Person {
    pub position: Point2D,
    pub width: usize,
    pub height: usize,
}

impl HeadPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        HeadPoint { x, y, z }
    }
}

impl MappedPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        MappedPoint { x, y, z }
    }
}

/// Everything a remote viewer needs to draw the tracking overlay for one frame.
/// Image-space points are relative to the cropped area, which is included.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TrackedHead {
    pub crop: Rect,
    pub person: Person,
    pub highest_point: Point2D,
    pub raw_head: HeadPoint,
    pub smoothed_head: HeadPoint,
    pub mapped_head: MappedPoint,
}
