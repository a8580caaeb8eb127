use map_range::MapRange;

use crate::{
    depth_image::Rect,
    geometry_utils::offset_from_centre,
    tracker_config::TrackerConfig,
    tracking::{HeadPoint, MappedPoint},
};

/// Size of the full (uncropped) sensor frame, and where the crop sits in it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub width: f32,
    pub height: f32,
    pub crop: Rect,
}

impl FrameGeometry {
    pub fn new(width: usize, height: usize, crop: Rect) -> Self {
        FrameGeometry {
            width: width as f32,
            height: height as f32,
            crop,
        }
    }

    pub fn uncropped(width: usize, height: usize) -> Self {
        FrameGeometry::new(width, height, Rect::new(0, 0, width, height))
    }
}

/// Convert a smoothed head (cropped image coordinates, depth in mm) into output
/// units: either real-world mm relative to the sensor's boresight, or image
/// coordinates optionally normalised and/or scaled per axis. The floor offset is
/// added to y in both cases.
pub fn remap_head(head: &HeadPoint, geometry: &FrameGeometry, config: &TrackerConfig) -> MappedPoint {
    let x = head.x + geometry.crop.left as f32;
    let y = head.y + geometry.crop.top as f32;
    let z = head.z;

    let mut mapped = if config.tracking.real_world_values {
        real_world(x, y, z, geometry, config)
    } else {
        normalise_and_scale(x, y, z, geometry, config)
    };

    mapped.y += config.trigonometry.distance_floor;
    mapped
}

fn real_world(x: f32, y: f32, z: f32, geometry: &FrameGeometry, config: &TrackerConfig) -> MappedPoint {
    let half_fov_h = (config.trigonometry.fov_h / 2.).to_radians();
    let half_fov_v = (config.trigonometry.fov_v / 2.).to_radians();
    MappedPoint::new(
        offset_from_centre(x, geometry.width) * half_fov_h.sin() * z,
        offset_from_centre(y, geometry.height) * half_fov_v.sin() * z,
        z,
    )
}

fn normalise_and_scale(
    x: f32,
    y: f32,
    z: f32,
    geometry: &FrameGeometry,
    config: &TrackerConfig,
) -> MappedPoint {
    let normalize = &config.normalize;
    let scale = &config.scale;
    let tracking = &config.tracking;

    let mut mapped = MappedPoint::new(x, y, z);

    if normalize.x {
        mapped.x = x.map_range(0. ..geometry.width, 0. ..1.);
    }
    if normalize.y {
        mapped.y = y.map_range(0. ..geometry.height, 0. ..1.);
    }
    if normalize.z {
        mapped.z = z.map_range(tracking.near_clipping..tracking.far_clipping, 0. ..1.);
    }

    if scale.x {
        mapped.x *= scale.x_amount;
    }
    if scale.y {
        mapped.y *= scale.y_amount;
    }
    if scale.z {
        mapped.z *= scale.z_amount;
    }

    mapped
}
