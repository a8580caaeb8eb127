use crate::Point2D;

/// Exact at `t = 0`, and whenever `a == b`
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Interpolate between two points; `t = 0` gives `a`, `t = 1` gives `b`
pub fn lerp_points(a: &Point2D, b: &Point2D, t: f32) -> Point2D {
    let (x1, y1) = *a;
    let (x2, y2) = *b;
    (lerp(x1, x2, t), lerp(y1, y2, t))
}

/// Rotation-free offset of a pixel from the centre of an image axis, in the range
/// [-1,1] at the edges, positive towards the origin (left/top) as seen by the sensor.
pub fn offset_from_centre(v: f32, extent: f32) -> f32 {
    let half = extent / 2.0;
    -(v - half) / half
}
