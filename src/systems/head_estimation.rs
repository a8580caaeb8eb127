use log::debug;

use crate::{
    Point2D,
    geometry_utils::lerp_points,
    tracking::{HeadPoint, Person},
};

use super::blobs::Blob;

pub struct HeadSettings {
    /// Only contour points within this many pixels (horizontally) of the
    /// person's centroid are considered when looking for the top of the head
    pub highest_point_threshold: f32,
    /// 0 = the centroid, 1 = the highest point
    pub head_interpolation: f32,
}

/// The raw (unsmoothed) result for a single detected person
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadEstimate {
    pub person: Person,
    pub highest_point: Point2D,
    /// Only x,y are estimated here; z is filled in from the depth frame later
    pub head: Point2D,
}

/// Use the first blob (the extractor lists the largest first) as the person, and
/// place the head somewhere between its centroid and the top of its outline.
/// Returns None when there is no blob at all.
pub fn estimate_head(blobs: &[Blob], settings: &HeadSettings) -> Option<HeadEstimate> {
    let blob = blobs.first()?;

    let person = Person {
        position: blob.centroid,
        width: blob.bounding_rect.width,
        height: blob.bounding_rect.height,
    };

    let highest_point = find_highest_point(
        &blob.contour,
        person.position,
        settings.highest_point_threshold,
    );

    let head = lerp_points(&person.position, &highest_point, settings.head_interpolation);
    debug!(
        "Person at {:?}, highest point {:?}, head {:?}",
        person.position, highest_point, head
    );

    Some(HeadEstimate {
        person,
        highest_point,
        head,
    })
}

/// Topmost contour point (smallest y) inside a vertical band around `centre`.
/// Falls back to `centre` itself if nothing lies inside the band, so outstretched
/// arms or a malformed contour never drag the head sideways.
pub fn find_highest_point(contour: &[Point2D], centre: Point2D, band_half_width: f32) -> Point2D {
    let (centre_x, _) = centre;
    contour
        .iter()
        .filter(|(x, _)| (x - centre_x).abs() < band_half_width)
        .fold(None, |highest: Option<Point2D>, p| match highest {
            Some(h) if h.1 <= p.1 => Some(h),
            _ => Some(*p),
        })
        .unwrap_or(centre)
}

impl HeadEstimate {
    pub fn raw_head(&self, z: f32) -> HeadPoint {
        let (x, y) = self.head;
        HeadPoint::new(x, y, z)
    }
}
