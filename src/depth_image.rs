//! Depth frames and the 8-bit working images derived from them.
//!
//! All images are `ndarray` arrays indexed `[[row, col]]`, i.e. `[[y, x]]`.
//! Every operation here returns a fresh image; nothing is modified in place.

use anyhow::{Result, anyhow};
use ndarray::{Array2, Zip, s};
use serde::{Deserialize, Serialize};

/// 8-bit depth/threshold image, "near is bright"
pub type GrayImage = Array2<u8>;

/// A full sensor frame of distances in millimetres; 0 means "no reading"
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    distances: Array2<u16>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: usize,
    pub top: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(left: usize, top: usize, width: usize, height: usize) -> Self {
        Rect {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> usize {
        self.left + self.width
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }
}

impl DepthFrame {
    pub fn new(distances: Array2<u16>) -> Self {
        DepthFrame { distances }
    }

    /// Build from row-major samples, as delivered by the sensor agent
    pub fn from_samples(width: usize, height: usize, samples: Vec<u16>) -> Result<Self> {
        Array2::from_shape_vec((height, width), samples)
            .map(DepthFrame::new)
            .map_err(|e| anyhow!("Depth frame is not {}x{}: {}", width, height, e))
    }

    pub fn width(&self) -> usize {
        self.distances.ncols()
    }

    pub fn height(&self) -> usize {
        self.distances.nrows()
    }

    pub fn distances(&self) -> &Array2<u16> {
        &self.distances
    }

    /// Copy out the region inside `rect`; the rect is clamped to the frame first
    pub fn crop(&self, rect: &Rect) -> DepthFrame {
        let rect = clamp_rect(rect, self.width(), self.height());
        DepthFrame {
            distances: self
                .distances
                .slice(s![rect.top..rect.bottom(), rect.left..rect.right()])
                .to_owned(),
        }
    }

    /// Distance (mm) at an image-space point, rounded to the nearest pixel.
    /// Anything outside the frame reads as 0, the sensor's "no data" value.
    pub fn distance_at(&self, x: f32, y: f32) -> u16 {
        if !x.is_finite() || !y.is_finite() {
            return 0;
        }
        let (col, row) = (x.round(), y.round());
        if col < 0. || row < 0. {
            return 0;
        }
        self.distances
            .get((row as usize, col as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Convert to an 8-bit image where the near clipping plane is 255 and the far
    /// plane is 0. Samples beyond the planes are clamped; missing samples stay 0.
    pub fn to_gray(&self, near_clipping: f32, far_clipping: f32) -> GrayImage {
        let range = far_clipping - near_clipping;
        self.distances.mapv(|mm| {
            if mm == 0 || range <= 0. {
                return 0;
            }
            let t = ((mm as f32 - near_clipping) / range).clamp(0., 1.);
            (255. * (1. - t)).round() as u8
        })
    }
}

pub fn clamp_rect(rect: &Rect, frame_width: usize, frame_height: usize) -> Rect {
    let left = rect.left.min(frame_width);
    let top = rect.top.min(frame_height);
    Rect {
        left,
        top,
        width: rect.width.min(frame_width - left),
        height: rect.height.min(frame_height - top),
    }
}

/// Binary threshold: strictly brighter than `threshold` becomes 255, everything else 0
pub fn threshold(image: &GrayImage, threshold: u8) -> GrayImage {
    image.mapv(|v| if v > threshold { 255 } else { 0 })
}

/// Per-pixel `max(a - b, 0)`
pub fn saturating_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = GrayImage::zeros(a.raw_dim());
    Zip::from(&mut out)
        .and(a)
        .and(b)
        .for_each(|o, &a, &b| *o = a.saturating_sub(b));
    out
}

/// Per-pixel `weight_a * a + weight_b * b`, rounded and saturated
pub fn weighted_sum(a: &GrayImage, weight_a: f32, b: &GrayImage, weight_b: f32) -> GrayImage {
    let mut out = GrayImage::zeros(a.raw_dim());
    Zip::from(&mut out).and(a).and(b).for_each(|o, &a, &b| {
        *o = (a as f32 * weight_a + b as f32 * weight_b)
            .round()
            .clamp(0., 255.) as u8
    });
    out
}
