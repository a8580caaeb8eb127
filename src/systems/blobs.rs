//! Finding person-sized regions in a thresholded image.
//!
//! The tracker only depends on the [`BlobExtractor`] trait; [`ConnectedComponents`]
//! is the extractor used by the agent.

use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{
    Point2D,
    depth_image::{GrayImage, Rect},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub centroid: Point2D,
    pub bounding_rect: Rect,
    /// Boundary pixels, in tracing order
    pub contour: Vec<Point2D>,
    /// Pixel count
    pub area: usize,
}

pub trait BlobExtractor {
    /// Return blobs with `min_area <= area <= max_area`, largest first
    fn find_blobs(&self, image: &GrayImage, min_area: usize, max_area: usize) -> Vec<Blob>;
}

/// 8-connected components of all non-zero pixels
#[derive(Debug, Default, Clone, Copy)]
pub struct ConnectedComponents;

/// Clockwise, starting West, with y increasing downwards
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

const WEST: usize = 0;

type Pixel = (usize, usize);

struct Component {
    label: u32,
    /// Topmost, then leftmost pixel; its West neighbour is never part of the component
    start: Pixel,
    area: usize,
    sum_x: f64,
    sum_y: f64,
    min: Pixel,
    max: Pixel,
}

impl BlobExtractor for ConnectedComponents {
    fn find_blobs(&self, image: &GrayImage, min_area: usize, max_area: usize) -> Vec<Blob> {
        let (labels, mut components) = label_components(image);

        components.retain(|c| c.area >= min_area && c.area <= max_area);
        components.sort_by(|a, b| b.area.cmp(&a.area));

        debug!("Found {} blob(s) within area bounds", components.len());

        components
            .iter()
            .map(|c| {
                let (min_x, min_y) = c.min;
                let (max_x, max_y) = c.max;
                Blob {
                    centroid: (
                        (c.sum_x / c.area as f64) as f32,
                        (c.sum_y / c.area as f64) as f32,
                    ),
                    bounding_rect: Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1),
                    contour: trace_contour(&labels, c.label, c.start)
                        .into_iter()
                        .map(|(x, y)| (x as f32, y as f32))
                        .collect(),
                    area: c.area,
                }
            })
            .collect()
    }
}

fn neighbour(p: Pixel, direction: usize, width: usize, height: usize) -> Option<Pixel> {
    let (dx, dy) = NEIGHBOURS[direction];
    let x = p.0.checked_add_signed(dx)?;
    let y = p.1.checked_add_signed(dy)?;
    if x < width && y < height {
        Some((x, y))
    } else {
        None
    }
}

/// Flood-fill every non-zero pixel into numbered components (labels start at 1)
fn label_components(image: &GrayImage) -> (Array2<u32>, Vec<Component>) {
    let (height, width) = image.dim();
    let mut labels: Array2<u32> = Array2::zeros((height, width));
    let mut components = Vec::new();
    let mut stack: Vec<Pixel> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if image[[y, x]] == 0 || labels[[y, x]] != 0 {
                continue;
            }
            let label = components.len() as u32 + 1;
            let mut component = Component {
                label,
                start: (x, y),
                area: 0,
                sum_x: 0.,
                sum_y: 0.,
                min: (x, y),
                max: (x, y),
            };

            labels[[y, x]] = label;
            stack.push((x, y));
            while let Some(p) = stack.pop() {
                let (px, py) = p;
                component.area += 1;
                component.sum_x += px as f64;
                component.sum_y += py as f64;
                component.min = (component.min.0.min(px), component.min.1.min(py));
                component.max = (component.max.0.max(px), component.max.1.max(py));

                for direction in 0..NEIGHBOURS.len() {
                    if let Some((nx, ny)) = neighbour(p, direction, width, height) {
                        if image[[ny, nx]] != 0 && labels[[ny, nx]] == 0 {
                            labels[[ny, nx]] = label;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            components.push(component);
        }
    }

    (labels, components)
}

/// Moore-neighbour boundary tracing, clockwise from the component's start pixel.
/// Stops when the start pixel is about to be left the same way it was left first.
fn trace_contour(labels: &Array2<u32>, label: u32, start: Pixel) -> Vec<Pixel> {
    let (height, width) = labels.dim();
    let inside = |(x, y): Pixel| labels[[y, x]] == label;

    // From pixel `p`, having arrived with the background neighbour in direction
    // `backtrack`, find the next boundary pixel and the backtrack to use from there
    let step = |p: Pixel, backtrack: usize| -> Option<(Pixel, usize)> {
        for i in 1..=NEIGHBOURS.len() {
            let direction = (backtrack + i) % NEIGHBOURS.len();
            if let Some(next) = neighbour(p, direction, width, height).filter(|q| inside(*q)) {
                // The cell checked just before `next` is background, or off the image
                let (dx, dy) = NEIGHBOURS[(direction + NEIGHBOURS.len() - 1) % NEIGHBOURS.len()];
                let previous = (p.0 as isize + dx, p.1 as isize + dy);
                return Some((next, direction_between(next, previous)));
            }
        }
        None
    };

    let mut contour = vec![start];
    let Some(first) = step(start, WEST) else {
        // Isolated single pixel
        return contour;
    };
    let (first_pixel, _) = first;

    // Every boundary pixel can be visited at most once per side
    let limit = 4 * labels.len() + 8;
    let mut current = first;
    for _ in 0..limit {
        let (p, backtrack) = current;
        let next = step(p, backtrack);
        if p == start && next.is_some_and(|(q, _)| q == first_pixel) {
            break;
        }
        contour.push(p);
        match next {
            Some(n) => current = n,
            None => break,
        }
    }
    contour
}

/// Direction index such that stepping once from `from` lands on `to`
fn direction_between(from: Pixel, to: (isize, isize)) -> usize {
    let dx = to.0 - from.0 as isize;
    let dy = to.1 - from.1 as isize;
    NEIGHBOURS
        .iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(WEST)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn image_from_rows(rows: &[&str]) -> GrayImage {
        let height = rows.len();
        let width = rows[0].len();
        Array2::from_shape_fn((height, width), |(y, x)| {
            if rows[y].as_bytes()[x] == b'#' { 255 } else { 0 }
        })
    }

    #[test]
    fn test_empty_image_has_no_blobs() {
        let image = GrayImage::zeros((10, 10));
        assert!(ConnectedComponents.find_blobs(&image, 0, usize::MAX).is_empty());
    }

    #[test]
    fn test_rectangle_blob() {
        let image = image_from_rows(&[
            "......", //
            ".####.", //
            ".####.", //
            ".####.", //
            "......",
        ]);
        let blobs = ConnectedComponents.find_blobs(&image, 1, 100);
        assert_eq!(blobs.len(), 1);
        let blob = &blobs[0];
        assert_eq!(blob.area, 12);
        assert_eq!(blob.bounding_rect, Rect::new(1, 1, 4, 3));
        assert_eq!(blob.centroid, (2.5, 2.0));

        // Perimeter of a 4x3 rectangle, traced clockwise from the top-left corner
        let expected: Vec<Point2D> = vec![
            (1., 1.),
            (2., 1.),
            (3., 1.),
            (4., 1.),
            (4., 2.),
            (4., 3.),
            (3., 3.),
            (2., 3.),
            (1., 3.),
            (1., 2.),
        ];
        assert_eq!(blob.contour, expected);
    }

    #[test]
    fn test_single_pixel_and_diagonal_connectivity() {
        let image = image_from_rows(&[
            "#....", //
            ".#...", //
            "..#..", //
            ".....", //
            "....#",
        ]);
        let blobs = ConnectedComponents.find_blobs(&image, 1, 100);
        assert_eq!(blobs.len(), 2);
        // Diagonal run is one 8-connected component, listed first (largest)
        assert_eq!(blobs[0].area, 3);
        assert_eq!(blobs[0].bounding_rect, Rect::new(0, 0, 3, 3));
        assert!(blobs[0].contour.contains(&(2., 2.)));

        assert_eq!(blobs[1].area, 1);
        assert_eq!(blobs[1].contour, vec![(4., 4.)]);
    }

    #[test]
    fn test_area_bounds_and_ordering() {
        let image = image_from_rows(&[
            "##...####", //
            "##...####", //
            ".....####", //
            "#........",
        ]);
        let all = ConnectedComponents.find_blobs(&image, 0, usize::MAX);
        let areas: Vec<usize> = all.iter().map(|b| b.area).collect();
        assert_eq!(areas, vec![12, 4, 1]);

        let bounded = ConnectedComponents.find_blobs(&image, 2, 10);
        assert_eq!(bounded.len(), 1);
        assert_eq!(bounded[0].area, 4);
    }

    #[test]
    fn test_contour_reaches_top_of_concave_shape() {
        // A "person" with a head on top of a wider body
        let image = image_from_rows(&[
            "..........", //
            "....##....", //
            "....##....", //
            "..######..", //
            "..######..", //
            "..######..", //
            "..........",
        ]);
        let blobs = ConnectedComponents.find_blobs(&image, 1, 100);
        let contour = &blobs[0].contour;
        assert_eq!(contour[0], (4., 1.));
        for corner in [(2., 3.), (7., 3.), (7., 5.), (2., 5.), (5., 1.)] {
            assert!(contour.contains(&corner), "missing {:?}", corner);
        }
        // Interior pixels are not part of the boundary
        assert!(!contour.contains(&(4., 4.)));
    }

    #[test]
    fn test_blob_touching_image_edges() {
        let image = array![[255u8, 255], [255, 255]];
        let blobs = ConnectedComponents.find_blobs(&image, 1, 10);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].contour, vec![(0., 0.), (1., 0.), (1., 1.), (0., 1.)]);
    }
}
