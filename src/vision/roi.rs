use image::GrayImage;
use imageproc::{
    contours::{BorderType, find_contours},
    distance_transform::Norm,
    edges::canny,
    geometry::contour_area,
    morphology::dilate,
    rect::Rect,
};

use crate::vision::geometry::bounding_rect;

#[derive(Clone, Debug, PartialEq)]
pub struct RoiParams {
    pub canny_low: f32,
    pub canny_high: f32,
    /// Chebyshev radius of the dilation; 1 is a 3x3 square.
    pub dilate_radius: u8,
    pub min_area: f64,
    pub min_side: u32,
    /// Largest admitted fraction of the frame width or height.
    pub max_fraction: f64,
}

impl Default for RoiParams {
    fn default() -> Self {
        Self {
            canny_low: 80.0,
            canny_high: 160.0,
            dilate_radius: 1,
            min_area: 2000.0,
            min_side: 40,
            max_fraction: 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    pub rect: Rect,
    pub area: f64,
}

#[derive(Clone, Debug, Default)]
pub struct RoiDetector {
    params: RoiParams,
}

impl RoiDetector {
    pub fn new(params: RoiParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &RoiParams {
        &self.params
    }

    /// Find admitted regions in discovery order.
    pub fn detect(&self, gray: &GrayImage) -> Vec<Roi> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let edges = canny(gray, self.params.canny_low, self.params.canny_high);
        let dilated = dilate(&edges, Norm::LInf, self.params.dilate_radius);

        find_contours::<i32>(&dilated)
            .into_iter()
            // outermost borders only
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|contour| {
                let rect = bounding_rect(&contour.points)?;
                let roi = Roi {
                    rect,
                    area: contour_area(&contour.points),
                };
                self.admits(&roi, width, height).then_some(roi)
            })
            .collect()
    }

    pub fn admits(&self, roi: &Roi, frame_width: u32, frame_height: u32) -> bool {
        let p = &self.params;
        let (w, h) = (roi.rect.width(), roi.rect.height());

        roi.area >= p.min_area
            && w >= p.min_side
            && h >= p.min_side
            && w as f64 <= frame_width as f64 * p.max_fraction
            && h as f64 <= frame_height as f64 * p.max_fraction
    }
}
