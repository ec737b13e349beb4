use std::time::Duration;

use image::GrayImage;
use imageproc::{point::Point, rect::Rect};

use crate::{
    error::ScanError,
    vision::geometry::{Polygon, rect_polygon, translate},
};

#[cfg(feature = "zxing")]
pub mod zxing;

#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    Rect(Rect),
}

impl Geometry {
    pub fn resolve(polygon: Option<Polygon>, rect: Rect) -> Self {
        match polygon {
            Some(points) if points.len() >= 3 => Geometry::Polygon(points),
            _ => Geometry::Rect(rect),
        }
    }

    /// Outline in absolute coordinates once shifted by `origin`.
    pub fn to_polygon(&self, origin: Point<i32>) -> Polygon {
        match self {
            Geometry::Polygon(points) => translate(points, origin),
            Geometry::Rect(rect) => translate(&rect_polygon(rect), origin),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub payload: Vec<u8>,
    pub geometry: Geometry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecodeResult {
    pub payload: Vec<u8>,
    /// Top-left of the decoded region, `(0, 0)` for whole-frame decodes.
    pub origin: Point<i32>,
    pub geometry: Geometry,
}

impl DecodeResult {
    pub fn new(symbol: Symbol, origin: Point<i32>) -> Self {
        Self {
            payload: symbol.payload,
            origin,
            geometry: symbol.geometry,
        }
    }

    /// Payload as text; invalid UTF-8 sequences are replaced, never rejected.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    pub fn absolute_polygon(&self) -> Polygon {
        self.geometry.to_polygon(self.origin)
    }
}

/// An empty result is not an error.
pub trait SymbolDecoder: Send {
    fn decode(&mut self, image: &GrayImage, timeout: Duration) -> Result<Vec<Symbol>, ScanError>;
}

impl<D: SymbolDecoder + ?Sized> SymbolDecoder for Box<D> {
    fn decode(&mut self, image: &GrayImage, timeout: Duration) -> Result<Vec<Symbol>, ScanError> {
        (**self).decode(image, timeout)
    }
}
