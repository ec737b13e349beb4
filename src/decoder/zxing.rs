use std::time::{Duration, Instant};

use image::GrayImage;
use imageproc::point::Point;
use tracing::trace;
use zxingcpp::BarcodeFormat;

use crate::{
    decoder::{Geometry, Symbol, SymbolDecoder},
    error::ScanError,
    vision::geometry::bounding_rect,
};

// zxing-cpp cannot be cancelled, so `timeout` is only checked after the call.
#[derive(Default)]
pub struct ZxingDecoder;

impl SymbolDecoder for ZxingDecoder {
    fn decode(&mut self, image: &GrayImage, timeout: Duration) -> Result<Vec<Symbol>, ScanError> {
        let started = Instant::now();
        let reader = zxingcpp::read()
            .formats(BarcodeFormat::DataMatrix)
            .try_invert(false);
        let barcodes = reader
            .from(image)
            .map_err(|e| ScanError::Decode(e.to_string()))?;

        let symbols = barcodes
            .iter()
            .filter_map(|barcode| {
                let pos = barcode.position();
                let corners = vec![
                    Point::new(pos.top_left.x, pos.top_left.y),
                    Point::new(pos.top_right.x, pos.top_right.y),
                    Point::new(pos.bottom_right.x, pos.bottom_right.y),
                    Point::new(pos.bottom_left.x, pos.bottom_left.y),
                ];
                let rect = bounding_rect(&corners)?;
                Some(Symbol {
                    payload: barcode.bytes(),
                    geometry: Geometry::resolve(Some(corners), rect),
                })
            })
            .collect::<Vec<_>>();

        let elapsed = started.elapsed();
        if elapsed > timeout {
            trace!(
                ?elapsed,
                ?timeout,
                width = image.width(),
                height = image.height(),
                "decode overran its budget"
            );
        }

        Ok(symbols)
    }
}
