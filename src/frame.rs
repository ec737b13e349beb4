use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use image::{DynamicImage, GrayImage, RgbImage};
use tracing::error;

pub struct CapturedFrame {
    pub timestamp: Instant,
    pub image: RgbImage,
}

impl CapturedFrame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            timestamp: Instant::now(),
            image,
        }
    }

    pub fn to_gray(&self) -> GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).into_luma8()
    }
}

pub struct LatestFrame {
    frame: Mutex<Option<Arc<CapturedFrame>>>,
}

impl Default for LatestFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl LatestFrame {
    pub fn new() -> Self {
        Self {
            frame: Mutex::new(None),
        }
    }

    pub fn publish(&self, frame: Arc<CapturedFrame>) {
        match self.frame.lock() {
            Ok(mut slot) => *slot = Some(frame),
            Err(e) => error!("Failed to lock frame slot to publish frame: {e:?}"),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<CapturedFrame>> {
        match self.frame.lock() {
            Ok(slot) => slot.clone(),
            Err(e) => {
                error!("Failed to lock frame slot to read frame: {e:?}");
                None
            }
        }
    }

    pub fn clear(&self) {
        match self.frame.lock() {
            Ok(mut slot) => *slot = None,
            Err(e) => error!("Failed to lock frame slot to clear it: {e:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn snapshot_returns_latest_publish() {
        let latest = LatestFrame::new();
        assert!(latest.snapshot().is_none());

        let first = Arc::new(CapturedFrame::new(RgbImage::new(4, 4)));
        let second = Arc::new(CapturedFrame::new(RgbImage::new(8, 8)));
        latest.publish(first);
        latest.publish(second.clone());

        let snap = latest.snapshot().unwrap();
        assert!(Arc::ptr_eq(&snap, &second));

        latest.clear();
        assert!(latest.snapshot().is_none());
    }

    #[test]
    fn gray_conversion_keeps_dimensions() {
        let frame = CapturedFrame::new(RgbImage::from_pixel(6, 3, Rgb([255, 255, 255])));
        let gray = frame.to_gray();
        assert_eq!(gray.dimensions(), (6, 3));
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
    }
}
