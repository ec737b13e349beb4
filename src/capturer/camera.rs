use image::RgbImage;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution},
};
use tracing::{debug, warn};

use crate::{
    capturer::{CameraBackend, CaptureSettings, FrameSource, NegotiatedFormat},
    error::ScanError,
};

#[derive(Default)]
pub struct NokhwaBackend;

impl CameraBackend for NokhwaBackend {
    fn available(&self, max: u32) -> Vec<u32> {
        (0..max)
            .filter(|index| {
                let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
                match Camera::new(CameraIndex::Index(*index), requested) {
                    Ok(_) => true,
                    Err(e) => {
                        debug!("Camera #{index} not available: {e}");
                        false
                    }
                }
            })
            .collect()
    }

    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, ScanError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let camera = Camera::new(CameraIndex::Index(index), requested).map_err(|e| {
            warn!("Failed to open camera #{index}: {e}");
            ScanError::DeviceUnavailable { index }
        })?;

        Ok(Box::new(NokhwaSource {
            index,
            camera,
            streaming: false,
        }))
    }
}

pub struct NokhwaSource {
    index: u32,
    camera: Camera,
    streaming: bool,
}

fn frame_format(codec: &[u8; 4]) -> FrameFormat {
    match codec {
        b"MJPG" => FrameFormat::MJPEG,
        b"YUYV" | b"YUY2" => FrameFormat::YUYV,
        b"NV12" => FrameFormat::NV12,
        b"GREY" | b"GRAY" => FrameFormat::GRAY,
        other => {
            warn!(
                "Unsupported codec {}, falling back to MJPG",
                String::from_utf8_lossy(other)
            );
            FrameFormat::MJPEG
        }
    }
}

impl FrameSource for NokhwaSource {
    fn configure(&mut self, settings: &CaptureSettings) -> Result<NegotiatedFormat, ScanError> {
        let wanted = CameraFormat::new(
            Resolution::new(settings.width, settings.height),
            frame_format(&settings.codec),
            settings.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(wanted));
        if let Err(e) = self.camera.set_camera_requset(requested) {
            warn!("Camera #{} rejected requested format: {e}", self.index);
        }

        self.camera.open_stream().map_err(|e| {
            warn!("Failed to open stream on camera #{}: {e}", self.index);
            ScanError::DeviceUnavailable { index: self.index }
        })?;
        self.streaming = true;

        let resolution = self.camera.resolution();
        Ok(NegotiatedFormat {
            width: resolution.width(),
            height: resolution.height(),
            fps: self.camera.frame_rate(),
        })
    }

    fn read(&mut self) -> Result<RgbImage, ScanError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| ScanError::Read(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| ScanError::Read(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());

        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| ScanError::Read(format!("short frame buffer for {width}x{height}")))
    }
}

impl Drop for NokhwaSource {
    fn drop(&mut self) {
        if self.streaming {
            if let Err(e) = self.camera.stop_stream() {
                warn!("Failed to release camera #{}: {e}", self.index);
            }
        }
    }
}
