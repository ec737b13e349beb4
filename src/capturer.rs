use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
};

use image::RgbImage;
use tracing::{debug, error, info, warn};

use crate::{
    error::ScanError,
    frame::{CapturedFrame, LatestFrame},
};

#[cfg(feature = "camera")]
pub mod camera;

/// Requested capture profile. The device may negotiate something else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: [u8; 4],
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            codec: *b"MJPG",
        }
    }
}

impl CaptureSettings {
    pub fn codec_str(&self) -> String {
        String::from_utf8_lossy(&self.codec).into_owned()
    }
}

/// What the device actually delivers after configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// An opened capture device. Dropping it releases the device.
pub trait FrameSource {
    /// Best-effort configuration; returns the parameters the device settled on.
    fn configure(&mut self, settings: &CaptureSettings) -> Result<NegotiatedFormat, ScanError>;

    /// Next frame. An error means the stream has ended or the device is gone.
    fn read(&mut self) -> Result<RgbImage, ScanError>;
}

pub trait CameraBackend: Send + Sync {
    /// Indices in `0..max` that can currently be opened.
    fn available(&self, max: u32) -> Vec<u32>;

    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, ScanError>;
}

pub struct Capturer {
    pub negotiated: NegotiatedFormat,
    handle: Option<thread::JoinHandle<Result<(), ScanError>>>,
}

impl Capturer {
    /// Wait for the capture thread and return how its stream ended.
    pub fn join(mut self) -> Result<(), ScanError> {
        self.join_inner()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    fn join_inner(&mut self) -> Result<(), ScanError> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(ScanError::Read("capture thread panicked".into()))),
            None => Ok(()),
        }
    }
}

/// Returns once the device is open and configured. A later read failure clears `running`.
pub fn start_capturer<B>(
    backend: Arc<B>,
    device: u32,
    settings: CaptureSettings,
    latest: Arc<LatestFrame>,
    running: Arc<AtomicBool>,
) -> Result<Capturer, ScanError>
where
    B: CameraBackend + ?Sized + 'static,
{
    let (init_tx, init_rx) = mpsc::channel();

    let handle = thread::Builder::new()
        .name("dmscan-capture".into())
        .spawn(move || {
            let mut source = match backend.open(device) {
                Ok(source) => source,
                Err(e) => {
                    let _ = init_tx.send(Err(ScanError::DeviceUnavailable { index: device }));
                    return Err(e);
                }
            };

            let negotiated = match source.configure(&settings) {
                Ok(v) => v,
                Err(e) => {
                    let _ = init_tx.send(Err(ScanError::DeviceUnavailable { index: device }));
                    return Err(e);
                }
            };

            info!(
                "Camera #{device}: {}x{} {}fps (requested {}x{} {}fps {})",
                negotiated.width,
                negotiated.height,
                negotiated.fps,
                settings.width,
                settings.height,
                settings.fps,
                settings.codec_str()
            );
            let _ = init_tx.send(Ok(negotiated));

            capture_loop(source.as_mut(), &latest, &running)
        })
        .map_err(|e| ScanError::Read(format!("failed to spawn capture thread: {e}")))?;

    let mut capturer = Capturer {
        negotiated: NegotiatedFormat {
            width: 0,
            height: 0,
            fps: 0,
        },
        handle: Some(handle),
    };

    match init_rx.recv() {
        Ok(Ok(negotiated)) => {
            capturer.negotiated = negotiated;
            Ok(capturer)
        }
        Ok(Err(e)) => {
            if let Err(cause) = capturer.join_inner() {
                debug!("capture start-up failed: {cause}");
            }
            Err(e)
        }
        Err(_) => Err(capturer
            .join_inner()
            .err()
            .unwrap_or(ScanError::DeviceUnavailable { index: device })),
    }
}

fn capture_loop(
    source: &mut dyn FrameSource,
    latest: &LatestFrame,
    running: &AtomicBool,
) -> Result<(), ScanError> {
    while running.load(Ordering::Relaxed) {
        match source.read() {
            Ok(image) => latest.publish(Arc::new(CapturedFrame::new(image))),
            Err(e) => {
                warn!("Capture stream ended: {e}");
                running.store(false, Ordering::Relaxed);
                return Err(e);
            }
        }
    }

    debug!("capture thread stopping");
    Ok(())
}

pub fn list_cameras<B: CameraBackend + ?Sized>(backend: &B, max: u32) -> Vec<u32> {
    let found = backend.available(max);
    if found.is_empty() {
        error!("No cameras found in indices 0..{max}");
    } else {
        info!("Available cameras: {found:?}");
    }
    found
}
