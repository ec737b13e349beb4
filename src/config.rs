use std::time::Duration;

use clap::Parser;

use crate::{
    capturer::CaptureSettings, error::ScanError, pipeline::PipelineParams, vision::RoiParams,
};

/// Live-camera DataMatrix scanner.
#[derive(Debug, Parser, Clone)]
#[command(name = "dmscan", version, about)]
pub struct ScannerArgs {
    /// Capture device index; defaults to the first device found
    #[arg(long)]
    pub device: Option<u32>,

    /// Requested frame width
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Requested frame height
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Requested frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Requested four-character pixel codec
    #[arg(long, default_value = "MJPG")]
    pub codec: String,

    /// Number of device indices tried when looking for cameras
    #[arg(long, default_value_t = 4)]
    pub max_devices: u32,

    /// Render tick interval in milliseconds
    #[arg(long, default_value_t = 15)]
    pub tick_ms: u64,

    /// Distinct code count whose elapsed time is reported
    #[arg(long, default_value_t = 10)]
    pub milestone: usize,

    /// How long an outline stays on screen without a fresh decode, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub track_timeout_ms: u64,

    /// List available cameras and exit
    #[arg(long)]
    pub list: bool,
}

/// Validated scanner settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ScannerConfig {
    pub device: Option<u32>,
    pub capture: CaptureSettings,
    pub max_devices: u32,
    pub tick: Duration,
    pub milestone: usize,
    pub track_timeout: Duration,
    pub roi: RoiParams,
    pub pipeline: PipelineParams,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            device: None,
            capture: CaptureSettings::default(),
            max_devices: 4,
            tick: Duration::from_millis(15),
            milestone: 10,
            track_timeout: Duration::from_millis(500),
            roi: RoiParams::default(),
            pipeline: PipelineParams::default(),
        }
    }
}

fn non_zero<T: PartialEq + Default>(value: T, flag: &str) -> Result<T, ScanError> {
    if value == T::default() {
        return Err(ScanError::InvalidConfig(format!("--{flag} must be greater than zero")));
    }
    Ok(value)
}

fn parse_codec(codec: &str) -> Result<[u8; 4], ScanError> {
    let bytes = codec.as_bytes();
    match <[u8; 4]>::try_from(bytes) {
        Ok(fourcc) if fourcc.iter().all(|b| b.is_ascii_graphic()) => Ok(fourcc),
        _ => Err(ScanError::InvalidConfig(format!(
            "--codec must be four ASCII characters, got {codec:?}"
        ))),
    }
}

impl TryFrom<ScannerArgs> for ScannerConfig {
    type Error = ScanError;

    fn try_from(args: ScannerArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            device: args.device,
            capture: CaptureSettings {
                width: non_zero(args.width, "width")?,
                height: non_zero(args.height, "height")?,
                fps: non_zero(args.fps, "fps")?,
                codec: parse_codec(&args.codec)?,
            },
            max_devices: args.max_devices,
            tick: Duration::from_millis(non_zero(args.tick_ms, "tick-ms")?),
            milestone: non_zero(args.milestone, "milestone")?,
            track_timeout: Duration::from_millis(args.track_timeout_ms),
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<ScannerConfig, ScanError> {
        let args = ScannerArgs::try_parse_from(std::iter::once("dmscan").chain(args.iter().copied()))
            .unwrap();
        ScannerConfig::try_from(args)
    }

    #[test]
    fn defaults_match_capture_profile() {
        let config = parse(&[]).unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.capture.codec, *b"MJPG");
        assert_eq!(config.track_timeout, Duration::from_millis(500));
        assert_eq!(config.pipeline.fallback_below, 2);
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let config = parse(&[
            "--device", "2", "--width", "1280", "--height", "720", "--fps", "60", "--codec",
            "YUYV", "--milestone", "5",
        ])
        .unwrap();

        assert_eq!(config.device, Some(2));
        assert_eq!(
            config.capture,
            CaptureSettings {
                width: 1280,
                height: 720,
                fps: 60,
                codec: *b"YUYV",
            }
        );
        assert_eq!(config.milestone, 5);
    }

    #[test]
    fn zero_values_are_rejected() {
        for flag in ["--width", "--height", "--fps", "--tick-ms", "--milestone"] {
            let outcome = parse(&[flag, "0"]);
            assert!(
                matches!(outcome, Err(ScanError::InvalidConfig(_))),
                "{flag} accepted zero"
            );
        }
    }

    #[test]
    fn malformed_codecs_are_rejected() {
        for codec in ["MJP", "MJPEG", "MJ G", "ÄBC"] {
            assert!(parse(&["--codec", codec]).is_err(), "{codec} accepted");
        }
    }

    #[test]
    fn list_flag_parses() {
        let args = ScannerArgs::try_parse_from(["dmscan", "--list", "--max-devices", "8"]).unwrap();
        assert!(args.list);
        assert_eq!(args.max_devices, 8);
    }
}
