use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("capture device #{index} is unavailable")]
    DeviceUnavailable { index: u32 },
    #[error("no capture devices found")]
    NoDevices,
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("display surface failed: {0}")]
    Display(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
