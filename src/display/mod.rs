use image::RgbImage;

use crate::error::ScanError;

#[cfg(feature = "display")]
pub mod window;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Escape,
}

pub trait DisplaySurface {
    fn show(&mut self, frame: &RgbImage) -> Result<(), ScanError>;

    /// Keys pressed since the last poll.
    fn poll_keys(&mut self) -> Vec<Key>;

    fn is_open(&self) -> bool;
}
