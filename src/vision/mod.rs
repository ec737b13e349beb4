pub mod crop;
pub mod geometry;
pub mod roi;

pub use roi::{Roi, RoiDetector, RoiParams};
