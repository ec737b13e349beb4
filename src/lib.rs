pub mod bus;
pub mod capturer;
pub mod codes;
pub mod config;
pub mod decoder;
pub mod display;
pub mod error;
pub mod frame;
pub mod overlay;
pub mod pipeline;
pub mod scanner;
pub mod vision;
