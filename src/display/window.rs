use image::RgbImage;
use minifb::{KeyRepeat, ScaleMode, Window, WindowOptions};
use tracing::info;

use crate::{
    display::{DisplaySurface, Key},
    error::ScanError,
};

/// Desktop window created on the first frame, sized to match it.
pub struct WindowDisplay {
    title: String,
    window: Option<Window>,
    buffer: Vec<u32>,
}

impl WindowDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window: None,
            buffer: Vec::new(),
        }
    }

    fn window_for(&mut self, width: usize, height: usize) -> Result<&mut Window, ScanError> {
        if self.window.is_none() {
            let window = Window::new(
                &self.title,
                width,
                height,
                WindowOptions {
                    resize: true,
                    scale_mode: ScaleMode::AspectRatioStretch,
                    ..WindowOptions::default()
                },
            )
            .map_err(|e| ScanError::Display(e.to_string()))?;
            info!("Opened {width}x{height} window");
            self.window = Some(window);
        }

        self.window
            .as_mut()
            .ok_or_else(|| ScanError::Display("window missing".into()))
    }
}

impl DisplaySurface for WindowDisplay {
    fn show(&mut self, frame: &RgbImage) -> Result<(), ScanError> {
        let (width, height) = (frame.width() as usize, frame.height() as usize);

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        buffer.extend(
            frame
                .pixels()
                .map(|p| (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32),
        );

        let outcome = self
            .window_for(width, height)?
            .update_with_buffer(&buffer, width, height)
            .map_err(|e| ScanError::Display(e.to_string()));
        self.buffer = buffer;
        outcome
    }

    fn poll_keys(&mut self) -> Vec<Key> {
        let Some(window) = self.window.as_ref() else {
            return Vec::new();
        };

        window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .filter_map(|key| match key {
                minifb::Key::C => Some(Key::Char('c')),
                minifb::Key::Q => Some(Key::Char('q')),
                minifb::Key::Escape => Some(Key::Escape),
                _ => None,
            })
            .collect()
    }

    fn is_open(&self) -> bool {
        self.window.as_ref().is_none_or(|w| w.is_open())
    }
}
