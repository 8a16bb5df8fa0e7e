//! Shared helpers for unit tests.

use crate::config::Settings;
use crate::prompt::Confirm;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::cell::Cell;
use std::path::Path;

/// Write a synthetic JPEG with a simple gradient pattern so every test
/// image is a valid, decodable photo with distinct content per size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, 90);
    img.write_with_encoder(encoder).unwrap();
}

/// Settings rooted under a temp directory, with small artifact sizes so
/// resize tests stay fast. Verbose disables the progress bar.
pub fn test_settings(root: &Path) -> Settings {
    Settings {
        output_dir: root.join("out").to_string_lossy().into_owned(),
        markdown_dir: root.join("md").to_string_lossy().into_owned(),
        verbose: true,
        sizes: crate::config::SizesConfig {
            large: 200,
            small: 100,
            thumb: 64,
            cover: 80,
            quality: 90,
        },
        ..Settings::default()
    }
}

/// A [`Confirm`] that always gives the scripted answer and counts how
/// often it was asked.
pub struct ScriptedPrompt {
    answer: bool,
    asked: Cell<u32>,
}

impl ScriptedPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Cell::new(0),
        }
    }

    pub fn times_asked(&self) -> u32 {
        self.asked.get()
    }
}

impl Confirm for ScriptedPrompt {
    fn ask_yes_no(&self, _message: &str) -> bool {
        self.asked.set(self.asked.get() + 1);
        self.answer
    }
}
