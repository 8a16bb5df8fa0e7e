//! Settings loaded from `hugoswipe.toml`.
//!
//! One config file per site, loaded once at process start and passed by
//! reference into every component that needs it. There is no global
//! settings object; functions that need configuration take `&Settings`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir = "static/photos"      # Where resized images are written
//! markdown_dir = "content/photos"   # Where rendered pages are written
//! photo_dir = "photos"              # Photo subfolder inside each album dir
//! album_file = "album.yml"          # Descriptor filename inside each album dir
//! cover_filename = "coverimage.jpg" # Cover artifact name in the album output dir
//! url_prefix = ""                   # Public URL prefix for generated image links
//! generate_branch_bundle = false    # Bundle mode: one markdown file per photo
//! verbose = false                   # Log each rebuilt photo instead of a progress bar
//!
//! [sizes]
//! large = 1600                      # Longer edge of the large size, in pixels
//! small = 800                       # Longer edge of the small size
//! thumb = 256                       # Square thumbnail edge
//! cover = 600                       # Square cover crop edge
//! quality = 90                      # JPEG quality (0-100)
//!
//! [exif]
//! dump = false                      # Append EXIF fields to bundle-mode pages
//!
//! [iptc]
//! dump = false                      # Append IPTC fields to bundle-mode pages
//! ```
//!
//! Config files are sparse: override just the values you want. Unknown
//! keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `hugoswipe.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base directory for resized image artifacts (one subdir per album).
    pub output_dir: String,
    /// Base directory for rendered markdown output.
    pub markdown_dir: String,
    /// Name of the photo subfolder inside each album directory.
    pub photo_dir: String,
    /// Descriptor filename inside each album directory.
    pub album_file: String,
    /// Filename of the cover artifact inside an album's output directory.
    pub cover_filename: String,
    /// Public URL prefix prepended to generated image references.
    pub url_prefix: String,
    /// Render one markdown file per photo plus an `_index.md` instead of a
    /// single combined page.
    pub generate_branch_bundle: bool,
    /// Log each rebuilt photo instead of showing a progress bar.
    pub verbose: bool,
    /// Resize artifact dimensions and encoding quality.
    pub sizes: SizesConfig,
    /// EXIF dump settings for bundle mode.
    pub exif: DumpConfig,
    /// IPTC dump settings for bundle mode.
    pub iptc: DumpConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: "static/photos".to_string(),
            markdown_dir: "content/photos".to_string(),
            photo_dir: "photos".to_string(),
            album_file: "album.yml".to_string(),
            cover_filename: "coverimage.jpg".to_string(),
            url_prefix: String::new(),
            generate_branch_bundle: false,
            verbose: false,
            sizes: SizesConfig::default(),
            exif: DumpConfig::default(),
            iptc: DumpConfig::default(),
        }
    }
}

impl Settings {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sizes.quality > 100 {
            return Err(ConfigError::Validation(
                "sizes.quality must be 0-100".into(),
            ));
        }
        for (name, px) in [
            ("sizes.large", self.sizes.large),
            ("sizes.small", self.sizes.small),
            ("sizes.thumb", self.sizes.thumb),
            ("sizes.cover", self.sizes.cover),
        ] {
            if px == 0 {
                return Err(ConfigError::Validation(format!("{name} must be non-zero")));
            }
        }
        if self.album_file.is_empty() {
            return Err(ConfigError::Validation(
                "album_file must not be empty".into(),
            ));
        }
        if self.photo_dir.is_empty() {
            return Err(ConfigError::Validation(
                "photo_dir must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Resize artifact dimensions (pixels) and JPEG quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizesConfig {
    /// Longer edge of the large size.
    pub large: u32,
    /// Longer edge of the small size.
    pub small: u32,
    /// Square thumbnail edge.
    pub thumb: u32,
    /// Square cover crop edge.
    pub cover: u32,
    /// JPEG encoding quality (0 = worst, 100 = best).
    pub quality: u32,
}

impl Default for SizesConfig {
    fn default() -> Self {
        Self {
            large: 1600,
            small: 800,
            thumb: 256,
            cover: 600,
            quality: 90,
        }
    }
}

/// Metadata dump toggle for bundle-mode pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpConfig {
    /// When true, the extracted fields are appended to each photo's front matter.
    pub dump: bool,
}

/// Load settings from a config file, or defaults if the file doesn't exist.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let settings = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}

/// A stock `hugoswipe.toml` with every option documented, for `gen-config`.
pub fn stock_config_toml() -> String {
    r#"# hugoswipe configuration
# All options are optional - defaults shown below.

# Where resized image artifacts are written (one subdir per album)
output_dir = "static/photos"

# Where rendered markdown pages are written
markdown_dir = "content/photos"

# Photo subfolder inside each album directory
photo_dir = "photos"

# Descriptor filename inside each album directory
album_file = "album.yml"

# Cover artifact filename inside an album's output directory
cover_filename = "coverimage.jpg"

# Public URL prefix for generated image references (e.g. "/photos")
url_prefix = ""

# Bundle mode: one markdown file per photo plus an _index.md,
# instead of a single combined page per album
generate_branch_bundle = false

# Log each rebuilt photo instead of showing a progress bar
verbose = false

[sizes]
large = 1600    # longer edge, pixels
small = 800     # longer edge, pixels
thumb = 256     # square edge, pixels
cover = 600     # square cover crop edge, pixels
quality = 90    # JPEG quality (0-100)

[exif]
dump = false    # append EXIF fields to bundle-mode photo pages

[iptc]
dump = false    # append IPTC fields to bundle-mode photo pages
"#
    .to_string()
}
