//! Photo records: one image file within an album.
//!
//! A [`Photo`] carries the identity and metadata the reconciliation engine
//! and renderers need: the source path, display name, alt text, caption,
//! copyright, and whether it is the album's cover. It also owns the
//! derived-artifact side: three resized JPEGs (`large`, `small`, `thumb`)
//! in the album's output directory, plus a square cover crop when the
//! photo is the designated cover.
//!
//! Resizing uses the `image` crate (Lanczos3, pure Rust). The decoded
//! full-resolution image lives only inside [`Photo::create_sizes`]; it is
//! dropped when the call returns, so at most one decoded image is
//! resident per worker regardless of album size.

use crate::config::Settings;
use crate::fingerprint;
use crate::iptc;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("Access denied: {0}")]
    AccessDenied(PathBuf),
    #[error("Not a recognized image: {0}")]
    UnrecognizedImage(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Image processing failed for {path}: {message}")]
    Processing { path: PathBuf, message: String },
}

/// One photo within an album. Owned exclusively by its [`Album`](crate::album::Album).
#[derive(Debug, Clone)]
pub struct Photo {
    /// Name of the owning album (its directory name).
    pub album_name: String,
    /// Absolute path of the source image file.
    pub original_path: PathBuf,
    /// Human-facing display name; must be unique within the album.
    pub name: String,
    /// Alt text for the embed reference.
    pub alt: String,
    /// Caption shown under the photo.
    pub caption: String,
    /// Copyright string, inherited from the album unless overridden.
    pub copyright: String,
    /// Set by reconciliation when this photo is the album cover; the path
    /// is where the cover crop artifact is written.
    pub cover_path: Option<PathBuf>,
}

impl Photo {
    /// Construct a photo record, verifying the source file is readable.
    ///
    /// Fails with [`PhotoError::AccessDenied`] for unreadable entries and
    /// for directories: both are expected noise in a photo folder, not
    /// errors the caller should surface.
    pub fn new(
        album_name: &str,
        original_path: PathBuf,
        name: &str,
        alt: &str,
        caption: &str,
        copyright: &str,
    ) -> Result<Self, PhotoError> {
        let meta = std::fs::metadata(&original_path).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                PhotoError::AccessDenied(original_path.clone())
            } else {
                PhotoError::Io(e)
            }
        })?;
        if meta.is_dir() {
            return Err(PhotoError::AccessDenied(original_path));
        }

        Ok(Self {
            album_name: album_name.to_string(),
            original_path,
            name: name.to_string(),
            alt: alt.to_string(),
            caption: caption.trim().to_string(),
            copyright: copyright.to_string(),
            cover_path: None,
        })
    }

    /// Source filename relative to the photo subfolder (the identity key).
    pub fn filename(&self) -> &str {
        self.original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    /// Display name reduced to a filesystem/URL-safe slug. Used for
    /// artifact filenames and bundle page filenames.
    pub fn clean_name(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut last_dash = true; // suppress leading dash
        for c in self.name.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
                last_dash = false;
            } else if !last_dash {
                slug.push('-');
                last_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug
    }

    /// Verify the source file decodes as a real image.
    ///
    /// Only reads the header: cheap enough to run for every discovery
    /// candidate. A failure means "not a photo file", which discovery
    /// treats as expected noise.
    pub fn verify_image(&self) -> Result<(), PhotoError> {
        image::image_dimensions(&self.original_path)
            .map(|_| ())
            .map_err(|_| PhotoError::UnrecognizedImage(self.original_path.clone()))
    }

    /// Content fingerprint of the source file (see [`crate::fingerprint`]).
    pub fn fingerprint(&self) -> io::Result<String> {
        fingerprint::hash_file(&self.original_path)
    }

    // -----------------------------------------------------------------------
    // Artifact paths
    // -----------------------------------------------------------------------

    fn artifact_dir(&self, settings: &Settings) -> PathBuf {
        Path::new(&settings.output_dir).join(&self.album_name)
    }

    pub fn large_path(&self, settings: &Settings) -> PathBuf {
        self.artifact_dir(settings)
            .join(format!("{}_large.jpg", self.clean_name()))
    }

    pub fn small_path(&self, settings: &Settings) -> PathBuf {
        self.artifact_dir(settings)
            .join(format!("{}_small.jpg", self.clean_name()))
    }

    pub fn thumb_path(&self, settings: &Settings) -> PathBuf {
        self.artifact_dir(settings)
            .join(format!("{}_thumb.jpg", self.clean_name()))
    }

    /// Whether all resize artifacts for this photo exist on disk.
    ///
    /// Checked independently of the fingerprint: artifacts can be deleted
    /// out-of-band while the descriptor still claims they were built.
    pub fn has_sizes(&self, settings: &Settings) -> bool {
        self.large_path(settings).exists()
            && self.small_path(settings).exists()
            && self.thumb_path(settings).exists()
    }

    // -----------------------------------------------------------------------
    // Artifact generation
    // -----------------------------------------------------------------------

    /// Generate all resize artifacts for this photo.
    ///
    /// Decodes the source once into a local image, writes large/small/thumb
    /// JPEGs (plus the cover crop when this photo is the cover), then drops
    /// the decoded image on return. Never upscales: sizes larger than the
    /// source are written at the source's resolution.
    pub fn create_sizes(&self, settings: &Settings) -> Result<(), PhotoError> {
        std::fs::create_dir_all(self.artifact_dir(settings))?;

        let img = ImageReader::open(&self.original_path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| PhotoError::Processing {
                path: self.original_path.clone(),
                message: e.to_string(),
            })?;

        let quality = settings.sizes.quality as u8;

        let large = fit_within(&img, settings.sizes.large);
        save_jpeg(&large, &self.large_path(settings), quality)?;
        drop(large);

        let small = fit_within(&img, settings.sizes.small);
        save_jpeg(&small, &self.small_path(settings), quality)?;
        drop(small);

        let thumb = img.resize_to_fill(settings.sizes.thumb, settings.sizes.thumb, FilterType::Lanczos3);
        save_jpeg(&thumb, &self.thumb_path(settings), quality)?;
        drop(thumb);

        if let Some(cover_path) = &self.cover_path {
            if let Some(parent) = cover_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let cover =
                img.resize_to_fill(settings.sizes.cover, settings.sizes.cover, FilterType::Lanczos3);
            save_jpeg(&cover, cover_path, quality)?;
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rendering support
    // -----------------------------------------------------------------------

    /// Public URL of an artifact, always with forward-slash separators.
    fn artifact_url(&self, settings: &Settings, suffix: &str) -> String {
        format!(
            "{}/{}/{}_{}.jpg",
            settings.url_prefix,
            self.album_name,
            self.clean_name(),
            suffix
        )
        .replace('\\', "/")
    }

    /// The Hugo shortcode embedding this photo in a rendered page.
    ///
    /// Dimensions are read from the artifact files (header-only reads);
    /// artifacts are guaranteed present because rendering runs after the
    /// rebuild step.
    pub fn shortcode(&self, settings: &Settings) -> String {
        let large_dim = dim_string(&self.large_path(settings));
        let small_dim = dim_string(&self.small_path(settings));
        format!(
            "{{{{< photoswipe href=\"{}\" large-dim=\"{}\" small-url=\"{}\" small-dim=\"{}\" \
             thumb-url=\"{}\" alt=\"{}\" caption=\"{}\" copyright=\"{}\" >}}}}",
            self.artifact_url(settings, "large"),
            large_dim,
            self.artifact_url(settings, "small"),
            small_dim,
            self.artifact_url(settings, "thumb"),
            escape_attr(&self.alt),
            escape_attr(&self.caption),
            escape_attr(&self.copyright),
        )
    }

    /// Photo metadata as key/value pairs for bundle-mode front matter.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("file".to_string(), self.filename().to_string());
        props.insert("name".to_string(), self.name.clone());
        if !self.alt.is_empty() {
            props.insert("alt".to_string(), self.alt.clone());
        }
        if !self.caption.is_empty() {
            props.insert("caption".to_string(), self.caption.clone());
        }
        if !self.copyright.is_empty() {
            props.insert("copyright".to_string(), self.copyright.clone());
        }
        props
    }

    /// EXIF fields of the source file (primary IFD). Missing or unreadable
    /// metadata yields an empty map.
    pub fn exif_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let Ok(file) = std::fs::File::open(&self.original_path) else {
            return fields;
        };
        let mut reader = std::io::BufReader::new(file);
        let Ok(data) = exif::Reader::new().read_from_container(&mut reader) else {
            return fields;
        };
        for field in data.fields() {
            if field.ifd_num == exif::In::PRIMARY {
                fields.insert(
                    field.tag.to_string(),
                    field.display_value().with_unit(&data).to_string(),
                );
            }
        }
        fields
    }

    /// IPTC Record 2 fields of the source file (see [`crate::iptc`]).
    pub fn iptc_fields(&self) -> BTreeMap<String, String> {
        iptc::read_iptc_fields(&self.original_path)
    }
}

/// Resize so the longer edge is at most `target`, preserving aspect.
/// Sources already smaller than the target pass through unchanged.
fn fit_within(img: &DynamicImage, target: u32) -> DynamicImage {
    if img.width().max(img.height()) <= target {
        img.clone()
    } else {
        img.resize(target, target, FilterType::Lanczos3)
    }
}

/// Encode and save as JPEG at the given quality.
fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), PhotoError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, quality);
    // JPEG has no alpha channel
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| PhotoError::Processing {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// `WxH` of an image file, or empty string if unreadable.
fn dim_string(path: &Path) -> String {
    match image::image_dimensions(path) {
        Ok((w, h)) => format!("{}x{}", w, h),
        Err(_) => String::new(),
    }
}

/// Escape double quotes for shortcode attribute values.
fn escape_attr(value: &str) -> String {
    value.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, test_settings};
    use tempfile::TempDir;

    fn sample_photo(tmp: &TempDir, filename: &str, name: &str) -> Photo {
        let path = tmp.path().join(filename);
        create_test_jpeg(&path, 320, 240);
        Photo::new("Holiday", path, name, "alt text", "a caption", "© me").unwrap()
    }

    #[test]
    fn new_on_directory_is_access_denied() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("subdir");
        std::fs::create_dir(&dir).unwrap();

        let result = Photo::new("Holiday", dir, "x", "", "", "");
        assert!(matches!(result, Err(PhotoError::AccessDenied(_))));
    }

    #[test]
    fn new_on_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = Photo::new("Holiday", tmp.path().join("gone.jpg"), "x", "", "", "");
        assert!(matches!(result, Err(PhotoError::Io(_))));
    }

    #[test]
    fn verify_image_rejects_non_image() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.jpg");
        std::fs::write(&path, "not an image at all").unwrap();

        let photo = Photo::new("Holiday", path, "notes", "", "", "").unwrap();
        assert!(matches!(
            photo.verify_image(),
            Err(PhotoError::UnrecognizedImage(_))
        ));
    }

    #[test]
    fn verify_image_accepts_real_jpeg() {
        let tmp = TempDir::new().unwrap();
        sample_photo(&tmp, "real.jpg", "Real").verify_image().unwrap();
    }

    #[test]
    fn clean_name_slugs_display_name() {
        let tmp = TempDir::new().unwrap();
        let photo = sample_photo(&tmp, "a.jpg", "Dusk over Harbor!  (v2)");
        assert_eq!(photo.clean_name(), "dusk-over-harbor-v2");
    }

    #[test]
    fn caption_is_trimmed_on_construction() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        create_test_jpeg(&path, 32, 32);
        let photo = Photo::new("Holiday", path, "A", "", "  padded  ", "").unwrap();
        assert_eq!(photo.caption, "padded");
    }

    #[test]
    fn create_sizes_writes_three_artifacts() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let photo = sample_photo(&tmp, "a.jpg", "Dawn");

        assert!(!photo.has_sizes(&settings));
        photo.create_sizes(&settings).unwrap();
        assert!(photo.has_sizes(&settings));

        assert!(photo.large_path(&settings).exists());
        assert!(photo.small_path(&settings).exists());
        assert!(photo.thumb_path(&settings).exists());
    }

    #[test]
    fn has_sizes_false_when_one_artifact_deleted() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let photo = sample_photo(&tmp, "a.jpg", "Dawn");

        photo.create_sizes(&settings).unwrap();
        std::fs::remove_file(photo.thumb_path(&settings)).unwrap();
        assert!(!photo.has_sizes(&settings));
    }

    #[test]
    fn thumb_is_square_at_configured_size() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let photo = sample_photo(&tmp, "a.jpg", "Dawn");

        photo.create_sizes(&settings).unwrap();
        let dims = image::image_dimensions(photo.thumb_path(&settings)).unwrap();
        assert_eq!(dims, (settings.sizes.thumb, settings.sizes.thumb));
    }

    #[test]
    fn small_sources_are_not_upscaled() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        // Source smaller than the large target passes through at full size
        let path = tmp.path().join("tiny.jpg");
        create_test_jpeg(&path, 150, 100);
        assert!(150 < settings.sizes.large);
        let photo = Photo::new("Holiday", path, "Tiny", "", "", "").unwrap();

        photo.create_sizes(&settings).unwrap();
        let dims = image::image_dimensions(photo.large_path(&settings)).unwrap();
        assert_eq!(dims, (150, 100));
    }

    #[test]
    fn cover_artifact_written_when_cover_path_set() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut photo = sample_photo(&tmp, "a.jpg", "Dawn");
        let cover = tmp.path().join("out/Holiday/coverimage.jpg");
        photo.cover_path = Some(cover.clone());

        photo.create_sizes(&settings).unwrap();
        assert!(cover.exists());
        let dims = image::image_dimensions(&cover).unwrap();
        assert_eq!(dims, (settings.sizes.cover, settings.sizes.cover));
    }

    #[test]
    fn fingerprint_matches_hash_file() {
        let tmp = TempDir::new().unwrap();
        let photo = sample_photo(&tmp, "a.jpg", "Dawn");
        let expected = fingerprint::hash_file(&photo.original_path).unwrap();
        assert_eq!(photo.fingerprint().unwrap(), expected);
    }

    #[test]
    fn shortcode_carries_urls_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let mut settings = test_settings(tmp.path());
        settings.url_prefix = "/photos".to_string();
        let photo = sample_photo(&tmp, "a.jpg", "Dawn");
        photo.create_sizes(&settings).unwrap();

        let sc = photo.shortcode(&settings);
        assert!(sc.starts_with("{{< photoswipe "));
        assert!(sc.ends_with(">}}"));
        assert!(sc.contains("href=\"/photos/Holiday/dawn_large.jpg\""));
        assert!(sc.contains("small-url=\"/photos/Holiday/dawn_small.jpg\""));
        assert!(sc.contains("alt=\"alt text\""));
        assert!(sc.contains("caption=\"a caption\""));
    }

    #[test]
    fn shortcode_escapes_quotes() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let path = tmp.path().join("a.jpg");
        create_test_jpeg(&path, 32, 32);
        let photo = Photo::new("Holiday", path, "A", "say \"cheese\"", "", "").unwrap();

        let sc = photo.shortcode(&settings);
        assert!(sc.contains("alt=\"say \\\"cheese\\\"\""));
    }

    #[test]
    fn properties_skip_empty_optionals() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a.jpg");
        create_test_jpeg(&path, 32, 32);
        let photo = Photo::new("Holiday", path, "A", "", "", "").unwrap();

        let props = photo.properties();
        assert_eq!(props["file"], "a.jpg");
        assert_eq!(props["name"], "A");
        assert!(!props.contains_key("alt"));
        assert!(!props.contains_key("caption"));
        assert!(!props.contains_key("copyright"));
    }

    #[test]
    fn exif_fields_empty_for_synthetic_jpeg() {
        let tmp = TempDir::new().unwrap();
        let photo = sample_photo(&tmp, "a.jpg", "Dawn");
        // Synthetic JPEGs carry no EXIF segment
        assert!(photo.exif_fields().is_empty());
    }
}
