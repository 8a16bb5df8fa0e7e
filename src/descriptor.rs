//! Descriptor load and save: the album's persisted state.
//!
//! Each album directory carries a YAML descriptor (`album.yml` by default)
//! holding the album's scalar fields, property mapping, photo list, and
//! fingerprint table. The descriptor is the source of truth between runs:
//! `load` merges it with the filesystem into an [`Album`], and `save`
//! rewrites it wholesale at the end of a successful update.
//!
//! ## Safety
//!
//! `save` never mutates the live file without a backup: if a descriptor
//! already exists, a `.bak` sibling is copied first, then the new content
//! is written in one `fs::write`. The backup is the only rollback
//! mechanism: there is no multi-file transaction.
//!
//! ## Determinism
//!
//! The descriptor is parsed with a typed schema (unknown keys ignored,
//! missing keys defaulting to empty/absent) but written by hand in a
//! fixed field order, with properties sorted by key and the fingerprint
//! table in photo-list order. Running `update` twice without filesystem
//! changes produces byte-identical descriptors except for the
//! modification timestamp.

use crate::album::Album;
use crate::config::Settings;
use crate::fingerprint::{FingerprintEntry, FingerprintTable};
use crate::photo::{Photo, PhotoError};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Album has no associated directory; cannot save descriptor")]
    NoAlbumPath,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Typed schema for the descriptor document. Every field is optional so a
/// sparse or hand-edited file still loads; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct DescriptorDoc {
    title: Option<String>,
    album_date: Option<String>,
    properties: Option<BTreeMap<String, String>>,
    copyright: Option<String>,
    coverimage: Option<String>,
    cover_built_from: Option<String>,
    creation_time: Option<String>,
    modification_time: Option<String>,
    photos: Option<Vec<PhotoEntry>>,
    hashes: Option<Vec<HashEntry>>,
}

#[derive(Debug, Deserialize)]
struct PhotoEntry {
    file: String,
    name: Option<String>,
    alt: Option<String>,
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HashEntry {
    file: String,
    hash: String,
}

/// Path of the descriptor file inside an album directory.
pub fn descriptor_path(album_dir: &Path, settings: &Settings) -> PathBuf {
    album_dir.join(&settings.album_file)
}

/// Load an album from its directory.
///
/// Returns `Ok(None)` when the directory has no descriptor file: it is
/// not an album directory and the caller should skip it. Listed photos
/// are resolved against the filesystem: entries that cannot be opened
/// are skipped at debug level, entries without a display name are
/// dropped with a visible warning.
pub fn load(album_dir: &Path, settings: &Settings) -> Result<Option<Album>, DescriptorError> {
    let path = descriptor_path(album_dir, settings);
    if !path.exists() {
        debug!("Skipping non-album directory: {}", album_dir.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)?;
    let doc: DescriptorDoc = serde_yaml::from_str(&content)?;

    let mut album = Album::new(album_dir.to_path_buf());
    album.title = doc.title;
    album.album_date = doc.album_date;
    album.properties = doc.properties.unwrap_or_default();
    album.copyright = doc.copyright;
    album.coverimage = doc.coverimage;
    album.cover_built_from = doc.cover_built_from;
    album.creation_time = doc.creation_time;
    album.modification_time = doc.modification_time;
    album.hashes = FingerprintTable::from_entries(
        doc.hashes
            .unwrap_or_default()
            .into_iter()
            .map(|h| FingerprintEntry {
                file: h.file,
                hash: h.hash,
            })
            .collect(),
    );

    let album_name = album.name().to_string();
    let copyright = album.copyright.clone().unwrap_or_default();
    let photo_dir = album_dir.join(&settings.photo_dir);

    for entry in doc.photos.unwrap_or_default() {
        let photo_path = photo_dir.join(&entry.file);
        let photo = match Photo::new(
            &album_name,
            photo_path,
            entry.name.as_deref().unwrap_or(""),
            entry.alt.as_deref().unwrap_or(""),
            entry.caption.as_deref().unwrap_or(""),
            &copyright,
        ) {
            Ok(p) => p,
            Err(PhotoError::AccessDenied(path)) => {
                debug!("[{}] Skipping unreadable photo: {}", album_name, path.display());
                continue;
            }
            Err(e) => {
                debug!("[{}] Skipping photo {}: {}", album_name, entry.file, e);
                continue;
            }
        };
        if photo.name.is_empty() {
            warn!(
                "[{}] No name defined for photo {}; dropping it",
                album_name, entry.file
            );
            continue;
        }
        album.photos.push(photo);
    }

    Ok(Some(album))
}

/// Save the album descriptor, backing up any existing file first.
///
/// Timestamps are stamped onto the album before writing, so the
/// in-memory state always matches what was persisted: a first save fixes
/// `creation_time` permanently, every save refreshes `modification_time`.
///
/// Fails with [`DescriptorError::NoAlbumPath`] if the album was built
/// without a directory: a construction-time invariant violation, not a
/// runtime I/O condition.
pub fn save(album: &mut Album, settings: &Settings) -> Result<(), DescriptorError> {
    let Some(dir) = &album.dir else {
        return Err(DescriptorError::NoAlbumPath);
    };
    let path = descriptor_path(dir, settings);

    if album.creation_time.is_none() {
        album.creation_time = Some(timestamp_now());
    }
    album.modification_time = Some(timestamp_now());

    backup(&path)?;

    std::fs::write(&path, format_descriptor(album))?;
    Ok(())
}

/// Copy the existing descriptor to a `.bak` sibling, if one exists.
fn backup(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut bak = path.as_os_str().to_owned();
    bak.push(".bak");
    std::fs::copy(path, PathBuf::from(bak))?;
    Ok(())
}

/// Current local time in the descriptor's timestamp format.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render the full descriptor document in its fixed field order.
fn format_descriptor(album: &Album) -> String {
    let mut out = String::new();
    out.push_str("---\n");

    if let Some(title) = &album.title {
        push_yaml_field(&mut out, "", "title", title, false);
    }
    if let Some(date) = &album.album_date {
        push_yaml_field(&mut out, "", "album_date", date, true);
    }
    out.push_str("properties:\n");
    for (key, value) in &album.properties {
        push_yaml_field(&mut out, "  ", key, value, false);
    }
    if let Some(copyright) = &album.copyright {
        push_yaml_field(&mut out, "", "copyright", copyright, false);
    }
    if let Some(cover) = &album.coverimage {
        push_yaml_field(&mut out, "", "coverimage", cover, false);
    }
    if let Some(built_from) = &album.cover_built_from {
        push_yaml_field(&mut out, "", "cover_built_from", built_from, false);
    }
    // save() stamps both timestamps before calling here
    let creation = album.creation_time.clone().unwrap_or_else(timestamp_now);
    let modification = album.modification_time.clone().unwrap_or_else(timestamp_now);
    push_yaml_field(&mut out, "", "creation_time", &creation, true);
    push_yaml_field(&mut out, "", "modification_time", &modification, true);

    out.push_str("\nphotos:\n");
    for photo in &album.photos {
        push_yaml_field(&mut out, "- ", "file", photo.filename(), false);
        push_yaml_field(&mut out, "  ", "name", &photo.name, false);
        if !photo.alt.is_empty() {
            push_yaml_field(&mut out, "  ", "alt", &photo.alt, false);
        }
        if !photo.caption.is_empty() {
            push_yaml_field(&mut out, "  ", "caption", &photo.caption, false);
        }
    }

    out.push_str("\nhashes:\n");
    for photo in &album.photos {
        if let Some(hash) = album.hashes.get(photo.filename()) {
            push_yaml_field(&mut out, "- ", "file", photo.filename(), false);
            push_yaml_field(&mut out, "  ", "hash", hash, false);
        }
    }

    out
}

/// Write one `key: value` YAML line, quoting when the value demands it.
pub(crate) fn push_yaml_field(
    out: &mut String,
    indent: &str,
    key: &str,
    value: &str,
    force_quote: bool,
) {
    out.push_str(indent);
    out.push_str(key);
    out.push(':');
    if force_quote || needs_quotes(value) {
        out.push_str(" \"");
        out.push_str(&value.replace('\\', "\\\\").replace('"', "\\\""));
        out.push('"');
    } else if !value.is_empty() {
        out.push(' ');
        out.push_str(value);
    }
    out.push('\n');
}

fn needs_quotes(value: &str) -> bool {
    value.contains(": ")
        || value.ends_with(':')
        || value.contains(" #")
        || value.starts_with(['-', '[', '{', '"', '\'', '*', '&', '!', '>', '|', '%', '@', ' '])
        || value.ends_with(' ')
}
