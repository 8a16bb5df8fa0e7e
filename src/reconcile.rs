//! Incremental reconciliation of an album against the filesystem.
//!
//! One pass over an album does, in order:
//!
//! 1. **Uniqueness guard**: duplicate display names abort before any
//!    mutation, since artifact filenames derive from display names.
//! 2. **Discovery**: files in the photo subfolder that have no Photo
//!    record yet are added, in lexicographic filename order, named after
//!    their full filename. Unreadable entries and non-image files are
//!    skipped at debug level.
//! 3. **Pruning**: records whose source file disappeared are removed.
//!    The uniqueness guard runs again here: discovery can collide with a
//!    hand-edited display name, and nothing may be built from a
//!    colliding list.
//! 4. **Cover assignment**: exactly one photo (matching the album's
//!    `coverimage` filename) gets the cover artifact path; all others
//!    are explicitly cleared.
//! 5. **Rebuild selection**: a photo is rebuilt when any resize
//!    artifact is missing, or its content fingerprint differs from the
//!    stored one. Missing artifacts win over a matching fingerprint.
//! 6. **Rebuild**: selected photos resize in parallel, behind a
//!    progress bar (or per-photo log lines in verbose mode).
//! 7. **Fingerprint refresh**: the table is pruned to surviving photos
//!    and refreshed with the fingerprints computed during selection.
//!
//! Rendering and persistence are the caller's job; reconciliation only
//! mutates the in-memory album and the artifact directory.

use crate::album::Album;
use crate::config::Settings;
use crate::fingerprint::FingerprintTable;
use crate::photo::{Photo, PhotoError};
use indicatif::ProgressBar;
use log::{debug, info};
use rayon::prelude::*;
use std::collections::HashSet;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Photo display names are not unique for album {0}")]
    DuplicateNames(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Photo(#[from] PhotoError),
}

/// What one reconciliation pass did.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Photos discovered in the photo subfolder and added to the album.
    pub added: usize,
    /// Photo records removed because their source file disappeared.
    pub removed: usize,
    /// Photos whose resize artifacts were (re)generated.
    pub rebuilt: usize,
}

/// Reconcile the album's photo list with the filesystem and bring its
/// resize artifacts up to date.
pub fn reconcile(album: &mut Album, settings: &Settings) -> Result<ReconcileReport, ReconcileError> {
    if !album.names_unique() {
        return Err(ReconcileError::DuplicateNames(album.name().to_string()));
    }

    let added = discover(album, settings)?;
    let removed = prune(album);
    // Discovery can introduce a collision with a hand-edited display
    // name; nothing may be built, rendered, or saved from such a list.
    if !album.names_unique() {
        return Err(ReconcileError::DuplicateNames(album.name().to_string()));
    }
    assign_cover(album, settings);

    // Selection: fingerprints are computed once here and reused for the
    // table refresh after the rebuild.
    let fingerprints: Vec<String> = album
        .photos
        .iter()
        .map(|p| p.fingerprint())
        .collect::<io::Result<_>>()?;

    let cover_built_from = album.cover_built_from.clone();
    let hashes = &album.hashes;
    let to_build: Vec<usize> = album
        .photos
        .iter()
        .enumerate()
        .filter(|(i, photo)| {
            needs_rebuild(
                photo,
                &fingerprints[*i],
                hashes,
                cover_built_from.as_deref(),
                settings,
            )
        })
        .map(|(i, _)| i)
        .collect();

    rebuild(album, settings, &to_build)?;
    let rebuilt = to_build.len();

    let keep: Vec<String> = album
        .photos
        .iter()
        .map(|p| p.filename().to_string())
        .collect();
    let keep_refs: Vec<&str> = keep.iter().map(String::as_str).collect();
    album.hashes.retain_files(&keep_refs);
    let pairs: Vec<(String, String)> = album
        .photos
        .iter()
        .zip(fingerprints)
        .map(|(photo, fp)| (photo.filename().to_string(), fp))
        .collect();
    for (file, fp) in pairs {
        album.hashes.set(&file, fp);
    }

    // After the pass the cover artifact reflects the current cover photo,
    // whether it was just rebuilt or already up to date.
    album.cover_built_from = album
        .photos
        .iter()
        .find(|p| p.cover_path.is_some())
        .map(|p| p.filename().to_string());

    Ok(ReconcileReport {
        added,
        removed,
        rebuilt,
    })
}

/// Whether a photo's artifacts must be (re)generated. Artifact presence
/// is checked first: a matching fingerprint never excuses a missing file.
/// The cover photo additionally rebuilds when the on-disk cover crop was
/// built from a different source, since the crop lives at a fixed path
/// that a `coverimage` switch would otherwise leave stale.
fn needs_rebuild(
    photo: &Photo,
    fingerprint: &str,
    hashes: &FingerprintTable,
    cover_built_from: Option<&str>,
    settings: &Settings,
) -> bool {
    if !photo.has_sizes(settings) {
        return true;
    }
    if let Some(cover) = &photo.cover_path
        && (!cover.exists() || cover_built_from != Some(photo.filename()))
    {
        return true;
    }
    hashes.get(photo.filename()) != Some(fingerprint)
}

/// Add photo records for files in the photo subfolder that have none yet.
fn discover(album: &mut Album, settings: &Settings) -> Result<usize, ReconcileError> {
    let album_name = album.name().to_string();
    let copyright = album.copyright.clone().unwrap_or_default();
    let photo_dir = album.photo_dir(settings);

    let entries = match std::fs::read_dir(&photo_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("[{}] no photo folder at {}", album_name, photo_dir.display());
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let known: HashSet<String> = album
        .photos
        .iter()
        .map(|p| p.filename().to_string())
        .collect();

    let mut candidates: Vec<String> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !known.contains(&filename) {
            candidates.push(filename);
        }
    }
    candidates.sort();

    let mut added = 0;
    for filename in candidates {
        let path = photo_dir.join(&filename);
        // The full filename is the default display name. Keeping the
        // extension keeps same-stem files (a.jpg vs a.png) distinct, and
        // with them their slug-derived artifact paths.
        let photo = match Photo::new(&album_name, path, &filename, "", "", &copyright) {
            Ok(p) => p,
            Err(e) => {
                debug!("[{}] skipping {}: {}", album_name, filename, e);
                continue;
            }
        };
        if let Err(e) = photo.verify_image() {
            debug!("[{}] skipping {}: {}", album_name, filename, e);
            continue;
        }

        info!("[{}] added photo {}", album_name, filename);
        album.photos.push(photo);
        added += 1;
    }
    Ok(added)
}

/// Remove photo records whose source file no longer exists.
fn prune(album: &mut Album) -> usize {
    let album_name = album.name().to_string();
    let before = album.photos.len();
    album.photos.retain(|photo| {
        let exists = photo.original_path.exists();
        if !exists {
            info!("[{}] removed photo {}", album_name, photo.filename());
        }
        exists
    });
    before - album.photos.len()
}

/// Set the cover artifact path on the designated cover photo and clear
/// it everywhere else. At most one photo carries a cover path.
fn assign_cover(album: &mut Album, settings: &Settings) {
    let cover_path = album.cover_artifact_path(settings);
    let coverimage = album.coverimage.clone();
    for photo in &mut album.photos {
        photo.cover_path = match &coverimage {
            Some(cover) if photo.filename() == cover => Some(cover_path.clone()),
            _ => None,
        };
    }
}

/// Regenerate artifacts for the selected photos, in parallel.
fn rebuild(album: &Album, settings: &Settings, to_build: &[usize]) -> Result<(), ReconcileError> {
    if to_build.is_empty() {
        return Ok(());
    }

    let bar = if settings.verbose {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(to_build.len() as u64)
    };

    to_build.par_iter().try_for_each(|&i| {
        let photo = &album.photos[i];
        if settings.verbose {
            info!("[{}] building sizes for {}", album.name(), photo.name);
        }
        photo.create_sizes(settings)?;
        bar.inc(1);
        Ok::<(), PhotoError>(())
    })?;
    bar.finish_and_clear();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, test_settings};
    use tempfile::TempDir;

    fn album_on_disk(tmp: &TempDir, settings: &Settings, files: &[&str]) -> Album {
        let album_dir = tmp.path().join("Holiday");
        let photo_dir = album_dir.join(&settings.photo_dir);
        std::fs::create_dir_all(&photo_dir).unwrap();
        for file in files {
            create_test_jpeg(&photo_dir.join(file), 64, 48);
        }
        Album::new(album_dir)
    }

    #[test]
    fn discovery_adds_photos_in_filename_order() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["c.jpg", "a.jpg", "b.jpg"]);

        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.added, 3);
        let files: Vec<_> = album.photos.iter().map(Photo::filename).collect();
        assert_eq!(files, ["a.jpg", "b.jpg", "c.jpg"]);
        // Display names default to the full filename
        assert_eq!(album.photos[0].name, "a.jpg");
    }

    #[test]
    fn same_stem_different_extension_stay_distinct() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg"]);
        let png = album.photo_dir(&settings).join("a.png");
        image::RgbImage::from_fn(48, 48, |x, y| image::Rgb([x as u8, y as u8, 0]))
            .save(&png)
            .unwrap();

        let report = reconcile(&mut album, &settings).unwrap();

        assert_eq!(report.added, 2);
        assert!(album.names_unique());
        let names: Vec<_> = album.photos.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "a.png"]);
        assert_ne!(
            album.photos[0].large_path(&settings),
            album.photos[1].large_path(&settings)
        );
        for photo in &album.photos {
            assert!(photo.has_sizes(&settings));
        }
    }

    #[test]
    fn discovery_collision_with_existing_name_aborts() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg"]);
        // A hand-edited record already claims the display name a.jpg
        album.photos.push(
            Photo::new(
                "Holiday",
                album.photo_dir(&settings).join("b.jpg"),
                "a.jpg",
                "",
                "",
                "",
            )
            .unwrap(),
        );

        let result = reconcile(&mut album, &settings);
        assert!(matches!(result, Err(ReconcileError::DuplicateNames(_))));
        assert!(album.hashes.is_empty());
        for photo in &album.photos {
            assert!(!photo.has_sizes(&settings));
        }
    }

    #[test]
    fn non_image_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg"]);
        std::fs::write(album.photo_dir(&settings).join("notes.txt"), "hi").unwrap();
        std::fs::create_dir(album.photo_dir(&settings).join("subdir")).unwrap();

        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(album.photos[0].filename(), "a.jpg");
    }

    #[test]
    fn missing_photo_folder_discovers_nothing() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let album_dir = tmp.path().join("Empty");
        std::fs::create_dir_all(&album_dir).unwrap();
        let mut album = Album::new(album_dir);

        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.added, 0);
        assert!(album.photos.is_empty());
    }

    #[test]
    fn pruning_removes_records_for_deleted_sources() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg"]);

        reconcile(&mut album, &settings).unwrap();
        assert_eq!(album.photos.len(), 2);

        std::fs::remove_file(album.photo_dir(&settings).join("b.jpg")).unwrap();
        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(album.photos.len(), 1);
        assert_eq!(album.hashes.len(), 1);
        assert!(album.hashes.get("b.jpg").is_none());
    }

    #[test]
    fn unchanged_album_rebuilds_nothing() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg"]);

        let first = reconcile(&mut album, &settings).unwrap();
        assert_eq!(first.rebuilt, 2);

        let second = reconcile(&mut album, &settings).unwrap();
        assert_eq!(second.rebuilt, 0);
    }

    #[test]
    fn changed_content_triggers_rebuild() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg"]);
        reconcile(&mut album, &settings).unwrap();

        create_test_jpeg(&album.photo_dir(&settings).join("a.jpg"), 128, 96);
        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.rebuilt, 1);
    }

    #[test]
    fn rebuild_when_artifacts_missing_even_if_hash_matches() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg"]);
        reconcile(&mut album, &settings).unwrap();

        // Fingerprint still matches, but an artifact was deleted out-of-band
        std::fs::remove_file(album.photos[0].thumb_path(&settings)).unwrap();
        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.rebuilt, 1);
        assert!(album.photos[0].has_sizes(&settings));
    }

    #[test]
    fn duplicate_names_abort_without_mutation() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg"]);
        for file in ["a.jpg", "b.jpg"] {
            album.photos.push(
                Photo::new(
                    "Holiday",
                    album.photo_dir(&settings).join(file),
                    "Dup",
                    "",
                    "",
                    "",
                )
                .unwrap(),
            );
        }

        let result = reconcile(&mut album, &settings);
        assert!(matches!(result, Err(ReconcileError::DuplicateNames(_))));
        assert!(album.hashes.is_empty());
        assert!(!album.photos[0].has_sizes(&settings));
    }

    #[test]
    fn cover_assigned_to_exactly_one_photo() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg", "c.jpg"]);
        album.coverimage = Some("b.jpg".to_string());

        reconcile(&mut album, &settings).unwrap();

        let with_cover: Vec<_> = album
            .photos
            .iter()
            .filter(|p| p.cover_path.is_some())
            .collect();
        assert_eq!(with_cover.len(), 1);
        assert_eq!(with_cover[0].filename(), "b.jpg");
        assert!(album.cover_artifact_path(&settings).exists());
    }

    #[test]
    fn missing_cover_artifact_triggers_cover_rebuild() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg"]);
        album.coverimage = Some("a.jpg".to_string());
        reconcile(&mut album, &settings).unwrap();

        std::fs::remove_file(album.cover_artifact_path(&settings)).unwrap();
        let report = reconcile(&mut album, &settings).unwrap();
        assert_eq!(report.rebuilt, 1);
        assert!(album.cover_artifact_path(&settings).exists());
    }

    #[test]
    fn switching_cover_regenerates_the_crop() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg"]);
        create_test_jpeg(&album.photo_dir(&settings).join("b.jpg"), 96, 96);
        album.coverimage = Some("a.jpg".to_string());

        reconcile(&mut album, &settings).unwrap();
        assert_eq!(album.cover_built_from.as_deref(), Some("a.jpg"));
        let before = crate::fingerprint::hash_file(&album.cover_artifact_path(&settings)).unwrap();

        album.coverimage = Some("b.jpg".to_string());
        let report = reconcile(&mut album, &settings).unwrap();

        assert_eq!(report.rebuilt, 1);
        assert_eq!(album.cover_built_from.as_deref(), Some("b.jpg"));
        let after = crate::fingerprint::hash_file(&album.cover_artifact_path(&settings)).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn unchanged_cover_is_not_rebuilt() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg"]);
        album.coverimage = Some("a.jpg".to_string());

        reconcile(&mut album, &settings).unwrap();
        let second = reconcile(&mut album, &settings).unwrap();
        assert_eq!(second.rebuilt, 0);
    }

    #[test]
    fn fingerprints_recorded_for_all_photos() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let mut album = album_on_disk(&tmp, &settings, &["a.jpg", "b.jpg"]);

        reconcile(&mut album, &settings).unwrap();

        assert_eq!(album.hashes.len(), 2);
        for photo in &album.photos {
            assert_eq!(
                album.hashes.get(photo.filename()),
                Some(photo.fingerprint().unwrap().as_str())
            );
        }
    }
}
