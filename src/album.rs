//! The album aggregate and its lifecycle operations.
//!
//! An [`Album`] is one directory of photos plus the state loaded from its
//! descriptor. `update` is the end-to-end incremental pass: reconcile the
//! photo list against the filesystem, rebuild stale artifacts, render the
//! markdown output, and persist the descriptor. `clean` is the inverse:
//! delete everything an update produced, after an interactive
//! confirmation.
//!
//! Duplicate display names abort the update for that album only: the
//! orchestrator logs a warning and moves on to the next album with no
//! files touched.

use crate::config::Settings;
use crate::descriptor::{self, DescriptorError};
use crate::fingerprint::FingerprintTable;
use crate::photo::Photo;
use crate::prompt::Confirm;
use crate::reconcile::{self, ReconcileError, ReconcileReport};
use crate::render;
use log::{info, warn};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlbumError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of [`Album::update`].
#[derive(Debug)]
pub enum UpdateOutcome {
    /// The album was reconciled, rendered, and saved.
    Updated(ReconcileReport),
    /// Photo display names were not unique; nothing was touched.
    SkippedDuplicateNames,
}

/// Result of [`Album::clean`].
#[derive(Debug, PartialEq, Eq)]
pub enum CleanOutcome {
    /// No generated files exist for this album.
    NothingToDo,
    /// The user answered no at the confirmation prompt.
    Declined,
    /// The listed paths were deleted.
    Cleaned(Vec<PathBuf>),
}

/// One album: a directory with a descriptor, a photo subfolder, and the
/// derived artifacts and rendered pages built from them.
#[derive(Debug, Default)]
pub struct Album {
    /// The album directory. `None` only for albums constructed in memory
    /// and never loaded from disk; such albums cannot be saved.
    pub dir: Option<PathBuf>,
    pub title: Option<String>,
    pub album_date: Option<String>,
    /// Free-form properties copied into the rendered page's front matter.
    pub properties: BTreeMap<String, String>,
    /// Default copyright inherited by every photo.
    pub copyright: Option<String>,
    /// Source filename of the designated cover photo.
    pub coverimage: Option<String>,
    /// Source filename the on-disk cover crop was last generated from.
    /// The crop lives at a fixed path, so this is what detects a
    /// `coverimage` switch between runs.
    pub cover_built_from: Option<String>,
    pub creation_time: Option<String>,
    pub modification_time: Option<String>,
    /// Photo list in descriptor order; discovered photos append in
    /// lexicographic filename order.
    pub photos: Vec<Photo>,
    /// Last-built fingerprint per source filename.
    pub hashes: FingerprintTable,
}

impl Album {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir: Some(dir),
            ..Self::default()
        }
    }

    /// The album's name: its directory name. Identifies the album in
    /// output paths, page names, and log lines.
    pub fn name(&self) -> &str {
        self.dir
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .unwrap_or("")
    }

    /// Whether every photo's display name is unique within the album.
    /// Artifact filenames derive from display names, so duplicates would
    /// silently overwrite each other's output.
    pub fn names_unique(&self) -> bool {
        let mut seen = HashSet::new();
        self.photos.iter().all(|p| seen.insert(p.name.as_str()))
    }

    // -----------------------------------------------------------------------
    // Derived paths
    // -----------------------------------------------------------------------

    /// The photo subfolder holding the source images.
    pub fn photo_dir(&self, settings: &Settings) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_default()
            .join(&settings.photo_dir)
    }

    /// Where this album's resize artifacts are written.
    pub fn output_dir(&self, settings: &Settings) -> PathBuf {
        Path::new(&settings.output_dir).join(self.name())
    }

    /// The single-page markdown file (single mode).
    pub fn markdown_file(&self, settings: &Settings) -> PathBuf {
        Path::new(&settings.markdown_dir).join(format!("{}.md", self.name()))
    }

    /// The bundle directory (bundle mode).
    pub fn markdown_dir(&self, settings: &Settings) -> PathBuf {
        Path::new(&settings.markdown_dir).join(self.name())
    }

    /// Where the square cover crop is written.
    pub fn cover_artifact_path(&self, settings: &Settings) -> PathBuf {
        self.output_dir(settings).join(&settings.cover_filename)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run one full incremental update: reconcile, render, save.
    ///
    /// Duplicate display names are reported as
    /// [`UpdateOutcome::SkippedDuplicateNames`] rather than an error so a
    /// multi-album run continues past the offending album.
    pub fn update(&mut self, settings: &Settings) -> Result<UpdateOutcome, AlbumError> {
        let report = match reconcile::reconcile(self, settings) {
            Ok(report) => report,
            Err(ReconcileError::DuplicateNames(album)) => {
                warn!(
                    "Photo names are not unique for album {}; skipping it entirely",
                    album
                );
                return Ok(UpdateOutcome::SkippedDuplicateNames);
            }
            Err(e) => return Err(e.into()),
        };

        if settings.generate_branch_bundle {
            render::write_bundle(self, settings)?;
        } else {
            render::write_single_page(self, settings)?;
        }

        descriptor::save(self, settings)?;
        info!(
            "[{}] updated: {} added, {} removed, {} rebuilt",
            self.name(),
            report.added,
            report.removed,
            report.rebuilt
        );
        Ok(UpdateOutcome::Updated(report))
    }

    /// Delete everything generated for this album, after confirmation.
    ///
    /// Inspects the descriptor file, the rendered output (single page and
    /// bundle directory), and the artifact directory; presents the exact
    /// list of existing paths to the confirmer, and only deletes on a yes.
    pub fn clean(
        &self,
        settings: &Settings,
        confirm: &dyn Confirm,
    ) -> Result<CleanOutcome, AlbumError> {
        let mut targets: Vec<PathBuf> = Vec::new();
        if let Some(dir) = &self.dir {
            let descriptor = descriptor::descriptor_path(dir, settings);
            if descriptor.exists() {
                targets.push(descriptor);
            }
        }
        for path in [
            self.markdown_file(settings),
            self.markdown_dir(settings),
            self.output_dir(settings),
        ] {
            if path.exists() {
                targets.push(path);
            }
        }

        if targets.is_empty() {
            info!("[{}] nothing to clean", self.name());
            return Ok(CleanOutcome::NothingToDo);
        }

        let listing = targets
            .iter()
            .map(|p| format!("  {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        let question = format!(
            "Going to remove the following for album {}:\n{}\nContinue?",
            self.name(),
            listing
        );
        if !confirm.ask_yes_no(&question) {
            return Ok(CleanOutcome::Declined);
        }

        for path in &targets {
            if path.is_dir() {
                std::fs::remove_dir_all(path)?;
            } else {
                std::fs::remove_file(path)?;
            }
            info!("Removed {}", path.display());
        }
        Ok(CleanOutcome::Cleaned(targets))
    }
}
