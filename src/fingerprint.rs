//! Content fingerprints for change detection.
//!
//! Resizing is the expensive operation of an update run; the fingerprint
//! is the cheap gate in front of it. Each photo's fingerprint is the
//! SHA-256 of its source file bytes: content-based rather than
//! mtime-based so it survives `git checkout` (which resets modification
//! times). The fingerprint is an equality oracle only: it says "the file
//! last built from" versus "the file on disk now", nothing more.
//!
//! The table persisted in the descriptor is keyed by filename, never by
//! the photo object itself. Renaming a photo's display metadata therefore
//! never forces a rebuild; replacing the image bytes always does.

use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// One persisted (filename, fingerprint) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintEntry {
    pub file: String,
    pub hash: String,
}

/// The fingerprint table persisted alongside the photo list.
///
/// Kept as an ordered list so the descriptor writes entries in photo
/// order; lookups scan by filename (albums are small).
#[derive(Debug, Clone, Default)]
pub struct FingerprintTable {
    entries: Vec<FingerprintEntry>,
}

impl FingerprintTable {
    pub fn from_entries(entries: Vec<FingerprintEntry>) -> Self {
        Self { entries }
    }

    /// Last-known fingerprint for a filename; `None` means "no prior build".
    pub fn get(&self, file: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.file == file)
            .map(|e| e.hash.as_str())
    }

    /// Record a fingerprint, replacing any existing entry for the filename.
    pub fn set(&mut self, file: &str, hash: String) {
        match self.entries.iter_mut().find(|e| e.file == file) {
            Some(entry) => entry.hash = hash,
            None => self.entries.push(FingerprintEntry {
                file: file.to_string(),
                hash,
            }),
        }
    }

    /// Drop entries whose filename is not in `keep`. Called after pruning
    /// so deleted photos don't leave stale fingerprints behind.
    pub fn retain_files(&mut self, keep: &[&str]) {
        self.entries.retain(|e| keep.contains(&e.file.as_str()));
    }

    pub fn iter(&self) -> impl Iterator<Item = &FingerprintEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
