//! hugoswipe: incremental photo gallery updater for Hugo + PhotoSwipe
//! sites.
//!
//! Each album is a directory with a photo subfolder and a YAML descriptor.
//! An update run reconciles the descriptor with the filesystem, resizes
//! only the photos whose content actually changed (tracked by SHA-256
//! fingerprints), renders the album's Hugo markdown, and rewrites the
//! descriptor with a backup of the previous version.
//!
//! ## Module map
//!
//! | Module        | Responsibility                                       |
//! |---------------|------------------------------------------------------|
//! | `config`      | `hugoswipe.toml` settings, defaults, validation      |
//! | `album`       | The album aggregate; `update` and `clean` lifecycle  |
//! | `descriptor`  | YAML descriptor load / backup-then-save              |
//! | `reconcile`   | Discovery, pruning, change detection, rebuild        |
//! | `photo`       | Photo records, resize artifacts, shortcodes          |
//! | `render`      | Single-page and branch-bundle markdown output        |
//! | `fingerprint` | Content hashing and the persisted fingerprint table  |
//! | `iptc`        | IPTC-IIM reader for the bundle-mode metadata dump    |
//! | `prompt`      | Interactive confirmation for destructive operations  |

pub mod album;
pub mod config;
pub mod descriptor;
pub mod fingerprint;
pub mod iptc;
pub mod photo;
pub mod prompt;
pub mod reconcile;
pub mod render;

#[cfg(test)]
pub(crate) mod test_helpers;
