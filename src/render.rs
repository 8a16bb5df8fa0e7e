//! Markdown rendering for Hugo.
//!
//! Two output shapes, selected by `generate_branch_bundle`:
//!
//! - **Single mode**: one `<album>.md` page with TOML front matter and
//!   every photo's shortcode between `{{< wrap >}}` tags.
//! - **Bundle mode**: a branch bundle directory with a YAML `_index.md`
//!   plus one page per photo, optionally carrying EXIF/IPTC dumps in the
//!   photo's front matter.
//!
//! Rendering is a pure projection of the reconciled album: output files
//! are always fully overwritten, never patched. It runs after the rebuild
//! step, so artifact files (whose dimensions the shortcodes embed) are
//! guaranteed present.

use crate::album::Album;
use crate::config::Settings;
use crate::descriptor::push_yaml_field;
use log::info;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

/// Write the single-page markdown file for the album. Returns the path
/// written.
pub fn write_single_page(album: &Album, settings: &Settings) -> io::Result<PathBuf> {
    let path = album.markdown_file(settings);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = String::new();
    out.push_str("+++\n");
    out.push_str(&format!(
        "title = \"{}\"\n",
        escape_toml(album.title.as_deref().unwrap_or(""))
    ));
    out.push_str(&format!(
        "date = \"{}\"\n",
        escape_toml(album.album_date.as_deref().unwrap_or(""))
    ));
    for (key, value) in &album.properties {
        out.push_str(&format!("{} = \"\"\"{}\"\"\"\n", key, value));
    }
    out.push_str(&format!("cover = \"{}\"\n", cover_url(album, settings)));
    out.push_str("+++\n\n");

    out.push_str("{{< wrap >}}\n");
    for photo in &album.photos {
        out.push_str(&photo.shortcode(settings));
        out.push_str("\n\n");
    }
    out.push_str("{{< /wrap >}}\n");

    std::fs::write(&path, out)?;
    info!("[{}] written markdown file {}", album.name(), path.display());
    Ok(path)
}

/// Write the branch-bundle rendering: `_index.md` plus one page per
/// photo. Returns the bundle directory.
pub fn write_bundle(album: &Album, settings: &Settings) -> io::Result<PathBuf> {
    let bundle_dir = album.markdown_dir(settings);
    std::fs::create_dir_all(&bundle_dir)?;

    let mut index = String::new();
    index.push_str("---\n");
    push_yaml_field(
        &mut index,
        "",
        "title",
        album.title.as_deref().unwrap_or(""),
        false,
    );
    push_yaml_field(
        &mut index,
        "",
        "date",
        album.album_date.as_deref().unwrap_or(""),
        true,
    );
    for (key, value) in &album.properties {
        push_yaml_field(&mut index, "", key, value, false);
    }
    push_yaml_field(&mut index, "", "cover", &cover_url(album, settings), false);
    index.push_str("---\n");
    std::fs::write(bundle_dir.join("_index.md"), index)?;

    for photo in &album.photos {
        let mut page = String::new();
        page.push_str("---\n");
        write_yaml_map(&mut page, &photo.properties());
        if settings.exif.dump {
            write_yaml_map(&mut page, &photo.exif_fields());
        }
        if settings.iptc.dump {
            write_yaml_map(&mut page, &photo.iptc_fields());
        }
        page.push_str("---\n\n");
        page.push_str(&photo.shortcode(settings));
        page.push('\n');

        std::fs::write(bundle_dir.join(format!("{}.md", photo.clean_name())), page)?;
    }

    info!(
        "[{}] written bundle {} ({} photo pages)",
        album.name(),
        bundle_dir.display(),
        album.photos.len()
    );
    Ok(bundle_dir)
}

/// Public URL of the cover artifact, or empty when no cover is set.
fn cover_url(album: &Album, settings: &Settings) -> String {
    if album.coverimage.is_none() {
        return String::new();
    }
    format!(
        "{}/{}/{}",
        settings.url_prefix,
        album.name(),
        settings.cover_filename
    )
    .replace('\\', "/")
}

fn write_yaml_map(out: &mut String, map: &BTreeMap<String, String>) {
    for (key, value) in map {
        push_yaml_field(out, "", key, value, false);
    }
}

fn escape_toml(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
