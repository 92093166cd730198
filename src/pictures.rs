// Filesystem helpers: flat directory listing and whole-file reads.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".JPG", ".JPEG", ".PNG"];

/// List the regular files directly inside `dir`, in the order the
/// filesystem returns them. Sub-directories are skipped, never descended.
///
/// Any I/O error is returned as-is so the caller can decide to re-prompt.
pub fn list_pictures(dir: &Path, images_only: bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Follows symlinks; dangling links are skipped like directories.
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {}
            _ => continue,
        }
        if images_only && !is_image_path(&path) {
            continue;
        }
        files.push(path);
    }
    Ok(files)
}

/// True for names ending in one of the supported image extensions.
/// Matching is case-sensitive apart from the all-caps variants.
pub fn is_image_path(path: &Path) -> bool {
    match path.file_name().and_then(|s| s.to_str()) {
        Some(name) => IMAGE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)),
        None => false,
    }
}

/// Read the whole file into memory.
pub fn read_picture(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read picture {}", path.display()))
}
