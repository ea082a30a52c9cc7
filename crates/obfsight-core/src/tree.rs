//! Directory tree helpers: mirrored copies, per-file transforms, digests.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::collab::FileTransform;
use crate::domain::{PipelineError, Result};

/// Remove `dir` if it exists and recreate it empty.
pub fn recreate_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Copy everything under `src` into `dest` except the top-level entry named
/// `excluded`, preserving relative structure.
///
/// Returns the number of files copied.
pub fn copy_tree_except(src: &Path, dest: &Path, excluded: &str) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == excluded));

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = relative_to(src, entry.path())?;
        let target = dest.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    debug!(src = %src.display(), dest = %dest.display(), copied, "Copied non-source files");
    Ok(copied)
}

/// Sorted relative paths of every regular file under `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(relative_to(dir, entry.path())?.to_path_buf());
        }
    }
    Ok(files)
}

/// Apply `transform` to every file under `src`, writing results to the same
/// relative path under `dest`.
///
/// Files that are not valid UTF-8 are copied byte for byte instead.
/// Stops at the first failing file; files written before it stay on disk.
pub async fn transform_tree(
    src: &Path,
    dest: &Path,
    transform: &dyn FileTransform,
    options: &Map<String, Value>,
) -> Result<usize> {
    fs::create_dir_all(dest)?;
    let files = list_files(src)?;

    for relative in &files {
        let source_path = src.join(relative);
        let target_path = dest.join(relative);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = fs::read(&source_path)?;
        let Ok(source) = std::str::from_utf8(&bytes) else {
            warn!(file = %relative.display(), "Not UTF-8, copying unchanged");
            fs::write(&target_path, &bytes)?;
            continue;
        };
        let output = transform
            .transform(source, options)
            .await
            .map_err(|e| match e {
                PipelineError::Transform { message, .. } => PipelineError::Transform {
                    path: source_path.clone(),
                    message,
                },
                config @ PipelineError::Configuration(_) => config,
                other => PipelineError::Transform {
                    path: source_path.clone(),
                    message: other.to_string(),
                },
            })?;
        fs::write(&target_path, output)?;
        debug!(file = %relative.display(), "Transformed file");
    }

    Ok(files.len())
}

/// SHA-256 hex digest over every file's relative path and contents.
pub fn digest_tree(dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for relative in list_files(dir)? {
        let path_key = relative.to_string_lossy().replace('\\', "/");
        hasher.update(path_key.as_bytes());
        hasher.update(b"\0");
        hasher.update(fs::read(dir.join(&relative))?);
        hasher.update(b"\0");
    }
    Ok(hex::encode(hasher.finalize()))
}

fn relative_to<'a>(root: &Path, path: &'a Path) -> Result<&'a Path> {
    path.strip_prefix(root)
        .map_err(|e| PipelineError::Io(std::io::Error::other(e)))
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> Result<()> {
    fs::copy(src, target)?;
    Ok(())
}
