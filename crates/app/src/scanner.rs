//! Source-tree scanning for Java files.
//!
//! Walks a repository root, keeping `.java` files and skipping ignored
//! directory names (version control, build output, tests). Output is sorted
//! so downstream chunk ids are stable across runs.

use javalens_config::ScanConfig;
use javalens_shared::{ErrorCode, ErrorEnvelope, Result};
use std::path::{Path, PathBuf};

/// One discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Path relative to the scanned root, with `/` separators.
    pub relative_path: Box<str>,
}

/// Recursively collect `.java` files under `root`.
///
/// Unreadable subdirectories are logged and skipped; files over the size
/// limit are skipped with a warning. A missing or non-directory root is an
/// error.
pub fn scan_java_files(root: &Path, config: &ScanConfig) -> Result<Vec<ScannedFile>> {
    if !root.is_dir() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::not_found(),
            format!("repository root is not a directory: {}", root.display()),
        ));
    }

    let mut files = Vec::new();
    walk(root, root, config, &mut files);
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    tracing::info!(
        root = %root.display(),
        files = files.len(),
        "scanned repository for Java sources"
    );
    Ok(files)
}

fn walk(root: &Path, dir: &Path, config: &ScanConfig, files: &mut Vec<ScannedFile>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(dir = %dir.display(), %error, "skipping unreadable directory");
            return;
        },
    };

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let path = entry.path();

        if path.is_dir() {
            if is_ignored_dir(&path, config) {
                continue;
            }
            walk(root, &path, config, files);
            continue;
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some("java") {
            continue;
        }
        if let Ok(metadata) = entry.metadata() {
            if metadata.len() > config.max_file_size_bytes {
                tracing::warn!(
                    file = %path.display(),
                    size = metadata.len(),
                    limit = config.max_file_size_bytes,
                    "skipping oversized file"
                );
                continue;
            }
        }

        if let Some(relative_path) = relative_path(root, &path) {
            files.push(ScannedFile {
                absolute_path: path,
                relative_path,
            });
        }
    }
}

fn is_ignored_dir(path: &Path, config: &ScanConfig) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return true;
    };
    config
        .ignore_dirs
        .iter()
        .any(|ignored| ignored.as_ref() == name)
}

fn relative_path(root: &Path, path: &Path) -> Option<Box<str>> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(joined.into())
}
