// src/install/extract.rs

//! Archive listing and extraction
//!
//! Release assets come as `.zip` or `.tar.gz`/`.tgz` archives. Listing is
//! separate from extraction so the executable auto-detector can peek at
//! archive contents without unpacking anything.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// Archive kinds we can unpack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    TarGz,
}

fn archive_kind(path: &Path) -> Result<ArchiveKind> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.ends_with(".zip") {
        Ok(ArchiveKind::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(ArchiveKind::TarGz)
    } else {
        Err(Error::InstallationError(format!(
            "unsupported archive format: {}",
            path.display()
        )))
    }
}

/// The archive filename without its extension, the root directory name used
/// by nested archive layouts
pub fn archive_stem(asset: &str) -> &str {
    asset
        .strip_suffix(".tar.gz")
        .or_else(|| asset.strip_suffix(".tgz"))
        .or_else(|| asset.strip_suffix(".zip"))
        .unwrap_or(asset)
}

/// List the file paths inside an archive without extracting it
pub fn list_archive(path: &Path) -> Result<Vec<String>> {
    match archive_kind(path)? {
        ArchiveKind::Zip => {
            let file = File::open(path)
                .map_err(|e| Error::IoError(format!("failed to open {}: {e}", path.display())))?;
            let archive = zip::ZipArchive::new(file)
                .map_err(|e| Error::InstallationError(format!("malformed zip archive: {e}")))?;
            Ok(archive
                .file_names()
                .filter(|name| !name.ends_with('/'))
                .map(str::to_string)
                .collect())
        }
        ArchiveKind::TarGz => {
            let file = File::open(path)
                .map_err(|e| Error::IoError(format!("failed to open {}: {e}", path.display())))?;
            let mut archive = Archive::new(GzDecoder::new(file));
            let mut names = Vec::new();
            for entry in archive
                .entries()
                .map_err(|e| Error::InstallationError(format!("malformed tar archive: {e}")))?
            {
                let entry = entry
                    .map_err(|e| Error::InstallationError(format!("malformed tar entry: {e}")))?;
                if entry.header().entry_type().is_file() {
                    let entry_path = entry
                        .path()
                        .map_err(|e| Error::InstallationError(format!("bad tar path: {e}")))?;
                    names.push(entry_path.to_string_lossy().into_owned());
                }
            }
            Ok(names)
        }
    }
}

/// Extract the full archive into `dest`, creating it as needed.
///
/// Zip entries escaping the destination (absolute or `..` paths) are
/// rejected. On Unix the executable bit recorded in the archive is
/// preserved, and files under a `bin/` directory are made executable even
/// when the archive dropped the mode.
pub fn extract_archive(path: &Path, dest: &Path) -> Result<()> {
    debug!("extracting {} to {}", path.display(), dest.display());
    std::fs::create_dir_all(dest)
        .map_err(|e| Error::IoError(format!("failed to create {}: {e}", dest.display())))?;

    match archive_kind(path)? {
        ArchiveKind::Zip => extract_zip(path, dest),
        ArchiveKind::TarGz => extract_tar_gz(path, dest),
    }
}

fn extract_zip(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("failed to open {}: {e}", path.display())))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| Error::InstallationError(format!("malformed zip archive: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::InstallationError(format!("malformed zip entry: {e}")))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::InstallationError(format!(
                "zip entry escapes archive root: {}",
                entry.name()
            )));
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = File::create(&out_path)
            .map_err(|e| Error::IoError(format!("failed to create {}: {e}", out_path.display())))?;
        std::io::copy(&mut entry, &mut out_file)
            .map_err(|e| Error::IoError(format!("failed to extract entry: {e}")))?;

        set_executable(&out_path, entry.unix_mode())?;
    }

    Ok(())
}

fn extract_tar_gz(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("failed to open {}: {e}", path.display())))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|e| Error::InstallationError(format!("failed to extract tar archive: {e}")))?;
    Ok(())
}

/// Set the executable bit on Unix where warranted: the archive recorded an
/// executable mode, or the file lives under a `bin/` directory
#[cfg(unix)]
fn set_executable(path: &Path, unix_mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let in_bin_dir = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n == "bin")
        .unwrap_or(false);
    let mode_executable = unix_mode.map(|m| m & 0o111 != 0).unwrap_or(false);

    if in_bin_dir || mode_executable {
        let metadata = std::fs::metadata(path)?;
        let mut perms = metadata.permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _unix_mode: Option<u32>) -> Result<()> {
    Ok(())
}

/// Make one file executable on Unix; no-op elsewhere
pub fn mark_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path)?;
        let mut perms = metadata.permissions();
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem("demo-linux.zip"), "demo-linux");
        assert_eq!(archive_stem("demo-linux.tar.gz"), "demo-linux");
        assert_eq!(archive_stem("demo-linux.tgz"), "demo-linux");
        assert_eq!(archive_stem("demo-linux"), "demo-linux");
    }

    #[test]
    fn test_unsupported_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.rar");
        std::fs::write(&path, b"junk").unwrap();
        assert!(list_archive(&path).is_err());
    }

    #[test]
    fn test_list_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.zip");
        write_zip(&path, &[("bin/demo", b"#!/bin/sh\n"), ("LICENSE", b"MIT")]);

        let mut names = list_archive(&path).unwrap();
        names.sort();
        assert_eq!(names, vec!["LICENSE".to_string(), "bin/demo".to_string()]);
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.zip");
        write_zip(&path, &[("bin/demo", b"binary"), ("doc/readme", b"text")]);

        let dest = dir.path().join("out");
        extract_archive(&path, &dest).unwrap();

        assert_eq!(std::fs::read(dest.join("bin/demo")).unwrap(), b"binary");
        assert_eq!(std::fs::read(dest.join("doc/readme")).unwrap(), b"text");
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_zip_marks_bin_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.zip");
        write_zip(&path, &[("bin/demo", b"binary")]);

        let dest = dir.path().join("out");
        extract_archive(&path, &dest).unwrap();

        let mode = std::fs::metadata(dest.join("bin/demo")).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0, "bin/ entry should be executable");
    }

    #[test]
    fn test_malformed_zip_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.zip");
        std::fs::write(&path, b"this is not a zip").unwrap();
        assert!(list_archive(&path).is_err());
    }
}
