//! # Filesystem Copy Primitives
//!
//! Byte-exact file and directory copies with permission preservation.
//!
//! `copy_file` streams a single file and carries the source's permission
//! mode over to the destination, keeping the destination owner-only while
//! the bytes are in flight so partially-written files are never group or
//! world readable.
//!
//! `copy_dir` recursively copies a tree. The destination must not already
//! exist; callers that want replacement semantics remove the destination
//! first (materialization does exactly that). Symbolic links are
//! dereferenced, so the copied tree contains their target content, not the
//! links themselves.

use std::fs;
use std::io;
use std::path::Path;

use log::info;

use crate::error::{Error, Result};

fn copy_error(src: &Path, dst: &Path, message: impl ToString) -> Error {
    Error::Copy {
        src: src.display().to_string(),
        dst: dst.display().to_string(),
        message: message.to_string(),
    }
}

/// Copy the contents of the file named `src` to the file named `dst`.
///
/// `dst` is created if it does not already exist, along with any missing
/// parent directories; if it exists, its contents are replaced. The
/// permission mode is copied from the source, and the written data is synced
/// to stable storage before the final mode is applied.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    info!("copying file src={} dst={}", src.display(), dst.display());

    let mut reader = fs::File::open(src).map_err(|e| copy_error(src, dst, e))?;
    let metadata = reader.metadata().map_err(|e| copy_error(src, dst, e))?;

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| copy_error(src, dst, e))?;
    }

    let mut writer = fs::File::create(dst).map_err(|e| copy_error(src, dst, e))?;

    // Owner-only until the copy completes, so a partially-written file is
    // never readable by anyone else.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dst, fs::Permissions::from_mode(0o600))
            .map_err(|e| copy_error(src, dst, e))?;
    }

    io::copy(&mut reader, &mut writer).map_err(|e| copy_error(src, dst, e))?;
    writer.sync_all().map_err(|e| copy_error(src, dst, e))?;

    // All done; make the permissions match
    fs::set_permissions(dst, metadata.permissions()).map_err(|e| copy_error(src, dst, e))?;

    Ok(())
}

/// Recursively copy a directory tree, preserving permission modes.
///
/// The source must exist and be a directory. The destination must *not*
/// exist: a pre-existing destination is a hard error, forcing callers to
/// clear stale trees explicitly before copying. Entries are visited in
/// lexical order; symlinks are dereferenced.
pub fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    info!("copying dir src={} dst={}", src.display(), dst.display());

    let metadata = fs::metadata(src).map_err(|e| copy_error(src, dst, e))?;
    if !metadata.is_dir() {
        return Err(copy_error(src, dst, "source is not a directory"));
    }

    if dst.symlink_metadata().is_ok() {
        return Err(copy_error(src, dst, "destination already exists"));
    }

    fs::create_dir_all(dst).map_err(|e| copy_error(src, dst, e))?;
    fs::set_permissions(dst, metadata.permissions()).map_err(|e| copy_error(src, dst, e))?;

    let mut entries: Vec<_> = fs::read_dir(src)
        .map_err(|e| copy_error(src, dst, e))?
        .collect::<io::Result<_>>()
        .map_err(|e| copy_error(src, dst, e))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        // fs::metadata follows symlinks, so link targets are copied as
        // plain files or directories.
        let entry_metadata = fs::metadata(&src_path).map_err(|e| copy_error(&src_path, &dst_path, e))?;
        if entry_metadata.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else {
            copy_file(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
