use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Replace `dest` with a copy of `src`, returning the number of files written.
///
/// Whatever was at `dest` is removed first. Symbolic links are recreated as links.
/// A failure part-way through leaves `dest` partially populated.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    if !src.is_dir() {
        return Err(Error::SourceMissing(src.to_path_buf()));
    }

    let (resolved_src, resolved_dest) = (resolve(src)?, resolve(dest)?);
    if resolved_src.starts_with(&resolved_dest) || resolved_dest.starts_with(&resolved_src) {
        return Err(Error::OverlappingPaths {
            src: resolved_src,
            dest: resolved_dest,
        });
    }

    remove_existing(dest)?;
    fs::create_dir_all(dest)
        .map_err(|e| Error::io(format!("create {}", dest.display()), e))?;

    let mut files = 0u64;
    for entry in WalkDir::new(src).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| Error::io(format!("walk {}", src.display()), e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| Error::io("resolve relative path", io::Error::other(e)))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| Error::io(format!("create {}", target.display()), e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                Error::io(
                    format!("copy {} to {}", entry.path().display(), target.display()),
                    e,
                )
            })?;
            files += 1;
        }
    }

    debug!(
        "copy: {} files from {} to {}",
        files,
        src.display(),
        dest.display()
    );
    Ok(files)
}

/// Canonical form of `path`, resolving through its deepest existing ancestor.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(|e| Error::io(format!("resolve {}", path.display()), e))?;
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    while fs::symlink_metadata(existing).is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_owned());
                existing = parent;
            }
            _ => break,
        }
    }
    let mut resolved = fs::canonicalize(existing)
        .map_err(|e| Error::io(format!("resolve {}", existing.display()), e))?;
    resolved.extend(rest.iter().rev());
    Ok(resolved)
}

fn remove_existing(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(Error::io(format!("inspect {}", path.display()), err)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| Error::io(format!("remove {}", path.display()), e))
}

fn copy_symlink(link: &Path, target: &Path) -> Result<()> {
    let pointee =
        fs::read_link(link).map_err(|e| Error::io(format!("read link {}", link.display()), e))?;

    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(&pointee, target);

    #[cfg(windows)]
    let created = if fs::metadata(link).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(&pointee, target)
    } else {
        std::os::windows::fs::symlink_file(&pointee, target)
    };

    created.map_err(|e| Error::io(format!("create link {}", target.display()), e))
}
