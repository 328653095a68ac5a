//! Move and copy of files and directory trees inside the root.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use strum::{Display, EnumString};
use walkdir::WalkDir;

use crate::{
    errors::RuntimeError,
    resolve::{RequestTarget, ServerRoot},
};

/// Relocate action selected by the `act` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RelocateAction {
    /// Atomic rename, no copy fallback across devices
    Move,

    /// Byte-for-byte copy, recursive for directories
    Copy,
}

impl RelocateAction {
    pub fn parse(act: &str) -> Result<Self, RuntimeError> {
        act.parse()
            .map_err(|_| RuntimeError::MalformedRequest(format!("Unknown action '{act}'")))
    }
}

/// Moves or copies the source behind `target` to `dst`.
///
/// `dst` is resolved against the root when absolute and against the directory containing the
/// source otherwise. Parent directories of the destination are created as needed.
/// Returns the local destination path.
pub fn relocate(
    root: &ServerRoot,
    target: &RequestTarget,
    action: RelocateAction,
    dst: &str,
) -> Result<PathBuf, RuntimeError> {
    let source = &target.local_path;
    let metadata = fs::metadata(source).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RuntimeError::NotFound("Not found".to_string()),
        _ => RuntimeError::io("reading source", source, e),
    })?;

    if dst.is_empty() {
        return Err(RuntimeError::MalformedRequest(
            "Missing destination".to_string(),
        ));
    }
    let containing = source.parent().unwrap_or(root.path());
    let (_, destination) = root.resolve_destination(containing, dst)?;

    if destination == *source {
        return Err(RuntimeError::MalformedRequest(
            "Source and destination are the same".to_string(),
        ));
    }
    if metadata.is_dir() && destination.starts_with(source) {
        return Err(RuntimeError::MalformedRequest(
            "Cannot relocate a directory into itself".to_string(),
        ));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RuntimeError::io("creating directory", parent, e))?;
    }

    match action {
        RelocateAction::Move => fs::rename(source, &destination)
            .map_err(|e| RuntimeError::io(format!("{action}"), source, e))?,
        RelocateAction::Copy if metadata.is_dir() => copy_tree(source, &destination)?,
        RelocateAction::Copy => {
            fs::copy(source, &destination)
                .map_err(|e| RuntimeError::io(format!("{action}"), source, e))?;
        }
    }

    Ok(destination)
}

/// Recursively copies the directory `src` to `dst`.
///
/// Each directory is created before its contents are copied. Directory modes are applied once the
/// tree is complete so read-only directories can still be filled. A failure midway leaves the
/// partially copied tree in place.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<(), RuntimeError> {
    let mut dir_permissions = Vec::new();

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            RuntimeError::io("copy", path, e.into())
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| RuntimeError::io("copy", entry.path(), io::Error::other(e)))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| RuntimeError::io("creating directory", &target, e))?;
            let permissions = entry
                .metadata()
                .map_err(|e| RuntimeError::io("copy", entry.path(), e.into()))?
                .permissions();
            dir_permissions.push((target, permissions));
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| RuntimeError::io("copy", entry.path(), e))?;
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(&dir, permissions)
            .map_err(|e| RuntimeError::io("copy", &dir, e))?;
    }
    Ok(())
}
