use std::{fs, io};

use crate::{errors::RuntimeError, resolve::RequestTarget};

/// Removes the single file or directory behind `target`.
///
/// Removal is not recursive: a directory must be empty, otherwise the request is rejected and
/// nothing is removed. The root itself can never be deleted.
pub fn delete(target: &RequestTarget) -> Result<(), RuntimeError> {
    if target.request_path == "/" {
        return Err(RuntimeError::AccessDenied("Forbidden".to_string()));
    }

    let path = &target.local_path;
    let metadata = fs::symlink_metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RuntimeError::NotFound("Not found".to_string()),
        _ => RuntimeError::io("reading path", path, e),
    })?;

    let removed = if metadata.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };

    removed.map_err(|e| match e.kind() {
        io::ErrorKind::DirectoryNotEmpty => RuntimeError::MalformedRequest(format!(
            "Unable to remove the path {}: directory not empty",
            target.request_path
        )),
        io::ErrorKind::NotFound => RuntimeError::NotFound("Not found".to_string()),
        _ => RuntimeError::io("removing path", path, e),
    })
}
