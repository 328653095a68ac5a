//! Containment checks keeping every operation inside the served root.
//!
//! The checks are purely lexical. Callers must hand in paths that were normalized by the
//! [resolver](crate::resolve) first; `..` segments are not re-interpreted here.

use std::path::{MAIN_SEPARATOR, Path};

use crate::{errors::RuntimeError, resolve::ServerRoot};

/// Whether `candidate` is the root itself or a descendant of it.
///
/// The root must be a prefix of the candidate that ends on a separator boundary, so a root of
/// `/srv/data` does not contain `/srv/data-evil`.
pub fn is_contained(root: &Path, candidate: &Path) -> bool {
    let root = root.to_string_lossy();
    let candidate = candidate.to_string_lossy();

    match candidate.strip_prefix(root.as_ref()) {
        Some("") => true,
        Some(rest) => rest.starts_with(MAIN_SEPARATOR) || root.ends_with(MAIN_SEPARATOR),
        None => false,
    }
}

/// Rejects any path outside the root.
pub fn ensure_contained(root: &ServerRoot, candidate: &Path) -> Result<(), RuntimeError> {
    if is_contained(root.path(), candidate) {
        Ok(())
    } else {
        Err(RuntimeError::AccessDenied("Access denied".to_string()))
    }
}

/// Rejects relocate and upload destinations.
///
/// On top of containment, the root itself (`/`) is never a valid destination.
pub fn ensure_destination(
    root: &ServerRoot,
    name: &str,
    candidate: &Path,
) -> Result<(), RuntimeError> {
    if name == "/" || candidate == root.path() {
        return Err(RuntimeError::AccessDenied("Access denied".to_string()));
    }
    ensure_contained(root, candidate)
}
