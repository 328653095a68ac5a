//! Mapping of request URLs onto paths beneath the served root.
//!
//! Every request goes through [`ServerRoot::resolve`] before anything else. The resolver decodes
//! and normalizes the URL path, joins it with the root and hands the result to the
//! [access guard](crate::guard) before touching the filesystem to classify the target.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::{errors::RuntimeError, guard};

/// The directory the whole service is confined to.
///
/// Built once at startup from an already canonicalized path and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRoot {
    path: PathBuf,
}

/// Per-request mapping from the URL onto the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Normalized URL path, always starting with `/`
    pub request_path: String,

    /// Absolute local path below the root
    pub local_path: PathBuf,

    /// Whether the target is addressed as (or currently is) a directory
    pub is_directory: bool,

    /// `local_path` for directories, its parent for files
    pub working_dir: PathBuf,
}

impl ServerRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves a raw (percent-encoded) URL path into a validated [`RequestTarget`].
    ///
    /// Containment is checked before the filesystem is consulted.
    pub fn resolve(&self, raw_path: &str) -> Result<RequestTarget, RuntimeError> {
        let decoded = decode_url_path(raw_path)?;
        let request_path = clean_url_path(&decoded);
        if !request_path.starts_with('/') {
            return Err(RuntimeError::MalformedRequest("Invalid path".to_string()));
        }

        let local_path = self.join(&request_path);
        guard::ensure_contained(self, &local_path)?;

        let is_directory = decoded.ends_with('/') || local_path.is_dir();
        let working_dir = if is_directory {
            local_path.clone()
        } else {
            local_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.path.clone())
        };

        Ok(RequestTarget {
            request_path,
            local_path,
            is_directory,
            working_dir,
        })
    }

    /// Resolves a destination given by the client.
    ///
    /// Absolute names are taken relative to the root, relative names relative to `working_dir`.
    /// Returns the cleaned name together with the local path, both already access checked.
    pub fn resolve_destination(
        &self,
        working_dir: &Path,
        raw: &str,
    ) -> Result<(String, PathBuf), RuntimeError> {
        let name = clean_url_path(raw);
        let path = if name.starts_with('/') {
            self.join(&name)
        } else {
            normalize_local_path(&working_dir.join(&name))
        };
        guard::ensure_destination(self, &name, &path)?;
        Ok((name, path))
    }

    fn join(&self, url_path: &str) -> PathBuf {
        normalize_local_path(&self.path.join(url_path.trim_start_matches('/')))
    }
}

fn decode_url_path(raw: &str) -> Result<String, RuntimeError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| RuntimeError::MalformedRequest("Invalid path encoding".to_string()))?;
    if decoded.contains('\0') {
        return Err(RuntimeError::MalformedRequest("Invalid path".to_string()));
    }
    Ok(decoded.into_owned())
}

/// Lexically cleans a slash separated path.
///
/// Collapses duplicate separators, drops `.` segments and resolves `..` against the preceding
/// segment. A rooted path never climbs above `/`; a relative path keeps leading `..` segments.
/// The empty path cleans to `.`.
pub fn clean_url_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Lexically normalizes a local path without touching the filesystem.
pub fn normalize_local_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component)
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push(component);
                }
            }
        }
    }
    normalized
}
