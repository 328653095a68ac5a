use std::{fs, io, path::Path, time::SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{errors::RuntimeError, resolve::RequestTarget};

/// One immediate child of a listed directory
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Base name of the child
    pub name: String,

    /// URL path of the child, built from the request path
    pub relative_path: String,

    /// Size as reported by the filesystem
    pub size_bytes: u64,

    /// Last modification time
    pub modified_at: DateTime<Utc>,

    /// Whether the child is a directory
    pub is_directory: bool,
}

/// Contents of a directory, folders first
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub current_path: String,

    /// Empty for the root
    pub parent_path: String,

    #[serde(rename = "files")]
    pub entries: Vec<Entry>,
}

/// Lists the immediate children of an already access checked directory target.
///
/// Children whose metadata cannot be read are skipped. Directories come first, each group keeps
/// the order in which the filesystem enumerated it.
pub fn list_directory(target: &RequestTarget) -> Result<Listing, RuntimeError> {
    let dir_entries = fs::read_dir(&target.local_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RuntimeError::NotFound("Directory not found".to_string()),
        _ => RuntimeError::io("reading directory", &target.local_path, e),
    })?;

    let mut folders = Vec::new();
    let mut files = Vec::new();
    for dir_entry in dir_entries {
        let Ok(dir_entry) = dir_entry else {
            continue;
        };
        let metadata = match dir_entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                log::debug!("Skipping {:?}: {e}", dir_entry.path());
                continue;
            }
        };

        let name = dir_entry.file_name().to_string_lossy().into_owned();
        let entry = Entry {
            relative_path: join_url(&target.request_path, &name),
            name,
            size_bytes: metadata.len(),
            modified_at: metadata
                .modified()
                .unwrap_or(SystemTime::UNIX_EPOCH)
                .into(),
            is_directory: metadata.is_dir(),
        };

        if entry.is_directory {
            folders.push(entry);
        } else {
            files.push(entry);
        }
    }
    folders.append(&mut files);

    Ok(Listing {
        current_path: target.request_path.clone(),
        parent_path: parent_url(&target.request_path),
        entries: folders,
    })
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{name}", base.trim_end_matches('/'))
}

fn parent_url(request_path: &str) -> String {
    if request_path == "/" {
        return String::new();
    }
    match Path::new(request_path).parent() {
        Some(parent) => parent.to_string_lossy().into_owned(),
        None => String::new(),
    }
}
