//! Moving file bytes in and out of the root.
//!
//! Downloads stream the file with attachment headers, or return it base64 encoded inside the
//! JSON envelope. Uploads accept either a multipart `file` part or a `filename`/`content` pair
//! with base64 content. Every write lands in a temporary file next to its destination first and
//! is then renamed over it, so readers never see a half written file.

use std::{
    fs::{self, File},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{
    HttpRequest, HttpResponse,
    http::header::{self, ContentDisposition, DispositionParam, DispositionType, HeaderValue},
    web,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use futures::TryStreamExt;
use serde::Serialize;
use tempfile::{NamedTempFile, SpooledTempFile};

use crate::{
    envelope::{Negotiation, respond_data},
    errors::RuntimeError,
    guard,
    params::{self, string_param},
    resolve::{RequestTarget, ServerRoot},
};

/// JSON payload of an API-mode download
#[derive(Debug, Serialize)]
pub struct EncodedContent {
    pub content: String,
}

/// Serves the file behind `target`.
///
/// HEAD requests get the same response; the server sends its sized `Content-Length` and drops
/// the body.
pub async fn download(
    req: &HttpRequest,
    target: &RequestTarget,
    negotiation: &Negotiation,
) -> Result<HttpResponse, RuntimeError> {
    let path = target.local_path.clone();
    let file = web::block(move || open_file(&path)).await??;

    if negotiation.json {
        let path = target.local_path.clone();
        let content = web::block(move || read_encoded(file, &path)).await??;
        return Ok(respond_data(negotiation, EncodedContent { content }));
    }

    let disposition = ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(file_name(&target.local_path))],
    };

    let named = NamedFile::from_file(file, &target.local_path)
        .map_err(|e| RuntimeError::io("opening file", &target.local_path, e))?
        .set_content_type(mime::APPLICATION_OCTET_STREAM)
        .set_content_disposition(disposition);

    let mut res = named.into_response(req);
    res.headers_mut()
        .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    Ok(res)
}

fn open_file(path: &Path) -> Result<File, RuntimeError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RuntimeError::NotFound("File not found".to_string()),
        _ => RuntimeError::io("opening file", path, e),
    })?;
    let metadata = file
        .metadata()
        .map_err(|e| RuntimeError::io("getting file info", path, e))?;

    if metadata.is_dir() {
        return Err(RuntimeError::MalformedRequest(
            "Cannot read directory".to_string(),
        ));
    }
    Ok(file)
}

fn read_encoded(mut file: File, path: &Path) -> Result<String, RuntimeError> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| RuntimeError::io("reading file", path, e))?;
    Ok(BASE64.encode(bytes))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Stores an upload below `target`.
///
/// `multipart/form-data` requests go through the multipart protocol, everything else is read as
/// parameters carrying `filename` and base64 `content`.
pub async fn upload(
    req: &HttpRequest,
    payload: web::Payload,
    target: &RequestTarget,
    root: &ServerRoot,
    memory_limit: usize,
) -> Result<PathBuf, RuntimeError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str() == mime::MULTIPART_FORM_DATA.as_ref());

    if is_multipart {
        upload_multipart(req, payload, target, root, memory_limit).await
    } else {
        upload_encoded(req, payload, target, root, memory_limit).await
    }
}

async fn upload_multipart(
    req: &HttpRequest,
    payload: web::Payload,
    target: &RequestTarget,
    root: &ServerRoot,
    memory_limit: usize,
) -> Result<PathBuf, RuntimeError> {
    let mut multipart = Multipart::new(req.headers(), payload);

    while let Some(mut field) = multipart
        .try_next()
        .await
        .map_err(|e| RuntimeError::MultipartError(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = if target.is_directory {
            let uploaded = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .unwrap_or_default();
            upload_base_name(uploaded)?
        } else {
            file_name(&target.local_path)
        };

        let dst = target.working_dir.join(&filename);
        guard::ensure_destination(root, &filename, &dst)?;

        // Held in memory up to the ceiling, rolled over to disk beyond it.
        let mut spool = SpooledTempFile::new(memory_limit);
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| RuntimeError::MultipartError(e.to_string()))?
        {
            spool
                .write_all(&chunk)
                .map_err(|e| RuntimeError::io("buffering upload", &dst, e))?;
        }

        let saved = dst.clone();
        web::block(move || {
            spool
                .seek(SeekFrom::Start(0))
                .map_err(|e| RuntimeError::io("buffering upload", &dst, e))?;
            write_atomically(&dst, &mut spool)
        })
        .await??;

        return Ok(saved);
    }

    Err(RuntimeError::MalformedRequest(
        "Error retrieving file: no 'file' part in upload".to_string(),
    ))
}

/// Reduces a client supplied filename to a single path component.
///
/// Browsers on some platforms send full local paths with either separator.
fn upload_base_name(uploaded: &str) -> Result<String, RuntimeError> {
    let base = uploaded
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => Err(RuntimeError::MalformedRequest(
            "Error retrieving file: missing file name".to_string(),
        )),
        name => Ok(name.to_string()),
    }
}

async fn upload_encoded(
    req: &HttpRequest,
    payload: web::Payload,
    target: &RequestTarget,
    root: &ServerRoot,
    memory_limit: usize,
) -> Result<PathBuf, RuntimeError> {
    let body = params::read_body(payload, memory_limit).await?;
    let params = params::collect(req, &body)?;

    let filename =
        string_param(&params, "filename")?.unwrap_or_else(|| target.request_path.clone());
    if filename.ends_with('/') {
        return Err(RuntimeError::MalformedRequest(
            "Destination names a directory".to_string(),
        ));
    }
    let (_, dst) = root.resolve_destination(&target.working_dir, &filename)?;

    let content = string_param(&params, "content")?
        .ok_or_else(|| RuntimeError::MalformedRequest("Empty content".to_string()))?;
    let bytes = BASE64
        .decode(content.as_bytes())
        .map_err(|_| RuntimeError::MalformedRequest("Error content".to_string()))?;

    let saved = dst.clone();
    web::block(move || write_atomically(&dst, &mut io::Cursor::new(bytes))).await??;
    Ok(saved)
}

/// Writes `content` to `dst`, creating parent directories as needed.
///
/// The data goes to a temporary file in the destination directory which is then renamed over
/// `dst`, replacing any existing file.
pub fn write_atomically(dst: &Path, content: &mut impl Read) -> Result<(), RuntimeError> {
    if dst.is_dir() {
        return Err(RuntimeError::MalformedRequest(
            "Destination is a directory".to_string(),
        ));
    }

    let parent = dst
        .parent()
        .ok_or_else(|| RuntimeError::AccessDenied("Access denied".to_string()))?;
    fs::create_dir_all(parent).map_err(|e| RuntimeError::io("creating directory", parent, e))?;

    let mut tmp =
        NamedTempFile::new_in(parent).map_err(|e| RuntimeError::io("creating file", dst, e))?;
    io::copy(content, &mut tmp).map_err(|e| RuntimeError::io("writing file", dst, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|e| RuntimeError::io("writing file", dst, e))?;
    }

    tmp.persist(dst)
        .map_err(|e| RuntimeError::io("saving file", dst, e.error))?;
    Ok(())
}
