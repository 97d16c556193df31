use crate::error::{ClientError, Result};
use std::fs;
use std::path::Path;

/// Upload ceiling enforced by the backend (500 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// File extensions the backend accepts, lowercase with leading dot.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".flac", ".ogg", ".m4a", ".aac"];

/// MIME types that may accompany an upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "audio/wav",
    "audio/x-wav",
    "audio/mp3",
    "audio/mpeg",
    "audio/flac",
    "audio/ogg",
    "audio/m4a",
    "audio/x-m4a",
    "audio/aac",
];

/// Check a candidate upload without touching the filesystem or network.
///
/// Returns `None` when the file is acceptable, otherwise a human-readable
/// rejection reason. The extension check is authoritative: a declared MIME
/// type never rescues a file with an unsupported extension.
pub fn validate_upload(file_name: &str, size: u64, mime: Option<&str>) -> Option<String> {
    if size > MAX_UPLOAD_BYTES {
        return Some(format!(
            "File too large. Maximum size is {}MB",
            MAX_UPLOAD_BYTES / 1024 / 1024
        ));
    }

    let lower = file_name.to_lowercase();
    if !ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return Some(
            "Unsupported file type. Please use WAV, MP3, FLAC, OGG, M4A, or AAC files."
                .to_string(),
        );
    }

    if let Some(mime) = mime {
        if !ALLOWED_MIME_TYPES.iter().any(|m| mime.eq_ignore_ascii_case(m)) {
            return Some(format!(
                "Unsupported MIME type `{mime}`. Expected an audio type."
            ));
        }
    }

    None
}

/// Validate a file on disk before uploading it.
pub fn validate_file(path: &Path) -> Result<()> {
    let meta = fs::metadata(path)
        .map_err(|_| ClientError::InvalidUpload(format!("File not found: {}", path.display())))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match validate_upload(&file_name, meta.len(), None) {
        Some(reason) => Err(ClientError::InvalidUpload(reason)),
        None => Ok(()),
    }
}

/// Best-effort MIME type for an allowed extension, used when building the
/// multipart upload. Falls back to a generic audio type.
pub fn mime_for_file(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();
    match lower.rsplit('.').next() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/m4a",
        Some("aac") => "audio/aac",
        _ => "application/octet-stream",
    }
}
