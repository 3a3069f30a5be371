//! Media files, the client-side upload ceiling and the upload function contract.

use crate::story::MediaType;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Default ceiling for images and the compression target for videos (8 MiB).
pub const DEFAULT_UPLOAD_CAP_BYTES: u64 = 8 * 1024 * 1024;

/// Media errors.
#[derive(Debug, Error, PartialEq)]
pub enum MediaError {
    #[error("The selected file is empty")]
    Empty,
    #[error("{media_type} is too large ({size} bytes, limit {limit} bytes)")]
    TooLarge {
        media_type: &'static str,
        size: u64,
        limit: u64,
    },
    #[error("Video compression failed: {0}")]
    Compression(String),
    #[error("Upload failed ({status}): {message}")]
    Upload { status: u16, message: String },
    #[error("Unexpected upload response: {0}")]
    InvalidResponse(String),
}

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Client-side upload ceilings, checked before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadLimits {
    /// Images above this size are rejected.
    pub max_image_bytes: u64,
    /// Videos are compressed toward this size and rejected if still above it.
    pub video_target_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_UPLOAD_CAP_BYTES,
            video_target_bytes: DEFAULT_UPLOAD_CAP_BYTES,
        }
    }
}

impl UploadLimits {
    /// The ceiling that applies to `media_type`.
    pub fn cap_for(&self, media_type: MediaType) -> u64 {
        match media_type {
            MediaType::Image => self.max_image_bytes,
            MediaType::Video => self.video_target_bytes,
        }
    }
}

/// A picked or captured media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub media_type: MediaType,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    /// Create a media file, inferring the content type from the file name.
    pub fn new(media_type: MediaType, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            media_type,
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased file extension, or a default for the media type.
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
            _ => match self.media_type {
                MediaType::Image => "jpg".to_string(),
                MediaType::Video => "mp4".to_string(),
            },
        }
    }
}

/// Guess a MIME type from a file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Check a file against the upload ceiling for its media type.
pub fn check_size(file: &MediaFile, limits: &UploadLimits) -> MediaResult<()> {
    if file.bytes.is_empty() {
        return Err(MediaError::Empty);
    }
    let limit = limits.cap_for(file.media_type);
    if file.size() > limit {
        return Err(MediaError::TooLarge {
            media_type: file.media_type.as_str(),
            size: file.size(),
            limit,
        });
    }
    Ok(())
}

/// Shrinks videos before upload.
pub trait VideoCompressor {
    /// Compress `file` toward `target_bytes`. The result may still exceed the target.
    fn compress(&self, file: MediaFile, target_bytes: u64) -> MediaResult<MediaFile>;
}

/// Compressor that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompressor;

impl VideoCompressor for PassthroughCompressor {
    fn compress(&self, file: MediaFile, _target_bytes: u64) -> MediaResult<MediaFile> {
        Ok(file)
    }
}

/// Request body for the media upload function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadRequest {
    pub base64: String,
    pub file_name: String,
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

impl MediaUploadRequest {
    /// Encode `file` for upload under `{prefix}/{user_id}/{uuid}.{ext}`.
    pub fn encode(file: &MediaFile, prefix: &str, user_id: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        Self {
            base64: STANDARD.encode(&file.bytes),
            file_name: format!("{}.{}", Uuid::new_v4(), file.extension()),
            content_type: file.content_type.clone(),
            path_prefix: Some(format!("{}/{}", prefix, user_id)),
        }
    }

    /// Full storage path the function will write to.
    pub fn storage_path(&self) -> String {
        match &self.path_prefix {
            Some(prefix) => format!("{}/{}", prefix, self.file_name),
            None => self.file_name.clone(),
        }
    }

    /// Decode the payload back into bytes.
    pub fn decode(&self) -> MediaResult<Vec<u8>> {
        STANDARD
            .decode(&self.base64)
            .map_err(|e| MediaError::InvalidResponse(format!("invalid base64 payload: {}", e)))
    }
}

/// Successful upload result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub public_url: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadResponseBody {
    Uploaded(UploadedMedia),
    Failed { error: String },
}

/// Interpret the upload function's HTTP status and body.
pub fn parse_upload_response(status: u16, body: &str) -> MediaResult<UploadedMedia> {
    let parsed: Result<UploadResponseBody, _> = serde_json::from_str(body);
    match (status, parsed) {
        (200..=299, Ok(UploadResponseBody::Uploaded(uploaded))) => Ok(uploaded),
        (_, Ok(UploadResponseBody::Failed { error })) => Err(MediaError::Upload {
            status,
            message: error,
        }),
        (200..=299, Err(e)) => Err(MediaError::InvalidResponse(e.to_string())),
        (_, _) => Err(MediaError::Upload {
            status,
            message: "upload failed".to_string(),
        }),
    }
}
