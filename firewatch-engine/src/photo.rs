//! Photo evidence: content-type and size contract plus storage.

use std::path::PathBuf;

use firewatch_fs::Filesystem;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Largest accepted photo payload in bytes.
pub const MAX_PHOTO_BYTES: usize = 4 * 1024 * 1024;

/// Hex characters of the content digest used for stored file names.
const STORED_NAME_HEX_LEN: usize = 32;

/// Errors from photo validation or storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    #[error("unsupported content type {0:?}, expected jpeg, png or webp")]
    UnsupportedType(String),

    #[error("photo is {size} bytes, max {max}")]
    TooLarge { size: usize, max: usize },

    #[error("photo storage failed: {0}")]
    Store(String),
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    Jpeg,
    Png,
    Webp,
}

impl PhotoKind {
    /// Resolve a declared content type, ignoring case.
    pub fn from_content_type(content_type: &str) -> Result<Self, PhotoError> {
        match content_type.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Ok(PhotoKind::Jpeg),
            "image/png" => Ok(PhotoKind::Png),
            "image/webp" => Ok(PhotoKind::Webp),
            _ => Err(PhotoError::UnsupportedType(content_type.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            PhotoKind::Jpeg => "jpg",
            PhotoKind::Png => "png",
            PhotoKind::Webp => "webp",
        }
    }
}

/// A photo attached to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Check type then size.
    pub fn validate(&self) -> Result<PhotoKind, PhotoError> {
        let kind = PhotoKind::from_content_type(&self.content_type)?;
        if self.data.len() > MAX_PHOTO_BYTES {
            return Err(PhotoError::TooLarge {
                size: self.data.len(),
                max: MAX_PHOTO_BYTES,
            });
        }
        Ok(kind)
    }
}

/// Storage collaborator for validated photos.
pub trait PhotoStore: Send + Sync {
    /// Persist the payload and return an opaque path, or `None` when
    /// nothing was kept.
    fn save(&self, kind: PhotoKind, data: &[u8]) -> Result<Option<String>, PhotoError>;
}

/// Content-addressed file name for a payload.
pub fn stored_name(kind: PhotoKind, data: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(data));
    format!("{}.{}", &digest[..STORED_NAME_HEX_LEN], kind.extension())
}

/// Writes photos under one directory through a [`Filesystem`].
#[derive(Debug, Clone)]
pub struct FsPhotoStore<F: Filesystem> {
    fs: F,
    dir: PathBuf,
}

impl<F: Filesystem> FsPhotoStore<F> {
    pub fn new(fs: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

impl<F: Filesystem> PhotoStore for FsPhotoStore<F> {
    fn save(&self, kind: PhotoKind, data: &[u8]) -> Result<Option<String>, PhotoError> {
        let path = self.dir.join(stored_name(kind, data));
        self.fs
            .write_atomic(&path, data)
            .map_err(|e| PhotoError::Store(e.to_string()))?;
        Ok(Some(path.display().to_string()))
    }
}

/// Keeps nothing, so verdicts never reference a photo.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPhotoStore;

impl PhotoStore for NoPhotoStore {
    fn save(&self, _kind: PhotoKind, _data: &[u8]) -> Result<Option<String>, PhotoError> {
        Ok(None)
    }
}
