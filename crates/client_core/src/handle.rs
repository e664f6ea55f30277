//! Image handles: shared, immutable image bytes with a stable identity.

use std::{
    fmt,
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use image::ImageFormat;
use shared::{domain::HandleId, protocol::is_accepted_mime};

use crate::error::UploadError;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_handle_id() -> HandleId {
    HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Cloning shares the bytes; the backing buffer is freed when the last
/// owner drops its clone.
#[derive(Clone)]
pub struct ImageHandle {
    id: HandleId,
    name: Arc<str>,
    mime: Arc<str>,
    bytes: Arc<[u8]>,
}

impl ImageHandle {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name: String = name.into();
        let mime: String = mime.into();
        let bytes: Vec<u8> = bytes.into();
        Self {
            id: next_handle_id(),
            name: Arc::from(name),
            mime: Arc::from(mime),
            bytes: Arc::from(bytes),
        }
    }

    /// Validates an upload: non-empty and one of the accepted image types.
    pub fn from_upload(name: &str, bytes: Vec<u8>) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty {
                name: name.to_string(),
            });
        }

        let guessed = mime_guess::from_path(name)
            .first_raw()
            .unwrap_or("application/octet-stream");
        let sniffed = image::guess_format(&bytes).ok().map(|format| format.to_mime_type());

        let mime = match sniffed {
            Some(mime) if is_accepted_mime(mime) => mime,
            Some(mime) => {
                return Err(UploadError::UnsupportedType {
                    name: name.to_string(),
                    mime: mime.to_string(),
                })
            }
            None => {
                return Err(UploadError::UnsupportedType {
                    name: name.to_string(),
                    mime: guessed.to_string(),
                })
            }
        };

        if guessed != mime {
            tracing::debug!(name, guessed, sniffed = mime, "file extension disagrees with content");
        }

        Ok(Self::new(name, mime, bytes))
    }

    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path).map_err(|source| UploadError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self::from_upload(&name, bytes)
    }

    /// Wraps bytes produced by a transform or the backend, keeping the
    /// source file name. The MIME type comes from the content when it is
    /// recognisable, otherwise from `fallback_mime`.
    pub fn derived(name: &str, fallback_mime: Option<&str>, bytes: Vec<u8>) -> Self {
        let mime = image::guess_format(&bytes)
            .ok()
            .map(|format| format.to_mime_type())
            .or(fallback_mime)
            .unwrap_or("application/octet-stream")
            .to_string();
        Self::new(name, mime, bytes)
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn display_uri(&self) -> String {
        format!("blob:image-lab/{}", self.id.0)
    }

    /// Extension matching the MIME type, for writing results to disk.
    pub fn extension(&self) -> &'static str {
        match self.mime() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }

    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageHandle {}
