//! Wire constants for the image processing endpoint.

/// Multipart field carrying the image bytes.
pub const IMAGE_FIELD: &str = "image";
/// Multipart field carrying the action wire name.
pub const ACTION_FIELD: &str = "action";

pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000/api/procesar-imagen/";

/// MIME types accepted by the upload surface.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

pub fn is_accepted_mime(mime: &str) -> bool {
    ACCEPTED_MIME_TYPES
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(mime.trim()))
}

/// Extensions offered by file dialogs for the accepted MIME types.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
