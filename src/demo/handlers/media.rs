use crate::error::AdSlotError;
use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

/// Serve synthetic bytes for a demo asset
///
/// The content is a placeholder; only the content type follows the file
/// extension.
pub async fn serve_media(Path(name): Path<String>) -> Response {
    let content_type = match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("mp4") => "video/mp4",
        _ => return AdSlotError::Media(format!("unknown asset {name}")).into_response(),
    };

    debug!("Serving demo asset {}", name);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        format!("demo asset {name}").into_bytes(),
    )
        .into_response()
}
