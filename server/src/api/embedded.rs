//! Static assets embedded in the binary from `server/assets`

use axum::body::Body;
use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets"]
struct Assets;

// Assets are not content-hashed; clients revalidate against the ETag
const CACHE_REVALIDATE: &str = "public, max-age=0, must-revalidate";

/// Serve `/assets/{*path}`
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    let Some(file) = Assets::get(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let etag = hex::encode(file.metadata.sha256_hash());

    (
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, CACHE_REVALIDATE.to_string()),
            (header::ETAG, format!("\"{}\"", etag)),
        ],
        Body::from(file.data.into_owned()),
    )
        .into_response()
}
