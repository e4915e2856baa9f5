use axum::{
    body::Body,
    http::{header, Response, StatusCode, Uri},
};
use rust_embed::Embed;

/// Embedded control page and its assets
#[derive(Embed)]
#[folder = "web/"]
pub struct StaticAssets;

/// Serve the control page for the root path
pub async fn index_handler() -> Response<Body> {
    serve_file("index.html")
}

/// Serve any other embedded asset
pub async fn static_handler(uri: Uri) -> Response<Body> {
    serve_file(uri.path().trim_start_matches('/'))
}

fn serve_file(path: &str) -> Response<Body> {
    match StaticAssets::get(path) {
        Some(asset) => {
            let mime = mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string();
            build(
                StatusCode::OK,
                &mime,
                Body::from(asset.data.into_owned()),
            )
        }
        None => {
            tracing::debug!("Static asset not found: {}", path);
            build(
                StatusCode::NOT_FOUND,
                "text/plain; charset=utf-8",
                Body::from("Not Found"),
            )
        }
    }
}

fn build(status: StatusCode, content_type: &str, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}
