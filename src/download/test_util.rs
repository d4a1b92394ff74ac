use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use rcgen::CertifiedKey;
use wiremock::{Request, Respond, ResponseTemplate};

/// Serves `body` honoring single `Range: bytes=a-b` requests the way a static file server does.
pub struct FileResponder {
    pub body: Vec<u8>,
    pub etag: Option<String>,
    pub delay: Option<Duration>,
}

impl FileResponder {
    pub fn new(body: Vec<u8>) -> Self {
        Self { body, etag: None, delay: None }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_etag(mut self, etag: &str) -> Self {
        self.etag = Some(etag.to_string());
        self
    }
}

impl Respond for FileResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let response = serve_range(&self.body, self.etag.as_deref(), request);
        match self.delay {
            Some(delay) => response.set_delay(delay),
            None => response,
        }
    }
}

pub fn requested_start(request: &Request) -> Option<u64> {
    let range = request.headers.get("range")?.to_str().ok()?;
    let (start, _) = range.strip_prefix("bytes=")?.split_once('-')?;
    start.parse().ok()
}

/// `bytes=a-b` as `(a, b)`.
pub fn parse_range(value: &str) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

pub fn serve_range(body: &[u8], etag: Option<&str>, request: &Request) -> ResponseTemplate {
    let mut response = match request.headers.get("range").and_then(|v| v.to_str().ok()) {
        None => ResponseTemplate::new(200).set_body_bytes(body.to_vec()),
        Some(range) => {
            let (start, end) = parse_range(range).unwrap();
            if start >= body.len() {
                return ResponseTemplate::new(416)
                    .insert_header("Content-Range", format!("bytes */{}", body.len()).as_str());
            }
            let end = end.min(body.len() - 1);
            ResponseTemplate::new(206)
                .insert_header("Content-Range", format!("bytes {start}-{end}/{}", body.len()).as_str())
                .set_body_bytes(body[start..=end].to_vec())
        }
    };

    if let Some(etag) = etag {
        response = response.insert_header("ETag", etag);
    }
    response
}

/// Deterministic non-repeating-looking content.
pub fn sample_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
}

struct StaticFile {
    body: Vec<u8>,
    etag: String,
}

async fn serve_static_file(State(file): State<Arc<StaticFile>>, headers: HeaderMap) -> Response {
    let len = file.body.len();
    let range = headers.get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_range);

    match range {
        None => (StatusCode::OK, [(header::ETAG, file.etag.clone())], file.body.clone()).into_response(),
        Some((start, _)) if start >= len => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{len}"))],
        )
            .into_response(),
        Some((start, end)) => {
            let end = end.min(len - 1);
            (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_RANGE, format!("bytes {start}-{end}/{len}")),
                    (header::ETAG, file.etag.clone()),
                ],
                file.body[start..=end].to_vec(),
            )
                .into_response()
        }
    }
}

/// Serves `body` at `path` over HTTPS with a freshly generated self-signed certificate.
/// Returns the `https://` URL of the file.
pub async fn tls_file_server(path: &str, body: Vec<u8>, etag: &str) -> String {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()]).unwrap();
    let config = RustlsConfig::from_pem(cert.pem().into_bytes(), key_pair.serialize_pem().into_bytes())
        .await
        .unwrap();

    let state = Arc::new(StaticFile { body, etag: etag.to_string() });
    let app = Router::new()
        .route(path, get(serve_static_file))
        .with_state(state);

    let handle = Handle::new();
    let server = axum_server::bind_rustls(SocketAddr::from(([127, 0, 0, 1], 0)), config)
        .handle(handle.clone());
    tokio::spawn(async move { server.serve(app.into_make_service()).await });

    let addr = handle.listening().await.unwrap();
    format!("https://127.0.0.1:{}{}", addr.port(), path)
}
