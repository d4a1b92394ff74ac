use bytes::Bytes;
use headers::{ContentRange, HeaderMap, HeaderMapExt};
use log::debug;
use reqwest::header::{HeaderValue, ACCEPT, ETAG, RANGE};
use reqwest::{Client, Response, StatusCode};
use url::Url;
use crate::download::chunk_range::ChunkRange;
use crate::download::error::ChunkFailure;

/// Body and metadata of a validated `206 Partial Content` response.
#[derive(Debug, Clone)]
pub struct RangePayload {
    /// Span actually served, as reported by `Content-Range` (or the requested span without one).
    pub range: ChunkRange,
    /// Full resource length from `Content-Range`, when the server reports it.
    pub total_len: Option<u64>,
    pub etag: Option<String>,
    pub body: Bytes,
}

/// Issues range requests against one resource.
#[derive(Debug, Clone)]
pub struct RangeFetcher {
    client: Client,
    url: Url,
    headers: HeaderMap,
}

impl RangeFetcher {
    pub fn new(client: Client, url: Url, extra_headers: &HeaderMap) -> Self {
        let mut header_map = HeaderMap::new();
        header_map.insert(ACCEPT, HeaderValue::from_static("*/*"));
        header_map.typed_insert(headers::Connection::keep_alive());
        for (name, value) in extra_headers.iter() {
            header_map.insert(name, value.clone());
        }

        Self { client, url, headers: header_map }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sends `GET` with a `Range` header for `range` and returns the response unchecked.
    pub async fn send(&self, range: ChunkRange) -> Result<Response, ChunkFailure> {
        debug!("Requesting {} [{}]", self.url, range.to_header_value());
        let response = self.client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .header(RANGE, range.to_header_value())
            .send()
            .await?;

        Ok(response)
    }

    /// Sends the request and rejects anything that is not `206 Partial Content`.
    pub async fn send_partial(&self, range: ChunkRange) -> Result<Response, ChunkFailure> {
        let response = self.send(range).await?;
        check_partial(&response)?;

        Ok(response)
    }

    /// Fetches and buffers `range`, validating status, `Content-Range` and body length.
    pub async fn fetch(&self, range: ChunkRange) -> Result<RangePayload, ChunkFailure> {
        let response = self.send_partial(range).await?;
        read_payload(response, range).await
    }
}

pub fn check_partial(response: &Response) -> Result<(), ChunkFailure> {
    match response.status() {
        StatusCode::PARTIAL_CONTENT => Ok(()),
        status => Err(ChunkFailure::UnexpectedStatus(status)),
    }
}

pub fn etag_of(response: &Response) -> Option<String> {
    response.headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Reads the body of a `206` response to `requested`.
///
/// A `Content-Range` must start at the requested offset and may end early only when the
/// resource is shorter than the request. The body must match the served span exactly.
pub async fn read_payload(response: Response, requested: ChunkRange) -> Result<RangePayload, ChunkFailure> {
    let content_range = response.headers().typed_get::<ContentRange>();
    let etag = etag_of(&response);

    let (range, total_len) = match content_range {
        Some(content_range) => {
            let (start, end) = content_range.bytes_range()
                .ok_or_else(|| ChunkFailure::UnexpectedContentRange("no byte range".to_string()))?;
            if start != requested.start || end > requested.end || end < start {
                return Err(ChunkFailure::UnexpectedContentRange(format!(
                    "got bytes {}-{}, requested {}-{}",
                    start, end, requested.start, requested.end
                )));
            }
            (ChunkRange::new(start, end), content_range.bytes_len())
        }
        None => (requested, None),
    };

    let body = response.bytes().await?;
    if body.len() as u64 != range.len() {
        return Err(ChunkFailure::UnexpectedLength {
            expected: range.len(),
            actual: body.len() as u64,
        });
    }

    Ok(RangePayload { range, total_len, etag, body })
}
