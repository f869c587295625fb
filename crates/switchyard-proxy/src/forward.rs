//! Request forwarding to the selected upstream.
//!
//! One routine handles every supported verb: the inbound method, headers and
//! body bytes are replayed against the upstream URL, and the upstream status,
//! headers and body bytes are handed back unchanged. The body is buffered so
//! an upstream that hangs up half-way can be turned into a clean `204`.

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::stream;
use reqwest::Client;
use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::debug;

/// Methods the proxy forwards; anything else is rejected.
pub const FORWARDED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Headers owned by the connection rather than the message. These are never
/// copied in either direction; the HTTP stack regenerates what it needs.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Upstream failure that is not a premature close.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request to {url} failed: {source}")]
    Upstream {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// What the upstream answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardedResponse {
    /// The degraded answer used when the upstream closed the connection early.
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> Response {
        let body = if self.status == StatusCode::NO_CONTENT && self.body.is_empty() {
            // No exact size, so the router does not add `content-length: 0`
            Body::from_stream(stream::empty::<io::Result<Bytes>>())
        } else {
            Body::from(self.body)
        };
        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Whether `method` is one of [`FORWARDED_METHODS`].
pub fn is_forwardable(method: &Method) -> bool {
    FORWARDED_METHODS.contains(method)
}

/// Check if a header should be copied between client and upstream.
fn should_forward_header(name: &HeaderName) -> bool {
    !HOP_BY_HOP_HEADERS.contains(&name.as_str())
}

fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| should_forward_header(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Build the shared upstream client.
///
/// `timeout` bounds connecting and each read from the upstream, for every
/// method. There is no cap on total duration, so long completions that keep
/// streaming are never cut off. Redirects are relayed to the caller, never
/// followed.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .redirect(Policy::none())
        .pool_max_idle_per_host(10)
        .build()
}

/// Forward a request to `upstream_url` and collect the full response.
///
/// A connection closed by the upstream before the response was complete
/// yields [`ForwardedResponse::no_content`] instead of an error.
pub async fn forward(
    client: &Client,
    upstream_url: &str,
    method: Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<ForwardedResponse, ForwardError> {
    debug!(%method, upstream = %upstream_url, bytes = body.len(), "Forwarding request");

    let mut request = client
        .request(method, upstream_url)
        .headers(forwardable_headers(headers));
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream_error = |source| ForwardError::Upstream {
        url: upstream_url.to_string(),
        source,
    };

    let response = match request.send().await {
        Ok(resp) => resp,
        Err(e) if is_premature_close(&e) => {
            debug!(upstream = %upstream_url, error = %e, "Connection closed prematurely");
            return Ok(ForwardedResponse::no_content());
        }
        Err(e) => return Err(upstream_error(e)),
    };

    let status = response.status();
    let headers = forwardable_headers(response.headers());

    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) if is_premature_close(&e) => {
            debug!(upstream = %upstream_url, error = %e, "Connection closed prematurely");
            return Ok(ForwardedResponse::no_content());
        }
        Err(e) => return Err(upstream_error(e)),
    };

    debug!(upstream = %upstream_url, status = status.as_u16(), bytes = body.len(), "Upstream responded");
    Ok(ForwardedResponse {
        status,
        headers,
        body,
    })
}

/// Whether an error chain contains an upstream hang-up.
///
/// Matches hyper's "connection closed before message completed" and the
/// I/O kinds a peer closing mid-message surfaces as.
pub fn is_premature_close(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>()
            && hyper_err.is_incomplete_message()
        {
            return true;
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            )
        {
            return true;
        }
        current = e.source();
    }
    false
}
