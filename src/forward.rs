//! Forwarding engine: relays a permitted request and streams the response.

use std::time::Instant;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http::header::{HeaderValue, CONTENT_TYPE, HOST};
use http::{Response, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::Request;
use url::Url;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type produced by the gateway: either a short plain-text message or
/// a streamed upstream body. Upstream streams are `Send` but not `Sync`,
/// hence the unsync boxing.
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;

/// Build a plain-text response with the given status code.
pub fn text_response(status: StatusCode, message: impl Into<String>) -> Response<ProxyBody> {
    let body = Full::new(Bytes::from(message.into()))
        .map_err(|never| match never {})
        .boxed_unsync();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Relays permitted requests upstream through a shared HTTP client.
///
/// No custom timeout beyond transport defaults, no retries. Response
/// bodies are handed to the caller as a stream, so response size is
/// unbounded under constant memory use.
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    /// Create a forwarder with a freshly built shared client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Dispatch `request` to `target` and mirror the upstream response.
    ///
    /// Method and body stream are preserved; every inbound header is
    /// copied verbatim (duplicates included) with `Host` replaced by the
    /// destination host. On success the upstream status and headers are
    /// copied verbatim and the body streamed through. A failure while
    /// streaming after the status line is committed can only be logged.
    pub async fn execute(&self, request: Request<Incoming>, target: Url) -> Response<ProxyBody> {
        let started = Instant::now();
        let (parts, body) = request.into_parts();

        let mut headers = parts.headers;
        let host_value = match (target.host_str(), target.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        match HeaderValue::from_str(&host_value) {
            Ok(value) => {
                headers.insert(HOST, value);
            }
            Err(err) => {
                log::error!("failed to create request: bad host {host_value:?}: {err}");
                return text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to create request: bad host {host_value}"),
                );
            }
        }

        let outbound = self
            .client
            .request(parts.method, target.clone())
            .headers(headers)
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .build();
        let outbound = match outbound {
            Ok(outbound) => outbound,
            Err(err) => {
                log::error!("failed to create request: target={target} error={err}");
                return text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to create request: {err}"),
                );
            }
        };

        let upstream = match self.client.execute(outbound).await {
            Ok(upstream) => upstream,
            Err(err) => {
                log::error!("upstream fetch failed: target={target} error={err}");
                return text_response(
                    StatusCode::BAD_GATEWAY,
                    format!("upstream fetch failed: {err}"),
                );
            }
        };

        let status = upstream.status();
        log::info!(
            "request finished: target={target} status={status} duration={:?}",
            started.elapsed()
        );

        let mut builder = Response::builder().status(status);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in upstream.headers() {
                headers.append(name.clone(), value.clone());
            }
        }

        let log_target = target.to_string();
        let stream = upstream.bytes_stream().map_ok(Frame::data).map_err(move |err| {
            // Status and headers are already committed; nothing to retract.
            log::error!("failed to copy response body: target={log_target} error={err}");
            Box::new(err) as BoxError
        });

        match builder.body(StreamBody::new(stream).boxed_unsync()) {
            Ok(response) => response,
            Err(err) => {
                log::error!("failed to assemble response: target={target} error={err}");
                text_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("failed to assemble response: {err}"),
                )
            }
        }
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_response_shape() {
        let response = text_response(StatusCode::FORBIDDEN, "request denied");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
