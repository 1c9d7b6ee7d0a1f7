//! mirrorgate-fetch: minimal fetch-by-query-parameter utility.
//!
//! A single catch-all handler downloads whatever `?url=` points at and
//! streams it back with an attachment disposition. Shares no rule engine
//! or policy logic with the gateway.

use std::convert::Infallible;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::Parser;
use futures_util::TryStreamExt;
use http::header::{HeaderValue, CONTENT_DISPOSITION, HOST};
use http::{Response, StatusCode};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use url::Url;

use mirrorgate::forward::{text_response, BoxError, ProxyBody};

#[derive(Parser)]
#[command(name = "mirrorgate-fetch")]
#[command(about = "Fetch a URL given as a query parameter", long_about = None)]
struct Cli {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    address: String,
}

async fn handle(
    request: Request<Incoming>,
    client: Arc<reqwest::Client>,
    id: u64,
) -> Response<ProxyBody> {
    let raw_url = request.uri().query().and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned())
    });
    let raw_url = match raw_url {
        Some(raw_url) if !raw_url.is_empty() => raw_url,
        _ => return text_response(StatusCode::BAD_REQUEST, "url is required"),
    };
    log::info!("[{id}] target: {raw_url}");

    let parsed = match Url::parse(&raw_url) {
        Ok(parsed) => parsed,
        Err(err) => {
            return text_response(StatusCode::BAD_REQUEST, format!("Invalid URL: {err}"));
        }
    };

    let (parts, body) = request.into_parts();
    let mut headers = parts.headers;
    // Let the client derive Host from the target.
    headers.remove(HOST);

    let outbound = client
        .request(parts.method, parsed.clone())
        .headers(headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .build();
    let outbound = match outbound {
        Ok(outbound) => outbound,
        Err(err) => {
            return text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create request: {err}"),
            );
        }
    };

    let upstream = match client.execute(outbound).await {
        Ok(upstream) => upstream,
        Err(err) => {
            return text_response(
                StatusCode::BAD_GATEWAY,
                format!("Upstream fetch failed: {err}"),
            );
        }
    };

    let status = upstream.status();
    let length = upstream.content_length();

    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in upstream.headers() {
            headers.append(name.clone(), value.clone());
        }
        let filename = parsed
            .path_segments()
            .and_then(|segments| segments.last())
            .unwrap_or_default();
        if let Ok(value) =
            HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        {
            headers.insert(CONTENT_DISPOSITION, value);
        }
    }

    let stream = upstream.bytes_stream().map_ok(Frame::data).map_err(move |err| {
        log::error!("[{id}] failed to copy response body: {err}");
        Box::new(err) as BoxError
    });

    match builder.body(StreamBody::new(stream).boxed_unsync()) {
        Ok(response) => {
            log::info!("[{id}] size: {}", length.map_or(-1, |len| len as i64));
            response
        }
        Err(err) => text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to assemble response: {err}"),
        ),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let client = Arc::new(reqwest::Client::new());
    let counter = Arc::new(AtomicU64::new(0));

    let listener = match TcpListener::bind(&cli.address).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind {}: {err}", cli.address);
            process::exit(1);
        }
    };
    log::info!("listening on {}", cli.address);

    loop {
        let (stream, _remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                log::error!("accept failed: {err}");
                process::exit(1);
            }
        };
        let client = client.clone();
        let counter = counter.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let client = client.clone();
                let id = counter.fetch_add(1, Ordering::Relaxed);
                async move { Ok::<_, Infallible>(handle(request, client, id).await) }
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::debug!("connection error: {err}");
            }
        });
    }
}
