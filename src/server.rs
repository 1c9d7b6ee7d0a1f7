//! Inbound HTTP server: one task per connection.

use std::convert::Infallible;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::executor::Executor;

/// Accept connections on `listener` and route every request through the
/// executor. Runs until the listener fails.
///
/// Dropping a connection drops its service future, which abandons any
/// in-flight upstream fetch or body copy for that request.
pub async fn serve(listener: TcpListener, executor: Arc<Executor>) -> std::io::Result<()> {
    loop {
        let (stream, remote) = listener.accept().await?;
        let executor = executor.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let executor = executor.clone();
                async move { Ok::<_, Infallible>(executor.handle(request, remote).await) }
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                log::debug!("connection error: remote={remote} error={err}");
            }
        });
    }
}
