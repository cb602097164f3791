// This example serves the docs from target/doc/ below /doc/, and redirects / to the crate docs.
// Everything else falls through to a plain 404.
//
// Run `cargo doc && cargo run --example doc_server`, then
// point your browser to http://localhost:3000/
//
// Set `RUST_LOG=hyper_static_chain=trace` to see every decision.

use std::{convert::Infallible, net::SocketAddr};

use http::{header, Request, Response, StatusCode};
use http_body_util::Empty;
use hyper::{body::Bytes, body::Incoming, server::conn::http1};
use hyper_static_chain::{Static, StaticConfig, TokioFileOpener};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn fallback(req: Request<Incoming>) -> Result<Response<Empty<Bytes>>, Infallible> {
    let mut res = Response::new(Empty::new());
    if req.uri().path() == "/" {
        *res.status_mut() = StatusCode::MOVED_PERMANENTLY;
        res.headers_mut().insert(
            header::LOCATION,
            header::HeaderValue::from_static("/doc/hyper_static_chain/"),
        );
    } else {
        *res.status_mut() = StatusCode::NOT_FOUND;
    }
    Ok(res)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = StaticConfig {
        prefix: "/doc".to_owned(),
        cache_max_age: Some(60),
        ..StaticConfig::default()
    };
    let static_ = Static::from_config(TokioFileOpener::new("target/doc/"), config)?.next(fallback);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await?;
    info!("Doc server running on http://localhost:3000/");

    loop {
        let (stream, _) = listener.accept().await?;
        let static_ = static_.clone();
        tokio::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), static_)
                .await
            {
                error!(%err, "error serving connection");
            }
        });
    }
}
