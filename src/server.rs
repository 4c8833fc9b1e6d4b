//! Scrape endpoint: a thin adapter rendering the metric store in the
//! Prometheus text exposition format.
//!
//! The server owns a dedicated OS thread running a current-thread tokio
//! runtime, so the polling loop stays free of async plumbing.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tracing::{error, info};

use crate::store::MetricStore;

/// Handle to the background serving thread.
///
/// There is no shutdown path: the exporter serves until the process is
/// killed. The handle only exists so the thread is visibly owned.
pub struct MetricsServer {
    addr: SocketAddr,
    _handle: thread::JoinHandle<()>,
}

impl MetricsServer {
    /// Binds `addr` and starts serving `GET /metrics` in the background.
    ///
    /// Binding happens synchronously, so a busy port is a startup error and
    /// a non-zero exit, not a silently dead scrape endpoint.
    pub fn start(store: Arc<MetricStore>, addr: SocketAddr) -> io::Result<Self> {
        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let handle = thread::Builder::new()
            .name("metrics-server".to_string())
            .spawn(move || runtime.block_on(serve(listener, store)))?;

        info!(%addr, "serving /metrics");
        Ok(MetricsServer {
            addr,
            _handle: handle,
        })
    }

    /// The bound address, with the real port when `addr` asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

async fn serve(listener: std::net::TcpListener, store: Arc<MetricStore>) {
    let listener = match tokio::net::TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, "failed to adopt the metrics listener");
            return;
        }
    };

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(error = %err, "metrics accept error");
                continue;
            }
        };

        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service =
                service_fn(move |request| handle_request(request, Arc::clone(&store)));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!(error = %err, "metrics connection error");
            }
        });
    }
}

async fn handle_request(
    request: Request<Incoming>,
    store: Arc<MetricStore>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let response = if request.method() == Method::GET && request.uri().path() == "/metrics" {
        match store.encode() {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body))),
            Err(err) => {
                error!(error = %err, "failed to encode metrics");
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::from_static(b"failed to encode metrics")))
            }
        }
    } else {
        Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from_static(b"not found")))
    };

    Ok(response.unwrap_or_else(|_| Response::new(Full::new(Bytes::from_static(b"bad response")))))
}
