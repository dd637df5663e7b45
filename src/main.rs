// src/main.rs
use anyhow::{Context, Result};
use dns_balancer::{
    config,
    create_load_balancer,
    metrics::MetricsRegistry,
    BalancerOptions, LoadBalancer,
};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dns_balancer=debug".parse()?)
                .add_directive("hickory_proto=warn".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);

    let options = BalancerOptions {
        lookup: None,
        refresh: config.refresh,
        metrics: Some(metrics_registry.collector()),
    };
    let balancer = create_load_balancer(&config.target, options)
        .await
        .with_context(|| format!("Failed to resolve {}", config.target.display_name()))?;

    if config.metrics.enabled {
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry.clone(), config.metrics.path.clone())?;
    }

    info!(
        "Balancing ({}) across {} endpoints for {}",
        balancer.name(),
        balancer.endpoints().len(),
        balancer.target()
    );

    // Log one selection per refresh interval until asked to stop.
    let mut ticker = tokio::time::interval(config.refresh.interval());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => match balancer.next() {
                Ok(endpoint) => info!("Next endpoint: {}", endpoint),
                Err(e) => warn!("No endpoint available: {}", e),
            },
        }
    }

    balancer.shutdown().await;
    info!("Balancer for {} closed", balancer.target());
    Ok(())
}

fn start_metrics_server(
    addr: SocketAddr,
    registry: Arc<MetricsRegistry>,
    path: String,
) -> Result<()> {
    let metrics_path = Arc::new(path);
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move { Ok::<_, Infallible>(metrics_response(&req, &registry, &path)) }
            }))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind metrics server on {}", addr))?
        .serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

fn metrics_response(req: &Request<Body>, registry: &MetricsRegistry, path: &str) -> Response<Body> {
    let (status, body) = if req.uri().path() != path {
        (StatusCode::NOT_FOUND, Body::from("Not Found"))
    } else {
        match registry.gather() {
            Ok(metrics) => (StatusCode::OK, Body::from(metrics)),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Body::from("Failed to encode metrics"))
            }
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    if status == StatusCode::OK {
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("text/plain; version=0.0.4"),
        );
    }
    response
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
