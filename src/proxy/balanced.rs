// ────────────────────────────────
// src/proxy/balanced.rs
// Outbound middleware: point each request at the next balanced endpoint.
// ────────────────────────────────

use crate::load_balancer::{BalancerError, Endpoint, LoadBalancer};
use crate::resolver::BoxError;
use hyper::http::uri::{Authority, PathAndQuery, Scheme};
use hyper::{Request, Uri};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("No endpoint available: {0}")]
    NoHosts(#[from] BalancerError),

    #[error("Cannot target endpoint {endpoint}: {source}")]
    InvalidUri {
        endpoint: Endpoint,
        #[source]
        source: hyper::http::Error,
    },
}

/// Wraps a client service so every request goes to `balancer.next()`.
#[derive(Clone)]
pub struct BalancedLayer {
    balancer: Arc<dyn LoadBalancer>,
}

impl BalancedLayer {
    pub fn new(balancer: Arc<dyn LoadBalancer>) -> Self {
        Self { balancer }
    }
}

impl<S> Layer<S> for BalancedLayer {
    type Service = BalancedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BalancedService {
            inner,
            balancer: self.balancer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BalancedService<S> {
    inner: S,
    balancer: Arc<dyn LoadBalancer>,
}

impl<S> BalancedService<S> {
    pub fn new(inner: S, balancer: Arc<dyn LoadBalancer>) -> Self {
        Self { inner, balancer }
    }
}

impl<S, B> Service<Request<B>> for BalancedService<S>
where
    S: Service<Request<B>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let endpoint = match self.balancer.next() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                let err: BoxError = Box::new(ProxyError::from(e));
                return Box::pin(async move { Err(err) });
            }
        };

        match with_authority(req.uri(), &endpoint) {
            Ok(uri) => *req.uri_mut() = uri,
            Err(source) => {
                let err: BoxError = Box::new(ProxyError::InvalidUri { endpoint, source });
                return Box::pin(async move { Err(err) });
            }
        }
        tracing::debug!("Selected endpoint {} for {}", endpoint, req.uri());

        let fut = self.inner.call(req);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

/// Rewrites the authority of `uri`, defaulting to `http` and `/` when the
/// request had no scheme or path.
pub fn with_authority(uri: &Uri, endpoint: &Endpoint) -> Result<Uri, hyper::http::Error> {
    let mut parts = uri.clone().into_parts();
    parts.authority = Some(Authority::try_from(endpoint.to_string().as_str())?);
    if parts.scheme.is_none() {
        parts.scheme = Some(Scheme::HTTP);
    }
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    Ok(Uri::from_parts(parts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    struct Listed(Vec<Endpoint>, AtomicUsize);

    impl LoadBalancer for Listed {
        fn next(&self) -> Result<Endpoint, BalancerError> {
            if self.0.is_empty() {
                return Err(BalancerError::NoHosts);
            }
            let i = self.1.fetch_add(1, Ordering::Relaxed) % self.0.len();
            Ok(self.0[i])
        }

        fn close(&self) {}

        fn name(&self) -> &'static str {
            "listed"
        }
    }

    fn listed(addrs: &[&str]) -> Arc<dyn LoadBalancer> {
        let endpoints = addrs
            .iter()
            .map(|a| a.parse::<std::net::SocketAddr>().unwrap().into())
            .collect();
        Arc::new(Listed(endpoints, AtomicUsize::new(0)))
    }

    #[tokio::test]
    async fn test_rewrites_authority_per_request() {
        let svc = ServiceBuilder::new()
            .layer(BalancedLayer::new(listed(&["10.0.0.1:8080", "10.0.0.2:8080"])))
            .service(service_fn(|req: Request<()>| async move {
                Ok::<_, Infallible>(req.uri().to_string())
            }));

        let req = Request::get("http://backend.internal/api/v1?x=1").body(()).unwrap();
        let first = svc.clone().oneshot(req).await.unwrap();
        let req = Request::get("http://backend.internal/api/v1?x=1").body(()).unwrap();
        let second = svc.oneshot(req).await.unwrap();

        assert_eq!(first, "http://10.0.0.1:8080/api/v1?x=1");
        assert_eq!(second, "http://10.0.0.2:8080/api/v1?x=1");
    }

    #[tokio::test]
    async fn test_no_hosts_skips_inner_service() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let inner = service_fn(move |_req: Request<()>| {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(()) }
        });
        let svc = BalancedService::new(inner, listed(&[]));

        let err = svc
            .oneshot(Request::get("http://backend.internal/").body(()).unwrap())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("No hosts available"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_with_authority_fills_scheme_and_path() {
        let endpoint: Endpoint = "[::1]:9000".parse::<std::net::SocketAddr>().unwrap().into();

        let uri = with_authority(&Uri::from_static("/health"), &endpoint).unwrap();
        assert_eq!(uri.to_string(), "http://[::1]:9000/health");

        let uri = with_authority(&Uri::from_static("https://svc.local"), &endpoint).unwrap();
        assert_eq!(uri.to_string(), "https://[::1]:9000/");
    }
}
