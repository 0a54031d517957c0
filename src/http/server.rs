//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the relay handler
//! - Wire up middleware (tracing)
//! - Serve on the bounded public listener
//! - Resolve each request's namespace and hand it to the relay engine
//! - Convert relay failures into 5xx responses for that request only

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ProxyConfig;
use crate::namespace::NamespaceRegistry;
use crate::net::BoundedListener;
use crate::observability::metrics;
use crate::relay::RelayEngine;
use crate::routing::Router as NamespaceRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NamespaceRegistry>,
    pub router: NamespaceRouter,
    pub engine: RelayEngine,
}

/// Public HTTP server for the namespace proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server relaying into `registry`'s endpoints.
    pub fn new(config: &ProxyConfig, registry: Arc<NamespaceRegistry>) -> Self {
        let state = AppState {
            registry,
            router: NamespaceRouter::default(),
            engine: RelayEngine::from_config(config),
        };

        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving on a custom listener.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Only returns if serving fails; there is no graceful drain.
    pub async fn run(self, listener: BoundedListener) -> Result<(), std::io::Error> {
        use axum::serve::Listener;

        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service()).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Resolves the namespace, relays to its backend, and streams the answer back.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let candidate = state.router.route(&request);
    let endpoint = state.registry.resolve(&candidate);

    let span = tracing::info_span!(
        "relay",
        relay_id = %Uuid::new_v4(),
        method = %request.method(),
        uri = %request.uri(),
        namespace = %endpoint.namespace(),
    );

    async {
        tracing::info!(requested = %candidate, "Relaying request");

        match state.engine.relay(endpoint, request).await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(status = %status, "Backend responded");
                metrics::record_request(endpoint.namespace(), status.as_u16(), start_time);
                response
            }
            Err(e) => {
                tracing::error!(error = %e, "Relay failed");
                if e.is_dial() {
                    metrics::record_dial_failure(endpoint.namespace());
                }
                let status = e.status();
                metrics::record_request(endpoint.namespace(), status.as_u16(), start_time);
                (status, "Upstream request failed").into_response()
            }
        }
    }
    .instrument(span)
    .await
}
