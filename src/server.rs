//! Development server with live reload.
//!
//! Serves static files from one or more roots (first root wins, later roots
//! are fallbacks) and notifies connected clients over Server-Sent Events on
//! `/__events`. Reload signals come from outside, typically the watch loop;
//! the server itself only broadcasts.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Notification sent to SSE clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    /// Staged output changed, reload the page
    Changed,
    /// Server is shutting down, close the connection
    Shutdown,
}

/// Error while running the server
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Failed to bind the listen address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// Server IO error
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
    /// No serve root was given
    #[error("At least one serve root is required")]
    NoRoots,
}

/// Shared state for request handlers.
#[derive(Clone)]
struct ServerState {
    reload_tx: broadcast::Sender<ReloadSignal>,
}

/// Static file server with SSE live reload.
pub struct DevServer {
    /// Serve roots in priority order
    roots: Vec<PathBuf>,
    /// Port to bind
    port: u16,
    /// Broadcast sender for reload signals
    reload_tx: broadcast::Sender<ReloadSignal>,
}

impl DevServer {
    /// Create a server over the given roots.
    pub fn new(roots: Vec<PathBuf>, port: u16) -> Self {
        let (reload_tx, _) = broadcast::channel(100);
        Self { roots, port, reload_tx }
    }

    /// A sender the watch loop uses to trigger client reloads.
    pub fn reload_handle(&self) -> broadcast::Sender<ReloadSignal> {
        self.reload_tx.clone()
    }

    /// Port the server will bind.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run until the shutdown signal resolves.
    pub async fn serve(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let state = ServerState { reload_tx: self.reload_tx.clone() };

        let routes = Router::new().route("/__events", get(sse_handler));
        let routes = match self.roots.as_slice() {
            [] => return Err(ServerError::NoRoots),
            [primary] => routes.fallback_service(ServeDir::new(primary)),
            [primary, fallback, ..] => routes
                .fallback_service(ServeDir::new(primary).fallback(ServeDir::new(fallback))),
        };
        let app = routes.layer(TraceLayer::new_for_http()).with_state(state);

        tracing::info!("Server starting on http://{}", addr);
        println!("Serving at http://{}", addr);
        for root in &self.roots {
            println!("  root: {}", root.display());
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        let reload_tx = self.reload_tx;
        let wrapped_shutdown = async move {
            shutdown_signal.await;
            // Close SSE connections before the listener goes away
            let _ = reload_tx.send(ReloadSignal::Shutdown);
            tokio::time::sleep(Duration::from_millis(100)).await;
        };

        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(wrapped_shutdown)
            .await
            .map_err(ServerError::Serve)
    }
}

/// SSE endpoint handler.
async fn sse_handler(
    State(state): State<ServerState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.reload_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(ReloadSignal::Changed) => Some(Ok(Event::default().event("reload").data("reload"))),
        Ok(ReloadSignal::Shutdown) => None,
        // Lagged behind, reload anyway
        Err(_) => Some(Ok(Event::default().event("reload").data("reload"))),
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
