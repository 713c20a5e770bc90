//! HTTP server setup and configuration.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tower_http::catch_panic::{CatchPanicLayer, ResponseForPanic};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::{handlers, stats};
use crate::config::{Config, ConfigError};
use crate::error::Error;
use crate::screen::{screen_from_config, ContentScreen};
use crate::storage;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<Config>,
    pub screen: Arc<dyn ContentScreen>,
}

impl AppState {
    /// Build state with the content screen described by `config`.
    pub fn new(db: SqlitePool, config: Config) -> Result<Self, ConfigError> {
        let screen = screen_from_config(&config.contact)?;
        Ok(Self {
            db,
            config: Arc::new(config),
            screen,
        })
    }
}

/// Create the axum router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.config.server.assets_dir);

    Router::new()
        .route("/", get(handlers::webapp))
        .route("/version.txt", get(handlers::version))
        .route("/api/stats", get(stats::stats_handler))
        .route(
            "/api/contact",
            post(handlers::contact).layer(DefaultBodyLimit::max(handlers::MAX_CONTACT_BODY_BYTES)),
        )
        .route("/api/health", get(handlers::health))
        .nest_service("/assets", assets)
        // Client-side routes of the single-page app
        .fallback(handlers::webapp)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Turns a handler panic into a 500, an error-log row and a shutdown request.
#[derive(Clone)]
struct PanicReporter {
    pool: SqlitePool,
    panics: mpsc::UnboundedSender<String>,
}

impl ResponseForPanic for PanicReporter {
    type ResponseBody = axum::body::Body;

    fn response_for_panic(&mut self, err: Box<dyn Any + Send + 'static>) -> Response {
        let message = panic_message(err.as_ref());
        storage::spawn_error_write(&self.pool, format!("Handler panicked: {}", message));
        let _ = self.panics.send(message);
        Error::Internal("Internal Server Error".to_string()).into_response()
    }
}

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run the HTTP server until Ctrl-C or a handler panic.
///
/// A panic stops the server gracefully and is returned as an error so the
/// process exits non-zero.
pub async fn run_server(config: Config, pool: SqlitePool) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();
    let state = AppState::new(pool.clone(), config)?;

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting folio server");

    serve(listener, create_router(state), pool).await
}

/// Serve `app` on `listener` with panic reporting until shutdown.
async fn serve(listener: TcpListener, app: Router, pool: SqlitePool) -> anyhow::Result<()> {
    let (panic_tx, mut panic_rx) = mpsc::unbounded_channel::<String>();
    let (fatal_tx, mut fatal_rx) = oneshot::channel::<String>();

    let app = app.layer(CatchPanicLayer::custom(PanicReporter {
        pool,
        panics: panic_tx,
    }));

    let shutdown = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down");
            }
            Some(message) = panic_rx.recv() => {
                tracing::error!(panic = %message, "Handler panicked, shutting down");
                let _ = fatal_tx.send(message);
            }
        }
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    if let Ok(message) = fatal_rx.try_recv() {
        anyhow::bail!("Server stopped after handler panic: {}", message);
    }

    Ok(())
}
