//! HTTP server part of item-catalog

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use axum_server::Handle;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, task::JoinSet};
use tower_http::{
    cors::{self, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, span, warn, Level};

mod error;
mod export;
mod pages;
mod views;

use crate::{metrics::Metrics, session::session_middleware, state::AppState};

/// How long in-flight requests get to finish on shutdown.
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Config for the HTTP server
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpConfig {
    /// Port to bind to
    pub port: u16,
    /// Optionally set a custom bind address (will use 0.0.0.0 if unset)
    pub bind_addr: Option<IpAddr>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_addr: None,
        }
    }
}

/// The HTTP server part of item-catalog
pub struct HttpServer {
    tasks: JoinSet<std::io::Result<()>>,
    handle: Handle,
    http_addr: SocketAddr,
}

impl fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpServer")
            .field("http_addr", &self.http_addr)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl HttpServer {
    /// Spawn the server
    pub async fn spawn(config: HttpConfig, state: AppState) -> Result<HttpServer> {
        let app = create_app(state);
        let bind_addr = SocketAddr::new(
            config.bind_addr.unwrap_or(Ipv4Addr::UNSPECIFIED.into()),
            config.port,
        );
        let listener = TcpListener::bind(bind_addr).await?.into_std()?;
        let http_addr = listener.local_addr()?;
        let handle = Handle::new();
        let fut = axum_server::from_tcp(listener)
            .handle(handle.clone())
            .serve(app.into_make_service_with_connect_info::<SocketAddr>());
        info!("HTTP server listening on {http_addr}");
        let mut tasks = JoinSet::new();
        tasks.spawn(fut);
        Ok(HttpServer {
            tasks,
            handle,
            http_addr,
        })
    }

    /// Get the bound address of the HTTP socket.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Shutdown the server and wait for all tasks to complete.
    ///
    /// Open connections get [`GRACEFUL_SHUTDOWN_TIMEOUT`] to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
        self.run_until_done().await?;
        Ok(())
    }

    /// Wait for all tasks to complete.
    ///
    /// Runs forever unless tasks fail.
    pub async fn run_until_done(mut self) -> Result<()> {
        let mut final_res: anyhow::Result<()> = Ok(());
        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Err(err) if err.is_cancelled() => {}
                Ok(Err(err)) => {
                    warn!(?err, "task failed");
                    final_res = Err(anyhow::Error::from(err));
                }
                Err(err) => {
                    warn!(?err, "task panicked");
                    final_res = Err(err.into());
                }
            }
        }
        final_res
    }
}

pub(crate) fn create_app(state: AppState) -> Router {
    // the exports may be fetched by any site
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(cors::Any);

    // configure tracing middleware
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let src = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|conn_info| conn_info.0.to_string())
            .unwrap_or_default();
        span!(
            Level::DEBUG,
            "http_request",
            method = ?request.method(),
            uri = ?request.uri(),
            src = %src,
        )
    });

    // only the pages take part in sessions
    let page_routes = Router::new()
        .route("/", get(pages::latest_items))
        .route("/catalog/{category_name}/items/", get(pages::list_items))
        .route(
            "/catalog/{category_name}/{item_name}/",
            get(pages::show_item),
        )
        .route(
            "/item/new/",
            get(pages::create_item_form).post(pages::create_item),
        )
        .route(
            "/item/edit/{item_id}/",
            get(pages::edit_item_form).post(pages::edit_item),
        )
        .route(
            "/item/delete/{item_id}/",
            get(pages::delete_item_form).post(pages::delete_item),
        )
        .route_layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ));

    let export_routes = Router::new()
        .route("/catalog.json/", get(export::catalog_json))
        .route("/catalog.xml/", get(export::catalog_xml))
        .layer(cors);

    let metrics = state.metrics.clone();
    Router::new()
        .merge(page_routes)
        .merge(export_routes)
        .route("/healthcheck", get(|| async { "OK" }))
        .with_state(state)
        .layer(trace)
        .route_layer(middleware::from_fn_with_state(metrics, metrics_middleware))
}

/// Record request metrics.
async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> impl IntoResponse {
    let start = Instant::now();
    let response = next.run(req).await;
    let latency = start.elapsed().as_millis();
    let status = response.status();
    metrics.http_requests_duration_ms.inc_by(latency as u64);
    metrics.http_requests.inc();
    if status.is_success() || status.is_redirection() {
        metrics.http_requests_success.inc();
    } else {
        metrics.http_requests_error.inc();
    }
    response
}
