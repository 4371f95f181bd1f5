use std::net::SocketAddr;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::handlers::{
    health::health_check,
    metrics::metrics_handler,
    store::{
        clear_all, clear_namespace, clear_user, list_keys, reset_rate_limit, store_info,
        warm_cache,
    },
};
use crate::middleware::{LoggingLayer, RateLimitGuard, RequestIdLayer, rate_limit_guard};
use crate::rate_limit::EndpointClass;
use crate::state::AppState;

/// Operational routes, guarded by the admin rate-limit policy.
fn admin_store_router(state: &AppState) -> Router<AppState> {
    let guard = RateLimitGuard::new(state.limiter().clone(), EndpointClass::Admin);

    Router::new()
        .route("/admin/store/info", get(store_info))
        .route("/admin/store/keys/{pattern}", get(list_keys))
        .route("/admin/store/cache/all", delete(clear_all))
        .route("/admin/store/cache/user/{id}", delete(clear_user))
        .route("/admin/store/cache/warm", post(warm_cache))
        .route("/admin/store/cache/{namespace}", delete(clear_namespace))
        .route("/admin/store/rate-limit/{client}", delete(reset_rate_limit))
        .route_layer(middleware::from_fn_with_state(guard, rate_limit_guard))
}

/// Creates the router with the given application state and metrics handle.
pub fn create_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    // Router for metrics endpoint (different state)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    let app_router = Router::new()
        .route("/health", get(health_check))
        .merge(admin_store_router(&state))
        .with_state(state);

    Router::new()
        .merge(app_router)
        .merge(metrics_router)
        .layer(middleware::from_fn(
            crate::metrics::http::http_metrics_middleware,
        ))
        .layer(middleware_stack)
        .layer(CorsLayer::permissive())
}

/// Serves the router until SIGINT or SIGTERM. Peer addresses are exposed
/// to handlers through `ConnectInfo`.
pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
    prometheus_handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = create_router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received");
}
