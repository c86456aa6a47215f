pub mod handlers;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// All routes, nested under `/api`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/events", get(handlers::handle_events))
        .route("/names/find", post(handlers::handle_find))
        .route("/names/find/cancel", post(handlers::handle_cancel_find))
        .route("/names/advertise", post(handlers::handle_advertise))
        .route(
            "/names/advertise/cancel",
            post(handlers::handle_cancel_advertise),
        )
        .route("/links", post(handlers::handle_establish_link))
        .route("/links/{handle}", delete(handlers::handle_release_link))
        .route("/links/{handle}/interface", get(handlers::handle_interface))
        .route("/daemon/shutdown", post(handlers::handle_shutdown))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    axum::serve(listener, app).await?;
    Ok(())
}
