use axum::{Router, routing::get};
use http::header;
use splitledger::{
    InMemoryCache, InMemoryReceiptStore, InMemoryStorage, SplitService,
    api::{handlers::api_routes, openapi::ApiDoc},
    config::CONFIG,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&CONFIG.log_level)))
        .init();
    info!(config = ?*CONFIG, "starting splitledger");

    let service = Arc::new(SplitService::new(
        InMemoryStorage::new(),
        InMemoryCache::new(),
        InMemoryReceiptStore::new(),
        CONFIG.jwt_secret.clone(),
    ));

    let app = Router::new()
        .route("/", get(|| async { "OK" }))
        .nest("/api", api_routes(service))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new()) // Gzip compression
        .layer(TimeoutLayer::new(CONFIG.request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::PUT,
                    http::Method::PATCH,
                    http::Method::DELETE,
                ])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http()); // Request tracing

    let addr = SocketAddr::from(([127, 0, 0, 1], CONFIG.port));
    info!("Server running at http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
