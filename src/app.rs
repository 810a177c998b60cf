use std::net::SocketAddr;

use axum::{http::HeaderValue, routing::get, Json, Router};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::extractors::MaybeAuthUser;
use crate::error::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::{files, orders, users};

pub fn build_app(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::router())
        .merge(orders::router())
        .merge(files::router());

    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api)
        .fallback(not_found)
        .with_state(state.clone())
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Liveness; greets the caller when a valid token happens to be present.
async fn root(MaybeAuthUser(user): MaybeAuthUser) -> Json<ApiResponse<serde_json::Value>> {
    let mut data = json!({
        "service": "raciones",
        "version": env!("CARGO_PKG_VERSION"),
    });
    if let Some(user) = user {
        data["user"] = json!(user.email);
    }
    Json(ApiResponse::ok(data))
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
