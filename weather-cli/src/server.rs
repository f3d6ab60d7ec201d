//! HTTP surface for the browser client.
//!
//! Routes live under `/api/weather`. When the built client bundle exists it is
//! served as static files, with unknown paths falling back to `index.html`.

use std::{convert::Infallible, path::Path};

use anyhow::Context;
use axum::{
    Form, Json, Router,
    extract::{FromRequest, Path as UrlPath, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use weather_core::{City, Config, RequestHandler, WeatherError, WeatherReport};

/// Maps core errors to a status code and `{ "error": ... }` body.
#[derive(Debug)]
pub struct ApiError(WeatherError);

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WeatherError::BadRequest(_) => StatusCode::BAD_REQUEST,
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub city: Option<String>,
}

/// Search body from either JSON or a url-encoded form.
///
/// Never rejects: an absent, empty or undecodable body yields no city, which
/// the handler reports as a bad request.
impl<S> FromRequest<S> for SearchRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));

        let parsed = if is_form {
            Form::<SearchRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| e.body_text())
        } else {
            Json::<SearchRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| e.body_text())
        };

        match parsed {
            Ok(body) => Ok(body),
            Err(reason) => {
                tracing::debug!(%reason, "Unreadable search body");
                Ok(Self::default())
            }
        }
    }
}

/// POST /api/weather
async fn search(
    State(handler): State<RequestHandler>,
    body: SearchRequest,
) -> Result<Json<WeatherReport>, ApiError> {
    let report = handler.search(body.city.as_deref()).await?;
    Ok(Json(report))
}

/// GET /api/weather/history
async fn list_history(State(handler): State<RequestHandler>) -> Json<Vec<City>> {
    Json(handler.list_history().await)
}

/// DELETE /api/weather/history/{id}
async fn delete_history(
    State(handler): State<RequestHandler>,
    UrlPath(id): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    handler.delete_history(&id).await?;
    Ok(Json(json!({ "message": format!("City with ID {id} deleted from history") })))
}

pub fn build_router(handler: RequestHandler, client_dir: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/", post(search))
        .route("/history", get(list_history))
        .route("/history/{id}", delete(delete_history));

    let mut router = Router::new()
        .nest("/api/weather", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(handler);

    if client_dir.exists() {
        let index = client_dir.join("index.html");
        router = router.fallback_service(ServeDir::new(client_dir).fallback(ServeFile::new(index)));
        tracing::info!(path = %client_dir.display(), "Serving browser client");
    }

    router
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &Config, addr: Option<String>) -> anyhow::Result<()> {
    let handler = RequestHandler::from_config(config)?;
    let addr = addr.unwrap_or_else(|| config.listen_addr());

    let router = build_router(handler, &config.client_dir());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "Server running");
    println!("Server running on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
