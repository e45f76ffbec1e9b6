//! Route table and handlers.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{
        Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::page::render_close_page;
use crate::error::{IntegrationError, IntegrationResult};
use crate::models::IntegrationItem;
use crate::oauth::CallbackParams;
use crate::providers::ProviderId;

/// Form body identifying the caller.
#[derive(Debug, Deserialize)]
pub struct UserForm {
    pub user_id: Option<String>,
    pub org_id: Option<String>,
}

impl UserForm {
    fn into_parts(self) -> IntegrationResult<(String, String)> {
        let user_id = self.user_id.filter(|s| !s.is_empty());
        let org_id = self.org_id.filter(|s| !s.is_empty());
        match (user_id, org_id) {
            (Some(user_id), Some(org_id)) => Ok((user_id, org_id)),
            (None, _) => Err(IntegrationError::invalid_request("user_id is required")),
            (_, None) => Err(IntegrationError::invalid_request("org_id is required")),
        }
    }
}

/// Form body carrying a credential blob.
#[derive(Debug, Deserialize)]
pub struct LoadForm {
    pub credentials: Option<String>,
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.allowed_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/", get(ping))
        .route("/health", get(health_check))
        .route("/integrations/{provider}/authorize", post(authorize))
        .route(
            "/integrations/{provider}/oauth2callback",
            get(oauth2callback),
        )
        .route("/integrations/{provider}/credentials", post(credentials))
        .route("/integrations/{provider}/load", post(load))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ping() -> impl IntoResponse {
    Json(serde_json::json!({ "Ping": "Pong" }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let providers: Vec<&str> = state
        .registry
        .providers()
        .into_iter()
        .map(ProviderId::as_str)
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "service": "integration-broker",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": state.cache_backend,
        "providers": providers
    }))
}

/// `POST /integrations/{provider}/authorize`
async fn authorize(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Form(form): Form<UserForm>,
) -> IntegrationResult<Json<String>> {
    let flow = state.registry.get(&provider)?;
    let (user_id, org_id) = form.into_parts()?;
    let url = flow.begin_authorization(&user_id, &org_id).await?;
    Ok(Json(url))
}

/// `GET /integrations/{provider}/oauth2callback`
async fn oauth2callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> IntegrationResult<Html<String>> {
    let flow = state.registry.get(&provider)?;
    flow.complete_authorization(params).await?;
    Ok(Html(render_close_page(flow.provider().as_str())))
}

/// `POST /integrations/{provider}/credentials`
async fn credentials(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Form(form): Form<UserForm>,
) -> IntegrationResult<Json<serde_json::Value>> {
    let flow = state.registry.get(&provider)?;
    let (user_id, org_id) = form.into_parts()?;
    Ok(Json(flow.take_credentials(&user_id, &org_id).await?))
}

/// `POST /integrations/{provider}/load`
async fn load(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Form(form): Form<LoadForm>,
) -> IntegrationResult<Json<Vec<IntegrationItem>>> {
    let flow = state.registry.get(&provider)?;
    let credentials = form
        .credentials
        .ok_or_else(|| IntegrationError::invalid_request("missing credentials"))?;
    Ok(Json(flow.fetch_items(&credentials).await?))
}

impl IntoResponse for IntegrationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        } else {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({ "detail": self.to_user_message() }));
        (status, body).into_response()
    }
}
