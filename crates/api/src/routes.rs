use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tradenexus_core::autoblog::{AutoBlogTrigger, ForcedRunRejected, PublishedPost, Publisher, TriggerStatus};
use tradenexus_core::domain::post::BlogPost;
use tradenexus_core::domain::session::{AccessGate, LoginState};
use tradenexus_core::domain::settings::{validate_frequency_hours, AutoBlogSettings};
use tradenexus_core::storage::Store;

use crate::session::{Sessions, SESSION_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub publisher: Publisher,
    pub trigger: Arc<AutoBlogTrigger>,
    pub gate: AccessGate,
    pub sessions: Sessions,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/posts", get(list_posts))
        .route("/posts/:id", get(get_post))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/admin/posts", get(list_posts_admin))
        .route("/admin/posts/:id", delete(delete_post))
        .route("/admin/generate", post(generate_post))
        .route("/admin/settings", get(get_settings))
        .route("/admin/settings/toggle", post(toggle_auto_blog))
        .route("/admin/settings/topics", post(add_topic))
        .route("/admin/settings/frequency", put(set_frequency))
        .route("/admin/autoblog/trigger", post(trigger_auto_blog))
        .route("/admin/autoblog/status", get(auto_blog_status))
        .with_state(state)
}

/// JSON `{ "message": ... }` error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    }

    /// Operator-initiated work failed: report a status line, keep details in logs.
    fn operator_failure(err: anyhow::Error, message: &str) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "{message}");
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "message": self.message })),
        )
            .into_response()
    }
}

/// Proof that the request carries an admin session.
pub struct AdminSession;

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).unwrap_or_default();
        match state.sessions.get(token).await {
            LoginState::Admin => Ok(AdminSession),
            LoginState::User { .. } => Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "Admin access required",
            )),
            LoginState::LoggedOut => Err(ApiError::new(StatusCode::UNAUTHORIZED, "Please sign in")),
        }
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, ApiError> {
    let posts = state.store.list_posts().await.map_err(ApiError::internal)?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    state
        .store
        .get_post(&id)
        .await
        .map_err(ApiError::internal)?
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Post not found"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    access_code: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    session: LoginState,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state
        .gate
        .sign_in(&req.username, &req.password, &req.access_code)
        .map_err(|e| ApiError::new(StatusCode::UNAUTHORIZED, e.to_string()))?;

    let token = state.sessions.create(session.clone()).await;
    tracing::info!(admin = session.is_admin(), "signed in");
    Ok(Json(LoginResponse { token, session }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = session_token(&headers) {
        state.sessions.remove(token).await;
    }
    StatusCode::NO_CONTENT
}

async fn list_posts_admin(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    list_posts(State(state)).await
}

async fn delete_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_post(&id).await.map_err(ApiError::internal)?;
    tracing::info!(post_id = %id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct TopicRequest {
    topic: String,
}

async fn generate_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(req): Json<TopicRequest>,
) -> Result<(StatusCode, Json<BlogPost>), ApiError> {
    if req.topic.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Topic is required"));
    }

    match state.publisher.publish_manual(&req.topic).await {
        Ok(post) => Ok((StatusCode::CREATED, Json(post))),
        Err(err) => Err(ApiError::operator_failure(
            err,
            "Error generating blog. Check API Key.",
        )),
    }
}

async fn get_settings(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<AutoBlogSettings>, ApiError> {
    let settings = state.store.get_settings().await.map_err(ApiError::internal)?;
    Ok(Json(settings))
}

async fn toggle_auto_blog(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<AutoBlogSettings>, ApiError> {
    let settings = state
        .store
        .modify_settings(|s| {
            *s = s.toggled();
            Ok(())
        })
        .await
        .map_err(ApiError::internal)?;
    tracing::info!(enabled = settings.is_enabled, "auto blog toggled");
    Ok(Json(settings))
}

async fn add_topic(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(req): Json<TopicRequest>,
) -> Result<Json<AutoBlogSettings>, ApiError> {
    if req.topic.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Topic is required"));
    }

    let settings = state
        .store
        .modify_settings(|s| s.add_topic(&req.topic).map(|_| ()))
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrequencyRequest {
    frequency_hours: f64,
}

async fn set_frequency(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(req): Json<FrequencyRequest>,
) -> Result<Json<AutoBlogSettings>, ApiError> {
    validate_frequency_hours(req.frequency_hours)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let settings = state
        .store
        .modify_settings(|s| s.set_frequency_hours(req.frequency_hours))
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(settings))
}

#[derive(Debug, Serialize)]
struct TriggerResponse {
    message: String,
    published: PublishedPost,
}

async fn trigger_auto_blog(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse>, ApiError> {
    match state.trigger.trigger_now().await {
        Ok(published) => Ok(Json(TriggerResponse {
            message: format!("Auto-Blog \"{}\" Published!", published.title),
            published,
        })),
        Err(err) => match err.downcast_ref::<ForcedRunRejected>() {
            Some(rejected) => Err(ApiError::new(StatusCode::CONFLICT, rejected.to_string())),
            None => Err(ApiError::operator_failure(err, "Auto-Blog Failed.")),
        },
    }
}

async fn auto_blog_status(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Json<TriggerStatus> {
    Json(state.trigger.status())
}
