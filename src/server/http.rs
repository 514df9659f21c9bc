//! HTTP Handlers — thin translators from requests to core operations.
//!
//! Every handler here does parsing/extraction only; all actual logic
//! lives in [`AgentCore`] and [`TaskManager`]. Errors returned by either
//! flow straight through axum's `IntoResponse` impl on [`RuntimeError`].

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::HeaderMap;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agent_core::AgentCore;
use crate::error::RuntimeError;
use crate::types::{
    AgentCard, CreateTaskRequest, EntrypointsResponse, HealthResponse, InvokeResponse,
    ListTasksQuery, SkillSummary,
};

use super::sse::{skill_stream, task_subscribe_stream, SSE_KEEP_ALIVE};
use super::task_manager::TaskManager;

struct AppState {
    core: Arc<AgentCore>,
    manager: Arc<TaskManager>,
    card: AgentCard,
}

/// A `Json<T>` extractor whose rejection is a `RuntimeError::InvalidRequest`
/// instead of axum's plain-text `JsonRejection`, so malformed request
/// bodies surface as `{error:{code:"invalid_request"}}` like every other
/// client-facing error.
struct ValidJson<T>(T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RuntimeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(RuntimeError::InvalidRequest {
                message: rejection.body_text(),
            }),
        }
    }
}

/// The full route table: discovery, synchronous/streaming entrypoints,
/// and task lifecycle + subscription.
pub fn agent_router(core: Arc<AgentCore>, manager: Arc<TaskManager>, card: AgentCard) -> Router {
    let state = Arc::new(AppState { core, manager, card });

    Router::new()
        .route("/health", get(health))
        .route("/.well-known/agent-card.json", get(agent_card))
        .route("/entrypoints", get(entrypoints))
        .route("/entrypoints/{key}/invoke", post(invoke))
        .route("/entrypoints/{key}/stream", post(stream))
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/{taskId}", get(get_task))
        .route("/tasks/{taskId}/cancel", post(cancel_task))
        .route("/tasks/{taskId}/subscribe", get(subscribe_task))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn agent_card(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.card.clone())
}

async fn entrypoints(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let items = state
        .core
        .registry()
        .list()
        .iter()
        .map(|skill| SkillSummary {
            id: skill.key.clone(),
            description: skill.description.clone(),
            input_schema: skill.input_schema.as_ref().map(|s| s.to_portable()),
            output_schema: skill.output_schema.as_ref().map(|s| s.to_portable()),
            input_modes: skill.input_modes.clone(),
            output_modes: skill.output_modes.clone(),
            streaming: skill.streaming(),
        })
        .collect();
    Json(EntrypointsResponse { items })
}

#[derive(Debug, Deserialize)]
struct InvokeBody {
    input: Value,
}

async fn invoke(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    ValidJson(body): ValidJson<InvokeBody>,
) -> Result<impl IntoResponse, RuntimeError> {
    let run_id = Uuid::new_v4().to_string();
    let outcome = state
        .core
        .invoke(
            &key,
            body.input,
            run_id.clone(),
            headers_to_map(&headers),
            CancellationToken::new(),
        )
        .await?;

    Ok(Json(InvokeResponse {
        run_id,
        status: "completed",
        output: outcome.output,
        usage: outcome.usage,
        model: outcome.model,
    }))
}

async fn stream(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    ValidJson(body): ValidJson<InvokeBody>,
) -> Result<impl IntoResponse, RuntimeError> {
    let skill = state
        .core
        .registry()
        .get(&key)
        .ok_or_else(|| RuntimeError::SkillNotFound { key: key.clone() })?;
    if skill.handlers.stream_handler().is_none() {
        return Err(RuntimeError::StreamNotSupported { key });
    }

    let run_id = Uuid::new_v4().to_string();
    let events = skill_stream(
        state.core.clone(),
        key,
        body.input,
        run_id,
        headers_to_map(&headers),
        CancellationToken::new(),
    );
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE)))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, RuntimeError> {
    let response = state.manager.create(req).await?;
    Ok(Json(response))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<impl IntoResponse, RuntimeError> {
    let response = state.manager.list(&query).await?;
    Ok(Json(response))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, RuntimeError> {
    let task = state.manager.get(&task_id).await?;
    Ok(Json(task))
}

async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, RuntimeError> {
    let task = state.manager.cancel(&task_id).await?;
    Ok(Json(task))
}

async fn subscribe_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, RuntimeError> {
    // Ensures the task exists before opening the stream, so a bad id
    // surfaces as a plain 404 rather than an SSE error event.
    state.manager.get(&task_id).await?;
    let events = task_subscribe_stream(state.manager.clone(), task_id);
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE)))
}

fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use crate::skill::{HandlerCtx, InvokeHandler, Outcome, Skill, SkillRegistry};
    use crate::server::task_store::InMemoryTaskStore;
    use crate::server::task_manager::TaskManagerConfig;
    use crate::types::{AgentCapabilities};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl InvokeHandler for Echo {
        async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> crate::error::RuntimeResult<Outcome> {
            Ok(Outcome::new(input))
        }
    }

    fn test_router() -> Router {
        let mut registry = SkillRegistry::new();
        registry
            .add(
                Skill::invoke("echo", Arc::new(Echo)).with_input_schema(
                    Schema::compile(json!({"type": "object"})).unwrap(),
                ),
            )
            .unwrap();
        let core = Arc::new(AgentCore::new(Arc::new(registry)));
        let store = Arc::new(InMemoryTaskStore::new());
        let manager = Arc::new(TaskManager::new(store, core.clone(), TaskManagerConfig::default()));
        let card = AgentCard {
            name: "test-agent".into(),
            version: "0.1.0".into(),
            description: None,
            url: "http://localhost".into(),
            skills: vec![],
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["application/json".into()],
            default_output_modes: vec!["application/json".into()],
            extensions: HashMap::new(),
        };
        agent_router(core, manager, card)
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = test_router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn invoke_unknown_skill_is_404() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/entrypoints/nope/invoke")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"input": {}}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn create_task_then_get_round_trips() {
        let router = test_router();
        let create_response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "message": {"role": "user", "content": {"text": "1"}},
                            "skillId": "echo",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(create_response.status(), 200);
    }

    #[tokio::test]
    async fn get_unknown_task_is_404() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/tasks/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn stream_unknown_skill_is_404_not_sse() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/entrypoints/nope/stream")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"input": {}}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.contains("application/json"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "skill_not_found");
    }

    #[tokio::test]
    async fn stream_non_streaming_skill_is_400_stream_not_supported() {
        // `echo` in `test_router` is invoke-only, so its stream entrypoint
        // must reject before ever committing to an SSE response.
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/entrypoints/echo/stream")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"input": {}}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "stream_not_supported");
    }

    #[tokio::test]
    async fn malformed_json_body_is_400_invalid_request() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/entrypoints/echo/invoke")
                    .header("content-type", "application/json")
                    .body(Body::from("{not valid json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn malformed_json_body_on_create_task_is_400_invalid_request() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/tasks")
                    .header("content-type", "application/json")
                    .body(Body::from("{not valid json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["code"], "invalid_request");
    }
}
