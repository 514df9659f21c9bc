//! Task manager — the core of the core.
//!
//! Owns the task table, allocates task ids, dispatches skill handlers
//! asynchronously, and applies the completion/failure latch that
//! prevents a handler racing cancellation from resurrecting a task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent_core::AgentCore;
use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{
    CreateTaskRequest, CreateTaskResponse, ListTasksQuery, ListTasksResponse, Task, TaskErrorInfo,
    TaskMessage, TaskResult, TaskState,
};

use super::task_store::SharedTaskStore;

/// Tuning knobs for the task manager's background behavior.
#[derive(Debug, Clone, Copy)]
pub struct TaskManagerConfig {
    /// Cadence at which `subscribe` polls for a status change.
    pub poll_interval: Duration,
    /// Absolute cap on a single `subscribe` connection's lifetime.
    pub subscribe_cap: Duration,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            subscribe_cap: Duration::from_secs(5 * 60),
        }
    }
}

/// Creates, tracks, cancels, and completes tasks.
///
/// Indexes tasks by id (via the [`SharedTaskStore`]) and dispatches each
/// task's handler on its own tokio task, tracked here only by its
/// cancellation handle — the task manager never holds the `JoinHandle`
/// and never force-aborts it; cancellation is strictly cooperative.
pub struct TaskManager {
    store: SharedTaskStore,
    core: Arc<AgentCore>,
    config: TaskManagerConfig,
    cancels: RwLock<HashMap<String, CancellationToken>>,
}

impl TaskManager {
    pub fn new(store: SharedTaskStore, core: Arc<AgentCore>, config: TaskManagerConfig) -> Self {
        Self {
            store,
            core,
            config,
            cancels: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> TaskManagerConfig {
        self.config
    }

    /// Allocates a task, schedules its handler, and returns immediately.
    pub async fn create(&self, req: CreateTaskRequest) -> RuntimeResult<CreateTaskResponse> {
        let skill = self
            .core
            .registry()
            .get(&req.skill_id)
            .ok_or_else(|| RuntimeError::SkillNotFound {
                key: req.skill_id.clone(),
            })?;

        if skill.handlers.invoke_handler().is_none() {
            return Err(RuntimeError::NotImplemented {
                message: format!("skill '{}' has no invoke handler", req.skill_id),
            });
        }

        let task_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let task = Task {
            task_id: task_id.clone(),
            skill_id: req.skill_id.clone(),
            context_id: req.context_id.clone(),
            status: TaskState::Running,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        };
        self.store.save(task).await?;

        let cancel = CancellationToken::new();
        self.cancels.write().await.insert(task_id.clone(), cancel.clone());

        let input = extract_input(&req.message);
        let core = self.core.clone();
        let store = self.store.clone();
        let skill_id = req.skill_id.clone();
        let run_id = task_id.clone();

        tokio::spawn(async move {
            let outcome = core
                .invoke(&skill_id, input, run_id.clone(), HashMap::new(), cancel.clone())
                .await;
            settle(&store, &run_id, outcome, cancel.is_cancelled()).await;
        });

        info!(task_id = %task_id, skill_id = %req.skill_id, "task created");
        Ok(CreateTaskResponse {
            task_id,
            status: TaskState::Running,
        })
    }

    pub async fn get(&self, task_id: &str) -> RuntimeResult<Task> {
        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound { id: task_id.to_string() })
    }

    pub async fn list(&self, query: &ListTasksQuery) -> RuntimeResult<ListTasksResponse> {
        let statuses = parse_status_filter(query.status.as_deref())?;
        let all = self.store.list_all().await?;

        let filtered: Vec<Task> = all
            .into_iter()
            .filter(|t| match &query.context_id {
                Some(ctx) => t.context_id.as_deref() == Some(ctx.as_str()),
                None => true,
            })
            .filter(|t| match &statuses {
                Some(s) => s.contains(&t.status),
                None => true,
            })
            .collect();

        let total = filtered.len();
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(50);
        let has_more = offset + limit < total;
        let page = filtered.into_iter().skip(offset).take(limit).collect();

        Ok(ListTasksResponse {
            tasks: page,
            total,
            has_more,
        })
    }

    /// Raises the cancellation signal and marks the task `cancelled`
    /// synchronously. The handler, if still running, observes the
    /// signal on its own schedule; any result it later produces is
    /// discarded by [`settle`].
    pub async fn cancel(&self, task_id: &str) -> RuntimeResult<Task> {
        let mut task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| RuntimeError::TaskNotFound { id: task_id.to_string() })?;

        if task.status.is_terminal() {
            return Err(RuntimeError::InvalidState {
                message: format!("task '{task_id}' is already {}", task.status),
            });
        }

        if let Some(token) = self.cancels.read().await.get(task_id) {
            token.cancel();
        }

        task.status = TaskState::Cancelled;
        task.updated_at = Utc::now();
        self.store.save(task.clone()).await?;

        info!(task_id = %task_id, "task cancelled");
        Ok(task)
    }
}

/// Applies the terminal state a handler settled with, unless the task
/// was already terminal (raced by cancellation), in which case the
/// outcome is discarded.
async fn settle(
    store: &SharedTaskStore,
    task_id: &str,
    outcome: RuntimeResult<crate::skill::Outcome>,
    was_cancelled: bool,
) {
    let Ok(Some(mut task)) = store.get(task_id).await else {
        warn!(task_id = %task_id, "task vanished before handler settled");
        return;
    };

    if task.status.is_terminal() {
        debug!(task_id = %task_id, status = %task.status, "discarding handler outcome: task already terminal");
        return;
    }

    match outcome {
        Ok(result) => {
            task.status = TaskState::Completed;
            task.result = Some(TaskResult {
                output: result.output,
                usage: result.usage,
                model: result.model,
            });
        }
        Err(err) if was_cancelled => {
            task.status = TaskState::Cancelled;
            let _ = err;
        }
        Err(err) => {
            task.status = TaskState::Failed;
            task.error = Some(TaskErrorInfo {
                code: err.code().to_string(),
                message: err.to_string(),
                details: err.details(),
            });
        }
    }
    task.updated_at = Utc::now();

    if let Err(e) = store.save(task).await {
        warn!(task_id = %task_id, error = %e, "failed to persist settled task");
    }
}

/// Bit-exact extraction of a skill's input from a task message.
///
/// 1. `content.text` present → parse as JSON, falling back to the raw
///    string on parse failure.
/// 2. Else `content.parts[0].text` present → used verbatim as a string.
/// 3. Else the whole `content` value, unchanged.
pub fn extract_input(message: &TaskMessage) -> Value {
    if let Some(text) = message.content.get("text").and_then(Value::as_str) {
        return serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
    }

    if let Some(text) = message
        .content
        .get("parts")
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str)
    {
        return Value::String(text.to_string());
    }

    message.content.clone()
}

fn parse_status_filter(raw: Option<&str>) -> RuntimeResult<Option<Vec<TaskState>>> {
    let Some(raw) = raw else { return Ok(None) };
    let mut states = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let state: TaskState = part.parse().map_err(|_| RuntimeError::InvalidRequest {
            message: format!("unknown status filter value: '{part}'"),
        })?;
        states.push(state);
    }
    Ok(Some(states))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeResult as R;
    use crate::server::task_store::InMemoryTaskStore;
    use crate::skill::{HandlerCtx, InvokeHandler, Outcome, Skill, SkillRegistry};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl InvokeHandler for Echo {
        async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> R<Outcome> {
            Ok(Outcome::new(input))
        }
    }

    struct Blocks;

    #[async_trait]
    impl InvokeHandler for Blocks {
        async fn invoke(&self, _input: Value, ctx: HandlerCtx) -> R<Outcome> {
            ctx.cancelled().await;
            Err(RuntimeError::InvalidState {
                message: "cancelled".into(),
            })
        }
    }

    fn manager_with(registry: SkillRegistry) -> TaskManager {
        let core = Arc::new(AgentCore::new(Arc::new(registry)));
        let store: SharedTaskStore = Arc::new(InMemoryTaskStore::new());
        TaskManager::new(store, core, TaskManagerConfig::default())
    }

    fn message_with_text(text: &str) -> TaskMessage {
        TaskMessage {
            role: "user".to_string(),
            content: json!({ "text": text }),
        }
    }

    #[test]
    fn extract_input_parses_json_text() {
        let msg = message_with_text(r#"{"a":1}"#);
        assert_eq!(extract_input(&msg), json!({"a": 1}));
    }

    #[test]
    fn extract_input_falls_back_to_raw_string() {
        let msg = message_with_text("not json");
        assert_eq!(extract_input(&msg), json!("not json"));
    }

    #[test]
    fn extract_input_uses_first_part_verbatim() {
        let msg = TaskMessage {
            role: "user".to_string(),
            content: json!({ "parts": [{"text": "hello"}] }),
        };
        assert_eq!(extract_input(&msg), json!("hello"));
    }

    #[test]
    fn extract_input_falls_back_to_raw_content() {
        let msg = TaskMessage {
            role: "user".to_string(),
            content: json!({ "other": 1 }),
        };
        assert_eq!(extract_input(&msg), json!({"other": 1}));
    }

    #[tokio::test]
    async fn create_then_get_reaches_completed() {
        let mut registry = SkillRegistry::new();
        registry.add(Skill::invoke("echo", Arc::new(Echo))).unwrap();
        let mgr = manager_with(registry);

        let resp = mgr
            .create(CreateTaskRequest {
                message: message_with_text(r#"{"x":1}"#),
                skill_id: "echo".into(),
                context_id: None,
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(resp.status, TaskState::Running);

        // Allow the spawned handler to run.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let task = mgr.get(&resp.task_id).await.unwrap();
        assert_eq!(task.status, TaskState::Completed);
        assert_eq!(task.result.unwrap().output, json!({"x": 1}));
    }

    #[tokio::test]
    async fn create_unknown_skill_is_skill_not_found() {
        let mgr = manager_with(SkillRegistry::new());
        let err = mgr
            .create(CreateTaskRequest {
                message: message_with_text("hi"),
                skill_id: "nope".into(),
                context_id: None,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "skill_not_found");
    }

    #[tokio::test]
    async fn get_unknown_task_is_task_not_found() {
        let mgr = manager_with(SkillRegistry::new());
        let err = mgr.get("nope").await.unwrap_err();
        assert_eq!(err.code(), "task_not_found");
    }

    #[tokio::test]
    async fn cancel_running_task_marks_cancelled_and_settle_is_discarded() {
        let mut registry = SkillRegistry::new();
        registry.add(Skill::invoke("blocks", Arc::new(Blocks))).unwrap();
        let mgr = manager_with(registry);

        let resp = mgr
            .create(CreateTaskRequest {
                message: message_with_text("hi"),
                skill_id: "blocks".into(),
                context_id: None,
                metadata: None,
            })
            .await
            .unwrap();

        let cancelled = mgr.cancel(&resp.task_id).await.unwrap();
        assert_eq!(cancelled.status, TaskState::Cancelled);

        // Give the spawned handler a chance to observe cancellation and settle.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let task = mgr.get(&resp.task_id).await.unwrap();
        assert_eq!(task.status, TaskState::Cancelled);
    }

    #[tokio::test]
    async fn cancel_on_terminal_task_is_invalid_state() {
        let mut registry = SkillRegistry::new();
        registry.add(Skill::invoke("echo", Arc::new(Echo))).unwrap();
        let mgr = manager_with(registry);

        let resp = mgr
            .create(CreateTaskRequest {
                message: message_with_text("1"),
                skill_id: "echo".into(),
                context_id: None,
                metadata: None,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = mgr.cancel(&resp.task_id).await.unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[tokio::test]
    async fn list_filters_by_context_and_status_and_paginates() {
        let mut registry = SkillRegistry::new();
        registry.add(Skill::invoke("echo", Arc::new(Echo))).unwrap();
        let mgr = manager_with(registry);

        for i in 0..3 {
            mgr.create(CreateTaskRequest {
                message: message_with_text(&i.to_string()),
                skill_id: "echo".into(),
                context_id: Some("ctx-a".into()),
                metadata: None,
            })
            .await
            .unwrap();
        }
        mgr.create(CreateTaskRequest {
            message: message_with_text("x"),
            skill_id: "echo".into(),
            context_id: Some("ctx-b".into()),
            metadata: None,
        })
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        let page = mgr
            .list(&ListTasksQuery {
                context_id: Some("ctx-a".into()),
                status: Some("completed".into()),
                limit: Some(2),
                offset: Some(0),
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.tasks.len(), 2);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn list_rejects_unknown_status_filter() {
        let mgr = manager_with(SkillRegistry::new());
        let err = mgr
            .list(&ListTasksQuery {
                status: Some("bogus".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }
}
