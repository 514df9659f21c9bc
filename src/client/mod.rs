//! Agent client — drives a remote agent's task and entrypoint surface.
//!
//! Plain REST over a configured base URL: card fetch, skill lookup,
//! task create/get/list/cancel, subscribe, and the synchronous/streaming
//! entrypoint calls.

mod sse;
mod transport;

pub use sse::{SseMessage, SseStream};
pub use transport::{ClientConfig, HttpTransport};

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::time::sleep;

use crate::error::{RuntimeError, RuntimeResult};
use crate::types::{
    AgentCard, CreateTaskRequest, CreateTaskResponse, EntrypointsResponse, InvokeResponse,
    ListTasksQuery, ListTasksResponse, Task, TaskState,
};

/// Default budget for [`AgentClient::wait_for_task`].
pub const DEFAULT_WAIT_MS: u64 = 30_000;
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A client bound to one remote agent's base URL.
pub struct AgentClient {
    transport: HttpTransport,
    card: Option<AgentCard>,
}

impl AgentClient {
    /// Construct a client without fetching the card yet. Use
    /// [`AgentClient::fetch_card`] before [`AgentClient::skill`] lookups
    /// that rely on it.
    pub fn new(config: ClientConfig) -> RuntimeResult<Self> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
            card: None,
        })
    }

    /// Construct a client and eagerly fetch the agent card.
    pub async fn connect(config: ClientConfig) -> RuntimeResult<Self> {
        let mut client = Self::new(config)?;
        client.fetch_card().await?;
        Ok(client)
    }

    /// GET `/.well-known/agent-card.json`. Fails with
    /// `card_fetch_failed` on any non-2xx or decode error.
    pub async fn fetch_card(&mut self) -> RuntimeResult<&AgentCard> {
        let card: AgentCard = self
            .transport
            .get("/.well-known/agent-card.json")
            .await
            .map_err(|e| RuntimeError::CardFetchFailed(e.to_string()))?;
        self.card = Some(card);
        Ok(self.card.as_ref().expect("just set"))
    }

    pub fn card(&self) -> Option<&AgentCard> {
        self.card.as_ref()
    }

    /// Look up a skill by id in the already-fetched card.
    pub fn skill(&self, key: &str) -> RuntimeResult<&crate::types::SkillSummary> {
        let card = self
            .card
            .as_ref()
            .ok_or_else(|| RuntimeError::CardFetchFailed("agent card not fetched".to_string()))?;
        card.skills
            .iter()
            .find(|s| s.id == key)
            .ok_or_else(|| RuntimeError::SkillNotFound { key: key.to_string() })
    }

    pub async fn entrypoints(&self) -> RuntimeResult<EntrypointsResponse> {
        self.transport.get("/entrypoints").await
    }

    /// `POST /entrypoints/{key}/invoke`.
    pub async fn invoke(&self, key: &str, input: Value) -> RuntimeResult<InvokeResponse> {
        self.transport
            .post(&format!("/entrypoints/{key}/invoke"), &serde_json::json!({ "input": input }))
            .await
    }

    /// `POST /entrypoints/{key}/stream`. Returns the raw SSE message
    /// stream; callers decode each `data:` payload against the
    /// `{runId, sequence, createdAt, kind, ...}` envelope shape.
    pub async fn stream(&self, key: &str, input: Value) -> RuntimeResult<SseStream> {
        let response = self
            .transport
            .post_sse(&format!("/entrypoints/{key}/stream"), &serde_json::json!({ "input": input }))
            .await?;
        Ok(SseStream::from_response(response))
    }

    /// `POST /tasks`.
    pub async fn create_task(&self, request: CreateTaskRequest) -> RuntimeResult<CreateTaskResponse> {
        self.transport.post("/tasks", &request).await
    }

    /// `GET /tasks/{taskId}`.
    pub async fn get_task(&self, task_id: &str) -> RuntimeResult<Task> {
        self.transport.get(&format!("/tasks/{task_id}")).await
    }

    /// `GET /tasks`.
    pub async fn list_tasks(&self, query: &ListTasksQuery) -> RuntimeResult<ListTasksResponse> {
        let qs = build_query_string(query);
        self.transport.get(&format!("/tasks{qs}")).await
    }

    /// `POST /tasks/{taskId}/cancel`.
    pub async fn cancel_task(&self, task_id: &str) -> RuntimeResult<Task> {
        self.transport.post_empty(&format!("/tasks/{task_id}/cancel")).await
    }

    /// `GET /tasks/{taskId}/subscribe`. Returns the raw SSE message
    /// stream of `{taskId, status, result?, error?}` envelopes.
    pub async fn subscribe(&self, task_id: &str) -> RuntimeResult<SseStream> {
        let response = self.transport.get_sse(&format!("/tasks/{task_id}/subscribe")).await?;
        Ok(SseStream::from_response(response))
    }

    /// Polls `get_task` at 100 ms until the task reaches a terminal
    /// state or `max_wait_ms` elapses.
    pub async fn wait_for_task(&self, task_id: &str, max_wait_ms: u64) -> RuntimeResult<Task> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(max_wait_ms);
        loop {
            let task = self.get_task(task_id).await?;
            if task.status != TaskState::Running {
                return Ok(task);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RuntimeError::Timeout(format!(
                    "task '{task_id}' did not reach a terminal state within {max_wait_ms}ms"
                )));
            }
            sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Consumes a subscribe stream into the final terminal [`Task`]
    /// snapshot, decoding each envelope's `status` field as it arrives.
    pub async fn consume_subscription(&self, mut stream: SseStream) -> RuntimeResult<Task> {
        while let Some(message) = stream.next().await {
            let message = message?;
            let envelope: Value = serde_json::from_str(&message.data)
                .map_err(|e| RuntimeError::ParseError { message: e.to_string() })?;
            if let Some(status) = envelope.get("status").and_then(Value::as_str) {
                if status != "running" {
                    let task_id = envelope
                        .get("taskId")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    return self.get_task(&task_id).await;
                }
            }
        }
        Err(RuntimeError::internal("subscription closed without a terminal event"))
    }
}

fn build_query_string(query: &ListTasksQuery) -> String {
    let mut parts = Vec::new();
    if let Some(ctx) = &query.context_id {
        parts.push(format!("contextId={}", urlencode(ctx)));
    }
    if let Some(status) = &query.status {
        parts.push(format!("status={}", urlencode(status)));
    }
    if let Some(limit) = query.limit {
        parts.push(format!("limit={limit}"));
    }
    if let Some(offset) = query.offset {
        parts.push(format!("offset={offset}"));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("?{}", parts.join("&"))
    }
}

fn urlencode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_query_string_empty_for_default_query() {
        assert_eq!(build_query_string(&ListTasksQuery::default()), "");
    }

    #[test]
    fn build_query_string_includes_all_set_fields() {
        let query = ListTasksQuery {
            context_id: Some("ctx a".to_string()),
            status: Some("running,completed".to_string()),
            limit: Some(10),
            offset: Some(5),
        };
        let qs = build_query_string(&query);
        assert!(qs.starts_with('?'));
        assert!(qs.contains("contextId=ctx%20a"));
        assert!(qs.contains("status=running%2Ccompleted"));
        assert!(qs.contains("limit=10"));
        assert!(qs.contains("offset=5"));
    }
}
