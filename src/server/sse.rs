//! SSE Engine — framing for task subscriptions and skill streams.
//!
//! Two distinct producers share the same wire framing
//! (`axum::response::sse::Event`, built via `async_stream::stream!`):
//! task-status subscription (polling) and skill-stream invocation
//! (direct event forwarding from the handler's [`Emitter`]).

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::response::sse::Event;
use chrono::Utc;
use futures::stream::Stream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent_core::AgentCore;
use crate::error::{RuntimeError, RuntimeResult};
use crate::skill::{Chunk, Emitter};
use crate::types::{StreamEnvelope, StreamEnvelopeKind, TaskState, TaskStatusEnvelope};

use super::task_manager::TaskManager;

/// Polls a task's status at `poll_interval` and yields one SSE event per
/// observed state, closing on the first terminal state, on the absolute
/// `cap`, or when the task vanishes.
pub fn task_subscribe_stream(
    manager: Arc<TaskManager>,
    task_id: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let config = manager.config();
    async_stream::stream! {
        let deadline = Instant::now() + config.subscribe_cap;
        let mut last_status: Option<TaskState> = None;

        loop {
            let task = match manager.get(&task_id).await {
                Ok(task) => task,
                Err(_) => {
                    yield Ok(sse_json("error", &serde_json::json!({
                        "error": { "code": "task_not_found", "message": task_id }
                    })));
                    break;
                }
            };

            if last_status != Some(task.status) {
                last_status = Some(task.status);
                let envelope = TaskStatusEnvelope::from(&task);
                let event_name = match task.status {
                    TaskState::Running => "statusUpdate",
                    TaskState::Completed => "resultUpdate",
                    TaskState::Cancelled => "statusUpdate",
                    TaskState::Failed => "error",
                };
                yield Ok(sse_json(event_name, &envelope));
            }

            if task.status.is_terminal() {
                break;
            }

            if Instant::now() >= deadline {
                warn!(task_id = %task_id, "subscribe connection hit the absolute cap");
                break;
            }

            tokio::time::sleep(config.poll_interval).await;
        }
    }
}

/// Forwards a streaming skill handler's chunks as SSE envelopes:
/// `run-start`, any number of `delta`/`text` chunks, then `run-end`
/// (or `error` + `run-end` on failure).
pub fn skill_stream(
    core: Arc<AgentCore>,
    key: String,
    input: Value,
    run_id: String,
    headers: HashMap<String, String>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let mut sequence: u64 = 0;
        yield Ok(envelope_event(&run_id, sequence, StreamEnvelopeKind::RunStart, Map::new()));
        sequence += 1;

        let (tx, mut rx) = mpsc::unbounded_channel::<Chunk>();
        let emitter: Arc<dyn Emitter> = Arc::new(ChannelEmitter { tx });

        let invocation = tokio::spawn({
            let core = core.clone();
            let run_id = run_id.clone();
            async move { core.stream(&key, input, emitter, run_id, headers, cancel).await }
        });

        while let Some(chunk) = rx.recv().await {
            yield Ok(chunk_envelope_event(&run_id, sequence, chunk));
            sequence += 1;
        }

        match invocation.await {
            Ok(Ok(outcome)) => {
                let mut fields = Map::new();
                fields.insert("status".to_string(), Value::String("completed".to_string()));
                fields.insert("output".to_string(), outcome.output);
                if let Some(usage) = outcome.usage {
                    fields.insert("usage".to_string(), usage);
                }
                if let Some(model) = outcome.model {
                    fields.insert("model".to_string(), Value::String(model));
                }
                yield Ok(envelope_event(&run_id, sequence, StreamEnvelopeKind::RunEnd, fields));
            }
            Ok(Err(err)) => {
                yield Ok(error_envelope_event(&run_id, sequence, &err));
                sequence += 1;
                let mut fields = Map::new();
                fields.insert("status".to_string(), Value::String("failed".to_string()));
                yield Ok(envelope_event(&run_id, sequence, StreamEnvelopeKind::RunEnd, fields));
            }
            Err(join_err) => {
                let err = RuntimeError::internal(format!("handler task panicked: {join_err}"));
                yield Ok(error_envelope_event(&run_id, sequence, &err));
                sequence += 1;
                let mut fields = Map::new();
                fields.insert("status".to_string(), Value::String("failed".to_string()));
                yield Ok(envelope_event(&run_id, sequence, StreamEnvelopeKind::RunEnd, fields));
            }
        }
    }
}

struct ChannelEmitter {
    tx: mpsc::UnboundedSender<Chunk>,
}

#[async_trait]
impl Emitter for ChannelEmitter {
    async fn send(&self, chunk: Chunk) -> RuntimeResult<()> {
        self.tx
            .send(chunk)
            .map_err(|_| RuntimeError::internal("stream receiver dropped"))
    }
}

fn chunk_envelope_event(run_id: &str, sequence: u64, chunk: Chunk) -> Event {
    let (kind, fields) = match chunk {
        Chunk::Delta(value) => {
            let mut fields = Map::new();
            fields.insert("delta".to_string(), value);
            (StreamEnvelopeKind::Delta, fields)
        }
        Chunk::Text(text) => {
            let mut fields = Map::new();
            fields.insert("text".to_string(), Value::String(text));
            (StreamEnvelopeKind::Text, fields)
        }
    };
    envelope_event(run_id, sequence, kind, fields)
}

fn error_envelope_event(run_id: &str, sequence: u64, err: &RuntimeError) -> Event {
    let mut fields = Map::new();
    fields.insert(
        "error".to_string(),
        serde_json::json!({ "code": err.code(), "message": err.to_string(), "details": err.details() }),
    );
    envelope_event(run_id, sequence, StreamEnvelopeKind::Error, fields)
}

fn envelope_event(run_id: &str, sequence: u64, kind: StreamEnvelopeKind, fields: Map<String, Value>) -> Event {
    let envelope = StreamEnvelope {
        run_id: run_id.to_string(),
        sequence,
        created_at: Utc::now(),
        kind,
        fields,
    };
    sse_json(envelope_kind_str(kind), &envelope)
}

fn envelope_kind_str(kind: StreamEnvelopeKind) -> &'static str {
    match kind {
        StreamEnvelopeKind::RunStart => "run-start",
        StreamEnvelopeKind::Delta => "delta",
        StreamEnvelopeKind::Text => "text",
        StreamEnvelopeKind::Error => "error",
        StreamEnvelopeKind::RunEnd => "run-end",
    }
}

fn sse_json(event: &'static str, payload: &impl serde::Serialize) -> Event {
    match serde_json::to_string(payload) {
        Ok(json) => Event::default().event(event).data(json),
        Err(e) => Event::default().event("error").data(format!("{{\"error\":\"{e}\"}}")),
    }
}

/// A no-op heartbeat interval suitable for `Sse::keep_alive`, kept as a
/// single named constant so the HTTP layer and tests agree on it.
pub const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);
