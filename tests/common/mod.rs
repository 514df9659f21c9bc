//! Shared fixtures for integration tests: an agent exposing `echo` (sync
//! + streaming) and `slow` (a cancellable long-running invoke).

use std::sync::Arc;
use std::time::Duration;

use a2a_runtime::agent_core::AgentCore;
use a2a_runtime::builders::{AgentBuilder, AgentConfig};
use a2a_runtime::error::RuntimeResult;
use a2a_runtime::schema::Schema;
use a2a_runtime::server::task_manager::{TaskManager, TaskManagerConfig};
use a2a_runtime::skill::{Chunk, Emitter, HandlerCtx, InvokeHandler, Outcome, Skill, SkillRegistry, StreamHandler};
use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};

pub struct EchoInvoke;

#[async_trait]
impl InvokeHandler for EchoInvoke {
    async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(Outcome::new(json!({ "text": format!("Echo: {text}") })))
    }
}

pub struct EchoStream;

#[async_trait]
impl StreamHandler for EchoStream {
    async fn stream(&self, input: Value, emitter: Arc<dyn Emitter>, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
        emitter.send(Chunk::Text(text.clone())).await?;
        Ok(Outcome::new(json!({ "text": text })))
    }
}

/// Sleeps ~1s, observing cancellation at 10ms granularity.
pub struct SlowInvoke;

#[async_trait]
impl InvokeHandler for SlowInvoke {
    async fn invoke(&self, input: Value, ctx: HandlerCtx) -> RuntimeResult<Outcome> {
        for _ in 0..100 {
            if ctx.is_cancelled() {
                return Err(a2a_runtime::error::RuntimeError::internal("cancelled"));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(Outcome::new(input))
    }
}

pub struct TestAgent {
    pub router: Router,
    pub core: Arc<AgentCore>,
    pub manager: Arc<TaskManager>,
}

pub fn build_test_agent() -> TestAgent {
    let mut registry = SkillRegistry::new();
    registry
        .add(
            Skill::both("echo", Arc::new(EchoInvoke), Arc::new(EchoStream)).with_input_schema(
                Schema::compile(json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }))
                .unwrap(),
            ),
        )
        .unwrap();
    registry.add(Skill::invoke("slow", Arc::new(SlowInvoke))).unwrap();

    let config = AgentConfig::new("test-agent", "0.1.0", "http://localhost:8080")
        .with_task_manager(TaskManagerConfig {
            poll_interval: Duration::from_millis(10),
            subscribe_cap: Duration::from_secs(300),
        });
    let agent = AgentBuilder::new(registry, config).build();

    TestAgent {
        router: agent.router,
        core: agent.core,
        manager: agent.manager,
    }
}
