//! Scenario 6: one agent's skill handler calls another agent over the
//! client, composing two independently-running agents. Both hops go
//! through the task surface, so each agent ends up with one recorded
//! task.

use std::sync::Arc;
use std::time::Duration;

use a2a_runtime::builders::{AgentBuilder, AgentConfig};
use a2a_runtime::client::{AgentClient, ClientConfig};
use a2a_runtime::error::RuntimeResult;
use a2a_runtime::skill::{HandlerCtx, InvokeHandler, Outcome, Skill, SkillRegistry};
use a2a_runtime::types::{CreateTaskRequest, TaskMessage};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct UpstreamEcho;

#[async_trait]
impl InvokeHandler for UpstreamEcho {
    async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or_default();
        Ok(Outcome::new(json!({ "text": format!("Echo: {text}") })))
    }
}

struct FacilitatorEcho {
    upstream: AgentClient,
}

#[async_trait]
impl InvokeHandler for FacilitatorEcho {
    async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
        let response = self
            .upstream
            .create_task(CreateTaskRequest {
                message: TaskMessage {
                    role: "user".to_string(),
                    content: json!({ "text": input.to_string() }),
                },
                skill_id: "echo".to_string(),
                context_id: None,
                metadata: None,
            })
            .await?;
        let task = self.upstream.wait_for_task(&response.task_id, 1_000).await?;
        let result = task
            .result
            .ok_or_else(|| a2a_runtime::error::RuntimeError::internal("upstream task had no result"))?;
        Ok(Outcome::new(result.output))
    }
}

async fn spawn_agent(router: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn facilitator_composes_two_agents() {
    let mut upstream_registry = SkillRegistry::new();
    upstream_registry
        .add(Skill::invoke("echo", Arc::new(UpstreamEcho)))
        .unwrap();
    let upstream_agent = AgentBuilder::new(
        upstream_registry,
        AgentConfig::new("upstream", "0.1.0", "http://127.0.0.1"),
    )
    .build();
    let upstream_manager = upstream_agent.manager.clone();
    let upstream_url = spawn_agent(upstream_agent.router).await;

    let upstream_client = AgentClient::new(ClientConfig::new(&upstream_url)).unwrap();

    let mut facilitator_registry = SkillRegistry::new();
    facilitator_registry
        .add(Skill::invoke(
            "echo",
            Arc::new(FacilitatorEcho { upstream: upstream_client }),
        ))
        .unwrap();
    let facilitator_agent = AgentBuilder::new(
        facilitator_registry,
        AgentConfig::new("facilitator", "0.1.0", "http://127.0.0.1"),
    )
    .build();
    let facilitator_manager = facilitator_agent.manager.clone();
    let facilitator_url = spawn_agent(facilitator_agent.router).await;

    let facilitator_client = AgentClient::new(ClientConfig::new(&facilitator_url)).unwrap();
    let created = facilitator_client
        .create_task(CreateTaskRequest {
            message: TaskMessage {
                role: "user".to_string(),
                content: json!({ "text": json!({ "text": "hello" }).to_string() }),
            },
            skill_id: "echo".to_string(),
            context_id: None,
            metadata: None,
        })
        .await
        .unwrap();
    let task = facilitator_client
        .wait_for_task(&created.task_id, 1_000)
        .await
        .unwrap();
    assert_eq!(task.status, a2a_runtime::types::TaskState::Completed);
    assert_eq!(task.result.unwrap().output["text"], "Echo: hello");

    // Give the upstream task's settle() a moment to land before listing.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let facilitator_tasks = facilitator_manager
        .list(&a2a_runtime::types::ListTasksQuery::default())
        .await
        .unwrap();
    assert_eq!(facilitator_tasks.total, 1);

    let upstream_tasks = upstream_manager
        .list(&a2a_runtime::types::ListTasksQuery::default())
        .await
        .unwrap();
    assert_eq!(upstream_tasks.total, 1);
}
