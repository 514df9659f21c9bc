//! Echo Agent — a minimal task runtime server that echoes messages back.
//!
//! Run with:
//! ```sh
//! cargo run -p a2a-runtime --example echo_agent --features server
//! ```
//!
//! Then test with curl:
//! ```sh
//! curl http://localhost:3000/.well-known/agent-card.json | jq
//!
//! curl -X POST http://localhost:3000/tasks \
//!   -H "Content-Type: application/json" \
//!   -d '{"message": {"role": "user", "content": {"text": "hello"}}, "skillId": "echo"}'
//! ```

use std::sync::Arc;

use a2a_runtime::prelude::*;
use async_trait::async_trait;
use serde_json::{json, Value};

struct EchoInvoke;

#[async_trait]
impl InvokeHandler for EchoInvoke {
    async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(Outcome::new(json!({ "text": format!("Echo: {text}") })))
    }
}

struct EchoStream;

#[async_trait]
impl StreamHandler for EchoStream {
    async fn stream(
        &self,
        input: Value,
        emitter: Arc<dyn Emitter>,
        _ctx: HandlerCtx,
    ) -> RuntimeResult<Outcome> {
        let text = input.get("text").and_then(Value::as_str).unwrap_or("").to_string();
        for word in text.split_whitespace() {
            emitter.send(Chunk::Text(word.to_string())).await?;
        }
        Ok(Outcome::new(json!({ "text": format!("Echo: {text}") })))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let input_schema = Schema::compile(json!({
        "type": "object",
        "properties": { "text": { "type": "string" } },
        "required": ["text"],
    }))
    .expect("echo input schema is valid");

    let mut registry = SkillRegistry::new();
    registry.add(
        Skill::both("echo", Arc::new(EchoInvoke), Arc::new(EchoStream))
            .with_description("Echoes back any text message you send")
            .with_input_schema(input_schema),
    )?;

    let config = AgentConfig::new("Echo Agent", "0.1.0", "http://localhost:3000")
        .with_description("A simple agent that echoes messages back");
    let agent = AgentBuilder::new(registry, config).with_cors(true).build();

    let addr = "0.0.0.0:3000";
    println!("Echo Agent listening on http://{addr}");
    println!("  Agent card: http://{addr}/.well-known/agent-card.json");
    println!("  Tasks:      http://{addr}/tasks");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, agent.router).await?;

    Ok(())
}
