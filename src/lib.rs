//! # a2a-runtime — an agent-to-agent task runtime
//!
//! A small runtime for exposing named "skills" behind a plain REST
//! surface: synchronous invocation, server-sent-event streaming, and a
//! server-tracked task lifecycle (create/get/list/cancel/subscribe) for
//! work that outlives a single request.
//!
//! ## Overview
//!
//! - [`schema`] — compiles and validates JSON-Schema-like input/output
//!   descriptors for a skill.
//! - [`skill`] — the [`skill::Skill`] / [`skill::SkillRegistry`] types, plus
//!   the [`skill::InvokeHandler`]/[`skill::StreamHandler`]/[`skill::Emitter`]
//!   traits a skill author implements.
//! - [`agent_core`] — [`agent_core::AgentCore`] dispatches one invocation of
//!   one skill: lookup, schema validation, handler call.
//! - [`types`] — wire types: tasks, agent cards, SSE envelopes.
//! - [`error`] — the closed [`error::RuntimeError`] taxonomy shared by
//!   server and client.
//! - [`builders`] — [`builders::AgentCardBuilder`], [`builders::AgentBuilder`],
//!   and (with the `client` feature) [`builders::ClientBuilder`].
//! - [`server`] (feature `server`) — [`server::task_manager::TaskManager`],
//!   [`server::task_store::TaskStore`], the SSE engine, and the axum router.
//! - [`client`] (feature `client`) — [`client::AgentClient`], an HTTP client
//!   for the same route table the server exposes.
//!
//! ## Feature flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `client` | yes     | HTTP client for calling agents (reqwest + SSE) |
//! | `server` | yes     | axum router, task manager, SSE engine |
//! | `full`   | no      | Enable all features |
//!
//! ## Quick start: server
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use serde_json::Value;
//! use a2a_runtime::builders::{AgentBuilder, AgentConfig};
//! use a2a_runtime::skill::{HandlerCtx, InvokeHandler, Outcome, Skill, SkillRegistry};
//! use a2a_runtime::error::RuntimeResult;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl InvokeHandler for Echo {
//!     async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
//!         Ok(Outcome::new(input))
//!     }
//! }
//!
//! # async fn run() -> RuntimeResult<()> {
//! let mut registry = SkillRegistry::new();
//! registry.add(Skill::invoke("echo", Arc::new(Echo)))?;
//!
//! let agent = AgentBuilder::new(registry, AgentConfig::new("echo-agent", "0.1.0", "http://localhost:8080"))
//!     .build();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//! axum::serve(listener, agent.router).await.unwrap();
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick start: client
//!
//! ```no_run
//! # async fn run() -> a2a_runtime::error::RuntimeResult<()> {
//! use a2a_runtime::client::{AgentClient, ClientConfig};
//!
//! let client = AgentClient::connect(ClientConfig::new("http://localhost:8080")).await?;
//! let response = client.invoke("echo", serde_json::json!({"text": "hi"})).await?;
//! println!("{:?}", response.output);
//! # Ok(())
//! # }
//! ```

pub mod agent_core;
pub mod builders;
pub mod error;
pub mod schema;
pub mod skill;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

/// Re-exports of the most commonly used types and traits.
///
/// ```
/// use a2a_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent_core::AgentCore;
    pub use crate::error::{RuntimeError, RuntimeResult};
    pub use crate::schema::Schema;
    pub use crate::skill::{
        Chunk, Emitter, HandlerCtx, InvokeHandler, Outcome, Skill, SkillHandlers, SkillRegistry,
        StreamHandler,
    };
    pub use crate::types::{
        AgentCapabilities, AgentCard, CreateTaskRequest, CreateTaskResponse, SkillSummary, Task,
        TaskMessage, TaskState,
    };

    pub use crate::builders::AgentCardBuilder;

    #[cfg(feature = "client")]
    pub use crate::builders::ClientBuilder;

    #[cfg(feature = "client")]
    pub use crate::client::AgentClient;

    #[cfg(feature = "server")]
    pub use crate::builders::{AgentBuilder, AgentConfig};

    #[cfg(feature = "server")]
    pub use crate::server::http::agent_router;
    #[cfg(feature = "server")]
    pub use crate::server::task_manager::{TaskManager, TaskManagerConfig};
    #[cfg(feature = "server")]
    pub use crate::server::task_store::{InMemoryTaskStore, SharedTaskStore, TaskStore};
}

pub use error::{RuntimeError, RuntimeResult};
pub use types::*;
