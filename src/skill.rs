//! Skill Registry — named capabilities an agent exposes.
//!
//! A [`Skill`] pairs a unique `key` with optional input/output schemas
//! and one or two handlers (invoke, stream). The [`SkillRegistry`] keeps
//! skills in insertion order so that `list()` and the agent card's
//! `skills[]` array are deterministic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, RuntimeResult};
use crate::schema::Schema;

/// A single chunk emitted by a streaming skill handler.
///
/// Handlers push opaque envelope fragments; the SSE engine is
/// responsible for enriching each with `sequence`, `runId`, and
/// `createdAt` before it reaches the wire (see [`crate::server::sse`]).
#[derive(Debug, Clone)]
pub enum Chunk {
    /// A generic incremental fragment, e.g. `{"text": "..."}`.
    Delta(Value),
    /// A complete text fragment (used by text-generation-shaped skills).
    Text(String),
}

/// The outcome of a skill invocation (synchronous or the final value of
/// a stream).
#[derive(Debug, Clone)]
pub struct Outcome {
    pub output: Value,
    pub usage: Option<Value>,
    pub model: Option<String>,
}

impl Outcome {
    pub fn new(output: Value) -> Self {
        Self {
            output,
            usage: None,
            model: None,
        }
    }
}

/// A narrow capability handle passed to every skill invocation.
///
/// This deliberately does not expose the task manager, the registry, or
/// any other runtime-wide state — only what a handler legitimately
/// needs: its own input, a way to observe cancellation, and the
/// incoming headers. Handlers that need to call out to another agent do
/// so with their own `AgentClient`, constructed by the embedding
/// program and threaded in however it sees fit (e.g. captured in a
/// closure), never reached through this context.
#[derive(Debug, Clone)]
pub struct HandlerCtx {
    pub skill_key: String,
    pub run_id: String,
    pub headers: HashMap<String, String>,
    cancel: CancellationToken,
}

impl HandlerCtx {
    pub fn new(skill_key: impl Into<String>, run_id: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            skill_key: skill_key.into(),
            run_id: run_id.into(),
            headers: HashMap::new(),
            cancel,
        }
    }

    /// True once the task manager has raised this run's cancellation
    /// signal. Handlers MUST check this at every I/O boundary.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation is signalled — suitable for use in a
    /// `tokio::select!` alongside the handler's own I/O.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// An emitter handed to streaming handlers.
///
/// `send` returns once the chunk has been accepted by the SSE engine;
/// the stream closes implicitly when the handler returns, matching the
/// "duck-typed callback → explicit Emitter capability" redesign.
#[async_trait]
pub trait Emitter: Send + Sync {
    async fn send(&self, chunk: Chunk) -> RuntimeResult<()>;
}

/// Synchronous skill invocation.
#[async_trait]
pub trait InvokeHandler: Send + Sync {
    async fn invoke(&self, input: Value, ctx: HandlerCtx) -> RuntimeResult<Outcome>;
}

/// Streaming skill invocation.
#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn stream(
        &self,
        input: Value,
        emitter: Arc<dyn Emitter>,
        ctx: HandlerCtx,
    ) -> RuntimeResult<Outcome>;
}

/// The handler(s) a skill carries.
///
/// Mirrors the "tagged variants: invoke-only, stream-only, both" design
/// note — polymorphism is data, not inheritance.
pub enum SkillHandlers {
    InvokeOnly(Arc<dyn InvokeHandler>),
    StreamOnly(Arc<dyn StreamHandler>),
    Both(Arc<dyn InvokeHandler>, Arc<dyn StreamHandler>),
}

impl SkillHandlers {
    pub fn invoke_handler(&self) -> Option<&Arc<dyn InvokeHandler>> {
        match self {
            Self::InvokeOnly(h) | Self::Both(h, _) => Some(h),
            Self::StreamOnly(_) => None,
        }
    }

    pub fn stream_handler(&self) -> Option<&Arc<dyn StreamHandler>> {
        match self {
            Self::StreamOnly(h) | Self::Both(_, h) => Some(h),
            Self::InvokeOnly(_) => None,
        }
    }

    pub fn streaming(&self) -> bool {
        self.stream_handler().is_some()
    }
}

/// A named capability offered by the agent.
pub struct Skill {
    pub key: String,
    pub description: Option<String>,
    pub input_schema: Option<Schema>,
    pub output_schema: Option<Schema>,
    pub input_modes: Option<Vec<String>>,
    pub output_modes: Option<Vec<String>>,
    pub handlers: SkillHandlers,
}

impl Skill {
    /// A skill with an invoke handler only.
    pub fn invoke(key: impl Into<String>, handler: Arc<dyn InvokeHandler>) -> Self {
        Self {
            key: key.into(),
            description: None,
            input_schema: None,
            output_schema: None,
            input_modes: None,
            output_modes: None,
            handlers: SkillHandlers::InvokeOnly(handler),
        }
    }

    /// A skill with a streaming handler only.
    pub fn stream(key: impl Into<String>, handler: Arc<dyn StreamHandler>) -> Self {
        Self {
            key: key.into(),
            description: None,
            input_schema: None,
            output_schema: None,
            input_modes: None,
            output_modes: None,
            handlers: SkillHandlers::StreamOnly(handler),
        }
    }

    /// A skill with both an invoke and a streaming handler.
    pub fn both(
        key: impl Into<String>,
        invoke: Arc<dyn InvokeHandler>,
        stream: Arc<dyn StreamHandler>,
    ) -> Self {
        Self {
            key: key.into(),
            description: None,
            input_schema: None,
            output_schema: None,
            input_modes: None,
            output_modes: None,
            handlers: SkillHandlers::Both(invoke, stream),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_input_schema(mut self, schema: Schema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_output_schema(mut self, schema: Schema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn streaming(&self) -> bool {
        self.handlers.streaming()
    }
}

/// An insertion-ordered map from skill key to [`Skill`].
///
/// Insertion order is preserved (not `HashMap` iteration order) so that
/// discovery output (`/entrypoints`, the agent card) is stable across
/// calls for the same registration sequence.
#[derive(Default)]
pub struct SkillRegistry {
    order: Vec<String>,
    skills: HashMap<String, Arc<Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a skill. Rejects an empty key or a key already present.
    pub fn add(&mut self, skill: Skill) -> RuntimeResult<()> {
        if skill.key.trim().is_empty() {
            return Err(RuntimeError::InvalidSkill {
                reason: "skill key must not be empty".to_string(),
            });
        }
        if self.skills.contains_key(&skill.key) {
            return Err(RuntimeError::DuplicateSkill { key: skill.key });
        }

        self.order.push(skill.key.clone());
        self.skills.insert(skill.key.clone(), Arc::new(skill));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Arc<Skill>> {
        self.skills.get(key).cloned()
    }

    /// All registered skills, in registration order.
    pub fn list(&self) -> Vec<Arc<Skill>> {
        self.order
            .iter()
            .filter_map(|key| self.skills.get(key).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopInvoke;

    #[async_trait]
    impl InvokeHandler for NoopInvoke {
        async fn invoke(&self, input: Value, _ctx: HandlerCtx) -> RuntimeResult<Outcome> {
            Ok(Outcome::new(input))
        }
    }

    #[test]
    fn registry_preserves_insertion_order() {
        let mut registry = SkillRegistry::new();
        registry.add(Skill::invoke("b", Arc::new(NoopInvoke))).unwrap();
        registry.add(Skill::invoke("a", Arc::new(NoopInvoke))).unwrap();
        let keys: Vec<_> = registry.list().iter().map(|s| s.key.clone()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn registry_rejects_duplicate_keys() {
        let mut registry = SkillRegistry::new();
        registry.add(Skill::invoke("echo", Arc::new(NoopInvoke))).unwrap();
        let err = registry.add(Skill::invoke("echo", Arc::new(NoopInvoke))).unwrap_err();
        assert_eq!(err.code(), "duplicate_skill");
    }

    #[test]
    fn registry_rejects_empty_key() {
        let mut registry = SkillRegistry::new();
        let err = registry.add(Skill::invoke("", Arc::new(NoopInvoke))).unwrap_err();
        assert_eq!(err.code(), "invalid_skill");
    }

    #[test]
    fn get_returns_none_for_unknown_key() {
        let registry = SkillRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn streaming_flag_follows_handler_presence() {
        struct NoopStream;
        #[async_trait]
        impl StreamHandler for NoopStream {
            async fn stream(&self, input: Value, _e: Arc<dyn Emitter>, _c: HandlerCtx) -> RuntimeResult<Outcome> {
                Ok(Outcome::new(input))
            }
        }

        let invoke_only = Skill::invoke("a", Arc::new(NoopInvoke));
        assert!(!invoke_only.streaming());

        let stream_only = Skill::stream("b", Arc::new(NoopStream));
        assert!(stream_only.streaming());
    }
}
