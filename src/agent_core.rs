//! Agent Core — orchestrates one invocation of one skill.
//!
//! Looks the skill up in the registry, validates input/output against
//! its declared schemas, builds the handler context, and dispatches to
//! whichever handler the caller asked for. This is deliberately a plain
//! struct with methods (no trait, no subclassing) — see the
//! "class-based inheritance" design note.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::skill::{Emitter, HandlerCtx, Outcome, SkillRegistry};

/// Orchestrates skill dispatch against a [`SkillRegistry`].
#[derive(Clone)]
pub struct AgentCore {
    registry: Arc<SkillRegistry>,
}

impl AgentCore {
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Run a skill's synchronous `invoke` handler end to end: lookup,
    /// input validation, dispatch, output validation.
    pub async fn invoke(
        &self,
        key: &str,
        input: serde_json::Value,
        run_id: String,
        headers: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> RuntimeResult<Outcome> {
        let skill = self
            .registry
            .get(key)
            .ok_or_else(|| RuntimeError::SkillNotFound { key: key.to_string() })?;

        let handler = skill.handlers.invoke_handler().ok_or_else(|| {
            RuntimeError::NotImplemented {
                message: format!("skill '{key}' has no invoke handler"),
            }
        })?;

        let input = validate_input(&skill, input)?;

        let mut ctx = HandlerCtx::new(skill.key.clone(), run_id, cancel);
        ctx.headers = headers;

        debug!(skill = %key, run_id = %ctx.run_id, "dispatching invoke");
        let outcome = handler.invoke(input, ctx).await?;

        validate_output(&skill, outcome)
    }

    /// Run a skill's `stream` handler end to end: lookup, input
    /// validation, dispatch with the caller-supplied emitter, output
    /// validation of the aggregated result.
    pub async fn stream(
        &self,
        key: &str,
        input: serde_json::Value,
        emitter: Arc<dyn Emitter>,
        run_id: String,
        headers: HashMap<String, String>,
        cancel: CancellationToken,
    ) -> RuntimeResult<Outcome> {
        let skill = self
            .registry
            .get(key)
            .ok_or_else(|| RuntimeError::SkillNotFound { key: key.to_string() })?;

        let handler = skill.handlers.stream_handler().ok_or_else(|| {
            RuntimeError::StreamNotSupported { key: key.to_string() }
        })?;

        let input = validate_input(&skill, input)?;

        let mut ctx = HandlerCtx::new(skill.key.clone(), run_id, cancel);
        ctx.headers = headers;

        debug!(skill = %key, run_id = %ctx.run_id, "dispatching stream");
        let outcome = handler.stream(input, emitter, ctx).await?;

        validate_output(&skill, outcome)
    }
}

fn validate_input(
    skill: &crate::skill::Skill,
    input: serde_json::Value,
) -> RuntimeResult<serde_json::Value> {
    if let Some(schema) = &skill.input_schema {
        schema.validate(&input).map_err(|issues| {
            warn!(skill = %skill.key, issue_count = issues.len(), "input validation failed");
            RuntimeError::InvalidInput { issues }
        })?;
    }
    Ok(input)
}

fn validate_output(skill: &crate::skill::Skill, outcome: Outcome) -> RuntimeResult<Outcome> {
    if let Some(schema) = &skill.output_schema {
        schema.validate(&outcome.output).map_err(|issues| {
            warn!(skill = %skill.key, issue_count = issues.len(), "output validation failed");
            RuntimeError::InvalidOutput { issues }
        })?;
    }
    Ok(outcome)
}
