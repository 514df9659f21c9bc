//! Fluent construction helpers: agent cards, the assembled agent
//! (router + card), and the client.

use std::collections::HashMap;

use crate::types::*;

/// Builder for constructing an [`AgentCard`] with sensible defaults.
///
/// # Example
///
/// ```
/// use a2a_runtime::builders::AgentCardBuilder;
///
/// let card = AgentCardBuilder::new("My Agent", "1.0.0", "http://localhost:8080")
///     .with_description("An example agent")
///     .with_streaming(true)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct AgentCardBuilder {
    name: String,
    version: String,
    url: String,
    description: Option<String>,
    skills: Vec<SkillSummary>,
    capabilities: AgentCapabilities,
    default_input_modes: Vec<String>,
    default_output_modes: Vec<String>,
    extensions: HashMap<String, serde_json::Value>,
}

impl AgentCardBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            url: url.into(),
            description: None,
            skills: Vec::new(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["application/json".to_string()],
            default_output_modes: vec!["application/json".to_string()],
            extensions: HashMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.capabilities.streaming = enabled;
        self
    }

    pub fn with_push_notifications(mut self, enabled: bool) -> Self {
        self.capabilities.push_notifications = enabled;
        self
    }

    pub fn with_skill(mut self, skill: SkillSummary) -> Self {
        self.skills.push(skill);
        self
    }

    pub fn with_input_modes(mut self, modes: Vec<String>) -> Self {
        self.default_input_modes = modes;
        self
    }

    pub fn with_output_modes(mut self, modes: Vec<String>) -> Self {
        self.default_output_modes = modes;
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    pub fn build(self) -> AgentCard {
        AgentCard {
            name: self.name,
            version: self.version,
            description: self.description,
            url: self.url,
            skills: self.skills,
            capabilities: self.capabilities,
            default_input_modes: self.default_input_modes,
            default_output_modes: self.default_output_modes,
            extensions: self.extensions,
        }
    }
}

/// Explicit runtime configuration — no `Default` relying on environment
/// reads. The embedding binary parses its own CLI/env and constructs
/// this directly.
#[cfg(feature = "server")]
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub base_url: String,
    pub task_manager: crate::server::task_manager::TaskManagerConfig,
}

#[cfg(feature = "server")]
impl AgentConfig {
    pub fn new(name: impl Into<String>, version: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            base_url: base_url.into(),
            task_manager: crate::server::task_manager::TaskManagerConfig::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_task_manager(mut self, config: crate::server::task_manager::TaskManagerConfig) -> Self {
        self.task_manager = config;
        self
    }
}

/// An assembled agent: the axum router and the agent card it serves at
/// `/.well-known/agent-card.json`, sharing one [`AgentCore`] and
/// [`TaskManager`].
///
/// [`AgentCore`]: crate::agent_core::AgentCore
/// [`TaskManager`]: crate::server::task_manager::TaskManager
#[cfg(feature = "server")]
pub struct Agent {
    pub router: axum::Router,
    pub card: AgentCard,
    pub core: std::sync::Arc<crate::agent_core::AgentCore>,
    pub manager: std::sync::Arc<crate::server::task_manager::TaskManager>,
}

/// Builder assembling a [`SkillRegistry`] and an [`AgentConfig`] into an
/// [`Agent`].
///
/// # Example
///
/// ```rust,ignore
/// use a2a_runtime::builders::{AgentBuilder, AgentConfig};
///
/// let agent = AgentBuilder::new(registry, AgentConfig::new("echo", "0.1.0", "http://localhost:8080"))
///     .with_task_store(store)
///     .build();
/// ```
///
/// [`SkillRegistry`]: crate::skill::SkillRegistry
#[cfg(feature = "server")]
pub struct AgentBuilder {
    registry: crate::skill::SkillRegistry,
    config: AgentConfig,
    task_store: Option<crate::server::task_store::SharedTaskStore>,
    extensions: HashMap<String, serde_json::Value>,
    cors_enabled: bool,
}

#[cfg(feature = "server")]
impl AgentBuilder {
    pub fn new(registry: crate::skill::SkillRegistry, config: AgentConfig) -> Self {
        Self {
            registry,
            config,
            task_store: None,
            extensions: HashMap::new(),
            cors_enabled: false,
        }
    }

    pub fn with_task_store(mut self, store: crate::server::task_store::SharedTaskStore) -> Self {
        self.task_store = Some(store);
        self
    }

    /// Enable permissive CORS middleware on the assembled router.
    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Build the [`Agent`]: an [`AgentCore`] over the registered skills,
    /// a [`TaskManager`] over the configured (or default in-memory)
    /// task store, the derived [`AgentCard`], and the axum router
    /// wiring all three together.
    ///
    /// [`AgentCore`]: crate::agent_core::AgentCore
    /// [`TaskManager`]: crate::server::task_manager::TaskManager
    pub fn build(self) -> Agent {
        use std::sync::Arc;

        let skills: Vec<SkillSummary> = self
            .registry
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

        let streaming = skills.iter().any(|s| s.streaming);
        let mut builder = AgentCardBuilder::new(&self.config.name, &self.config.version, &self.config.base_url)
            .with_streaming(streaming);
        if let Some(description) = &self.config.description {
            builder = builder.with_description(description.clone());
        }
        let mut card = builder.build();
        card.skills = skills;
        for (key, value) in self.extensions {
            card.extensions.insert(key, value);
        }

        let core = Arc::new(crate::agent_core::AgentCore::new(Arc::new(self.registry)));
        let store = self
            .task_store
            .unwrap_or_else(|| Arc::new(crate::server::task_store::InMemoryTaskStore::new()));
        let manager = Arc::new(crate::server::task_manager::TaskManager::new(
            store,
            core.clone(),
            self.config.task_manager,
        ));

        let mut router = crate::server::http::agent_router(core.clone(), manager.clone(), card.clone());
        if self.cors_enabled {
            use tower_http::cors::CorsLayer;
            router = router.layer(CorsLayer::permissive());
        }

        Agent {
            router,
            card,
            core,
            manager,
        }
    }
}

/// Builder for constructing [`crate::client::AgentClient`] with custom
/// configuration.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// use a2a_runtime::builders::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new("http://localhost:8080")
///     .with_timeout(Duration::from_secs(30))
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "client")]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    url: String,
    timeout: Option<std::time::Duration>,
    headers: HashMap<String, String>,
}

#[cfg(feature = "client")]
impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
            headers: HashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", token.into()),
        );
        self
    }

    pub fn with_api_key(mut self, header_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.headers.insert(header_name.into(), api_key.into());
        self
    }

    fn config(&self) -> crate::client::ClientConfig {
        let mut config = crate::client::ClientConfig::new(&self.url);
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        for (key, value) in &self.headers {
            config = config.with_header(key, value);
        }
        config
    }

    /// Build the client, eagerly fetching the agent card.
    pub async fn build(self) -> crate::error::RuntimeResult<crate::client::AgentClient> {
        crate::client::AgentClient::connect(self.config()).await
    }

    /// Build the client without fetching the agent card.
    pub fn build_without_card(self) -> crate::error::RuntimeResult<crate::client::AgentClient> {
        crate::client::AgentClient::new(self.config())
    }
}
