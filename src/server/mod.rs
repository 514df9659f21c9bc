//! Server framework — task lifecycle, SSE engine, and axum routes.
//!
//! - [`task_store::TaskStore`] trait + [`task_store::InMemoryTaskStore`] —
//!   task persistence.
//! - [`task_manager::TaskManager`] — creates, tracks, lists, and cancels
//!   tasks; owns the completion/failure latch and cooperative
//!   cancellation.
//! - [`sse`] — the SSE engine: polling task-subscribe stream and the
//!   skill-stream envelope framing.
//! - [`http::agent_router`] — ready-made axum routes for the full surface
//!   (discovery, entrypoints, tasks).
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use a2a_runtime::agent_core::AgentCore;
//! use a2a_runtime::server::http::agent_router;
//! use a2a_runtime::server::task_manager::{TaskManager, TaskManagerConfig};
//! use a2a_runtime::server::task_store::InMemoryTaskStore;
//!
//! let core = Arc::new(AgentCore::new(registry));
//! let store = Arc::new(InMemoryTaskStore::new());
//! let manager = Arc::new(TaskManager::new(store, core.clone(), TaskManagerConfig::default()));
//! let app = agent_router(core, manager, card);
//! ```

pub mod http;
pub mod sse;
pub mod task_manager;
pub mod task_store;

pub use http::agent_router;
pub use sse::{skill_stream, task_subscribe_stream, SSE_KEEP_ALIVE};
pub use task_manager::{TaskManager, TaskManagerConfig};
pub use task_store::{InMemoryTaskStore, SharedTaskStore, TaskStore};
