//! Task store — in-process persistence for tracked tasks.
//!
//! Tasks are ephemeral by design (see the "Persistent task storage"
//! non-goal) — the only provided implementation keeps everything in a
//! `HashMap` guarded by a `RwLock`, mirroring the insertion-order
//! bookkeeping of an in-memory store built for cursor-free, offset-based
//! listing. A durable implementation can be swapped in later without
//! changing this trait's contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RuntimeResult;
use crate::types::Task;

/// Persists and retrieves [`Task`] records.
///
/// Implementations must be `Send + Sync`; all methods take `&self` and
/// rely on interior mutability.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert or overwrite a task.
    async fn save(&self, task: Task) -> RuntimeResult<()>;

    /// Look up a task by id.
    async fn get(&self, task_id: &str) -> RuntimeResult<Option<Task>>;

    /// All tasks in insertion (creation) order.
    ///
    /// Filtering and pagination are applied by the task manager, not
    /// here, so that the store stays a plain key/value surface.
    async fn list_all(&self) -> RuntimeResult<Vec<Task>>;
}

/// `HashMap`-backed [`TaskStore`], guarded by a `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
    insertion_order: RwLock<Vec<String>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: Task) -> RuntimeResult<()> {
        let task_id = task.task_id.clone();
        let mut tasks = self.tasks.write().await;
        let is_new = !tasks.contains_key(&task_id);
        tasks.insert(task_id.clone(), task);

        if is_new {
            self.insertion_order.write().await.push(task_id.clone());
        }

        debug!(task_id = %task_id, is_new, "task saved");
        Ok(())
    }

    async fn get(&self, task_id: &str) -> RuntimeResult<Option<Task>> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn list_all(&self) -> RuntimeResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let order = self.insertion_order.read().await;
        Ok(order.iter().filter_map(|id| tasks.get(id).cloned()).collect())
    }
}

pub type SharedTaskStore = Arc<dyn TaskStore>;
