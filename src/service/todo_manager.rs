//! Glue between RPC handlers and the store/broker pair.
//!
//! Every mutation is applied to the [`TodoStore`] first and then published,
//! so a watcher never sees a record the store does not (or did not) hold.
//! The store lock is always released before publishing. Both steps run on a
//! detached task, so a caller that gives up mid fan-out cannot leave a
//! committed change unpublished.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::Broker;
use crate::Error;
use crate::Result;
use crate::Todo;
use crate::TodoError;
use crate::TodoEvent;
use crate::TodoPatch;
use crate::TodoStore;

#[derive(Debug, Clone)]
pub struct TodoManager {
    store: Arc<TodoStore>,
    broker: Arc<Broker>,
}

impl TodoManager {
    pub fn new(
        store: Arc<TodoStore>,
        broker: Arc<Broker>,
    ) -> Self {
        Self { store, broker }
    }

    pub fn store(&self) -> &Arc<TodoStore> {
        &self.store
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Creates an incomplete todo under a fresh id and notifies watchers.
    pub async fn create_todo(
        &self,
        title: impl Into<String>,
    ) -> Result<Todo> {
        let title = title.into();
        let (store, broker) = (self.store.clone(), self.broker.clone());

        commit_detached(async move {
            let todo = Todo::new(store.next_id(), title);
            store.add(todo.clone());
            debug!(todo_id = %todo.id, "Todo created");

            broker.publish(TodoEvent::Upserted(todo.clone())).await;
            todo
        })
        .await
    }

    /// Snapshot of every stored todo, in no particular order.
    pub fn get_todos(&self) -> Vec<Todo> {
        self.store.get_all()
    }

    /// Applies the supplied fields to an existing todo.
    ///
    /// # Errors
    /// [`TodoError::NotFound`] if `id` is not stored. Nothing is published
    /// in that case.
    pub async fn update_todo(
        &self,
        id: &str,
        patch: TodoPatch,
    ) -> Result<Todo> {
        let id = id.to_string();
        let (store, broker) = (self.store.clone(), self.broker.clone());

        commit_detached(async move {
            let current = store.get(&id).ok_or_else(|| TodoError::NotFound { id: id.clone() })?;

            let updated = patch.apply(&current);
            store.update(updated.clone());
            debug!(todo_id = %id, ?patch, "Todo updated");

            broker.publish(TodoEvent::Upserted(updated.clone())).await;
            Ok::<_, Error>(updated)
        })
        .await?
    }

    /// Removes `id` and publishes a deletion. Unknown ids are not an error,
    /// and watchers are notified regardless.
    pub async fn delete_todo(
        &self,
        id: &str,
    ) -> Result<()> {
        let id = id.to_string();
        let (store, broker) = (self.store.clone(), self.broker.clone());

        commit_detached(async move {
            store.delete(&id);
            debug!(todo_id = %id, "Todo deleted");

            broker.publish(TodoEvent::deleted(id)).await;
        })
        .await
    }
}

/// Runs a store mutation and its publish on their own task.
///
/// Dropping the returned future (a cancelled RPC) does not stop the task, so
/// a committed mutation always reaches every subscriber.
async fn commit_detached<F, T>(commit: F) -> Result<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::spawn(commit).await?)
}
