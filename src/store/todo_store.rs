//! In-memory record store for todos.
//!
//! All reads take the shared lock and all writes the exclusive lock. The lock
//! only ever guards the map and the id counter; it is never held across a
//! broker publish.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::Todo;

#[derive(Debug, Default)]
struct StoreInner {
    todos: HashMap<String, Todo>,
    /// Next identifier to hand out. Never decremented, so ids freed by a
    /// delete are not reused.
    next_index: u64,
}

#[derive(Debug, Default)]
pub struct TodoStore {
    inner: RwLock<StoreInner>,
}

impl TodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next identifier, rendered as a decimal string.
    pub fn next_id(&self) -> String {
        let mut inner = self.inner.write();
        let id = inner.next_index;
        inner.next_index += 1;
        id.to_string()
    }

    pub fn get(
        &self,
        id: &str,
    ) -> Option<Todo> {
        self.inner.read().todos.get(id).cloned()
    }

    pub fn add(
        &self,
        todo: Todo,
    ) {
        trace!(todo_id = %todo.id, "store add");
        self.inner.write().todos.insert(todo.id.clone(), todo);
    }

    /// Replaces the record at `todo.id`, inserting it if absent.
    pub fn update(
        &self,
        todo: Todo,
    ) {
        trace!(todo_id = %todo.id, "store update");
        self.inner.write().todos.insert(todo.id.clone(), todo);
    }

    /// Removes `id`; a missing id is a silent no-op.
    pub fn delete(
        &self,
        id: &str,
    ) {
        if self.inner.write().todos.remove(id).is_some() {
            trace!(todo_id = %id, "store delete");
        }
    }

    /// Snapshot of every record at call time, in no particular order.
    pub fn get_all(&self) -> Vec<Todo> {
        self.inner.read().todos.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().todos.is_empty()
    }
}
