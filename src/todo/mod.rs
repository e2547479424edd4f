//! Domain types for todo records and the change events published for them.


use serde::Deserialize;
use serde::Serialize;

/// A task record.
///
/// Values are immutable for a given logical version: an update produces a new
/// `Todo` carrying the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl Todo {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed: false,
        }
    }

    /// Degenerate record published when `id` is deleted.
    pub fn tombstone(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Partial update for a [`Todo`].
///
/// `None` means "leave unchanged", so setting a title to the empty string is
/// distinguishable from not touching it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            completed: None,
        }
    }

    pub fn completed(completed: bool) -> Self {
        Self {
            title: None,
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }

    /// Merges the supplied fields onto `current`, keeping its id.
    pub fn apply(
        &self,
        current: &Todo,
    ) -> Todo {
        Todo {
            id: current.id.clone(),
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            completed: self.completed.unwrap_or(current.completed),
        }
    }
}

/// A change published to watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoEvent {
    /// Record was created or updated
    Upserted(Todo),
    /// Record was deleted; carries a tombstone holding only the id
    Deleted(Todo),
}

impl TodoEvent {
    pub fn deleted(id: impl Into<String>) -> Self {
        TodoEvent::Deleted(Todo::tombstone(id))
    }

    pub fn todo(&self) -> &Todo {
        match self {
            TodoEvent::Upserted(todo) | TodoEvent::Deleted(todo) => todo,
        }
    }

    pub fn id(&self) -> &str {
        &self.todo().id
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, TodoEvent::Deleted(_))
    }
}
