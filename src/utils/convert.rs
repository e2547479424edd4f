//! Conversions between domain types and the generated protobuf messages.

use crate::proto;
use crate::proto::watch_todos_request::Action;
use crate::Todo;
use crate::TodoEvent;
use crate::TodoPatch;
use crate::WatchControl;

impl From<Todo> for proto::Todo {
    fn from(todo: Todo) -> Self {
        proto::Todo {
            id: todo.id,
            title: todo.title,
            completed: todo.completed,
        }
    }
}

impl From<proto::Todo> for Todo {
    fn from(todo: proto::Todo) -> Self {
        Todo {
            id: todo.id,
            title: todo.title,
            completed: todo.completed,
        }
    }
}

impl From<TodoEvent> for proto::TodoEvent {
    fn from(event: TodoEvent) -> Self {
        let (event_type, todo) = match event {
            TodoEvent::Upserted(todo) => (proto::TodoEventType::Upserted, todo),
            TodoEvent::Deleted(todo) => (proto::TodoEventType::Deleted, todo),
        };

        proto::TodoEvent {
            event_type: event_type.into(),
            todo: Some(todo.into()),
        }
    }
}

/// Decodes a wire event; `None` when the todo payload is missing.
pub fn event_from_proto(event: proto::TodoEvent) -> Option<TodoEvent> {
    let todo: Todo = event.todo?.into();
    match proto::TodoEventType::try_from(event.event_type) {
        Ok(proto::TodoEventType::Deleted) => Some(TodoEvent::Deleted(todo)),
        // Unknown discriminants fall back to the proto3 default
        _ => Some(TodoEvent::Upserted(todo)),
    }
}

/// Splits an update request into its target id and the explicitly supplied fields.
pub fn patch_from_request(req: proto::UpdateTodoRequest) -> (String, TodoPatch) {
    (
        req.id,
        TodoPatch {
            title: req.title,
            completed: req.completed,
        },
    )
}

/// Maps a watch control frame; `None` when the client sent no action.
pub fn control_from_request(req: &proto::WatchTodosRequest) -> Option<WatchControl> {
    match req.action {
        Some(Action::Start(_)) => Some(WatchControl::Start),
        Some(Action::Stop(_)) => Some(WatchControl::Stop),
        None => None,
    }
}

pub fn control_to_request(control: WatchControl) -> proto::WatchTodosRequest {
    let action = match control {
        WatchControl::Start => Action::Start(proto::watch_todos_request::Start {}),
        WatchControl::Stop => Action::Stop(proto::watch_todos_request::Stop {}),
    };
    proto::WatchTodosRequest {
        action: Some(action),
    }
}
