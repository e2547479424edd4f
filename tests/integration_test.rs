mod common;
mod reflection;
mod todo_crud;
mod watch_todos;
