mod builder;
mod todo_server;
pub use builder::*;
pub use todo_server::*;
