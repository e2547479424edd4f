//! Protocol Buffer definitions and generated code for the todo RPC service.
//!
//! Generated by [`tonic-build`] from `proto/todo.proto` at build time.

pub mod todo {
    tonic::include_proto!("todo");
}

pub use todo::*;

/// Encoded descriptors for `proto/todo.proto`, served through gRPC reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("todo_descriptor");
