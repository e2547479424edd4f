//! Network layer: the gRPC surface of the todo service.

pub mod grpc;
