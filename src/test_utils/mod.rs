mod common;
pub use common::*;
