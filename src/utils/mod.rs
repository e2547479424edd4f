pub mod convert;
pub mod file_io;
