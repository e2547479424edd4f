use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    tonic_build::configure()
        .file_descriptor_set_path(out_dir.join("todo_descriptor.bin"))
        .type_attribute(".todo", "#[derive(serde::Serialize, serde::Deserialize)]")
        .protoc_arg("--experimental_allow_proto3_optional")
        .compile_protos(&["proto/todo.proto"], &["proto"])
        .unwrap_or_else(|e| panic!("protobuf compile error: {e}"));

    Ok(())
}
