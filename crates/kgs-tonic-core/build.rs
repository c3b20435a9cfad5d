/// Builds the gRPC client and server code for the `kgs.proto` definition using
/// `tonic-prost-build`.
///
/// This code generation step processes the Protocol Buffer definitions located
/// in the `proto` directory and emits Rust modules with gRPC bindings into the
/// crate's `OUT_DIR`. A file descriptor set is written alongside so the server
/// can expose gRPC reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/kgs.proto`
/// - Includes: `proto/`
/// - Descriptor: `$OUT_DIR/kgs_descriptor.bin`
///
/// # Panics
///
/// Panics if `OUT_DIR` is unset or code generation fails; either aborts the
/// build with the underlying error.
use std::env;
use std::path::PathBuf;
fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("kgs_descriptor.bin");

    println!("cargo:rerun-if-changed=proto/kgs.proto");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/kgs.proto"], &["proto"])
        .unwrap();
}
