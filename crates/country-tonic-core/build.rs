/// Builds the gRPC client and server code for the `country.proto` definition
/// using `tonic-prost-build`.
///
/// This code generation step processes the Protocol Buffer definitions located
/// in the `proto` directory and emits Rust modules with gRPC bindings into the
/// crate's `OUT_DIR`.
///
/// # Files and Paths
///
/// - Proto file: `proto/country.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// This function will `panic!` if code generation fails.
///
/// # Output
///
/// Generated code will be accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("proto");
/// }
/// ```
fn main() {
    println!("cargo:rerun-if-changed=proto/country.proto");

    tonic_prost_build::configure()
        .compile_protos(&["proto/country.proto"], &["proto"])
        .unwrap();
}
