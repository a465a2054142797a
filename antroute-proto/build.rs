fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Ensure protoc is available via vendored binary for reproducible builds
    if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
        std::env::set_var("PROTOC", path);
    }

    println!("cargo:rerun-if-changed=proto/antroute.proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/antroute.proto"], &["proto"])?;
    Ok(())
}
