use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = PathBuf::from("../proto");

    println!("cargo:rerun-if-changed=../proto/proteus/v1/");
    println!("cargo:rerun-if-env-changed=PROTOC");

    // Fall back to the bundled protoc when the host has none configured.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()?;
        // SAFETY: build scripts are single-threaded.
        unsafe { std::env::set_var("PROTOC", protoc) };
    }
    let well_known = protoc_bin_vendored::include_path()?;

    // Resource backend protos (client-side)
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(
            &[
                "../proto/proteus/v1/tenant.proto",
                "../proto/proteus/v1/data.proto",
            ],
            &[proto_root, well_known],
        )?;

    Ok(())
}
