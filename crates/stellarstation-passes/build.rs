fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(
            &["stellarstation/api/v1/stellarstation.proto"],
            &["../../proto"],
        )?;
    Ok(())
}
