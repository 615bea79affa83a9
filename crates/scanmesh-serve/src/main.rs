use scanmesh_serve::config::Args;
use scanmesh_serve::{app, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    let storage = args.storage();
    storage.create_dirs()?;

    let addr = format!("{}:{}", args.host, args.port);

    log::info!("🚀 Starting the server");
    log::info!("📁 Uploads: {}", storage.upload_dir.display());
    log::info!("📁 Point clouds: {}", storage.ply_dir.display());
    log::info!("📁 Meshes: {}", storage.mesh_dir.display());
    log::info!("🔥 Listening on: http://{}", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let state = AppState::new(args.params(), storage, args.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
