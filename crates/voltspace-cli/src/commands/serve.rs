//! Server command implementation

use std::path::PathBuf;

use anyhow::Result;
use voltspace_core::Config;

pub async fn cmd_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(dir) = static_dir {
        config.server.static_dir = dir;
    }

    let server = &config.server;
    println!("🚀 Starting VoltSpace server...");
    println!("   Listening: http://{}:{}", server.host, server.port);
    println!("   Public URL: {}", server.public_url);
    println!("   Static files: {}", server.static_dir.display());
    println!("   Uploads: {}", server.upload_dir.display());
    if !config.text_generation.is_configured() {
        println!("   ℹ️  OPENAI_API_KEY not set: rule-based insights, demo assistant");
    }
    if !config.mesh.is_configured() {
        println!("   ℹ️  MESHY_API_KEY not set: /meshify disabled");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    voltspace_server::serve(config).await?;

    Ok(())
}
