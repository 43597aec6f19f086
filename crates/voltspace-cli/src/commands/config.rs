//! Configuration display command

use std::path::Path;

use anyhow::Result;
use voltspace_core::config::{default_config_path, mask};
use voltspace_core::{Config, Provider};

pub fn cmd_config(config: &Config, path: Option<&Path>) -> Result<()> {
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| default_config_path().filter(|p| p.exists()));
    match file {
        Some(file) => println!("⚙️  Config file: {}", file.display()),
        None => println!("⚙️  Config file: (none, using defaults and environment)"),
    }
    println!();
    print!("{}", render_config(config));
    Ok(())
}

/// Human-readable configuration with credentials masked
pub fn render_config(config: &Config) -> String {
    let server = &config.server;
    let mut out = String::new();

    out.push_str("Server\n");
    out.push_str(&format!("   Listen: {}:{}\n", server.host, server.port));
    out.push_str(&format!("   Public URL: {}\n", server.public_url));
    out.push_str(&format!("   Static dir: {}\n", server.static_dir.display()));
    out.push_str(&format!("   Upload dir: {}\n", server.upload_dir.display()));
    out.push_str(&format!(
        "   Allowed origins: {}\n",
        server.allowed_origins.join(", ")
    ));

    out.push_str("\nText generation\n");
    match &config.text_generation {
        Provider::Configured(text) => {
            out.push_str(&format!("   ✅ API key: {}\n", mask(&text.api_key)));
            out.push_str(&format!("   Base URL: {}\n", text.base_url));
            out.push_str(&format!("   Chat model: {}\n", text.model));
            out.push_str(&format!("   Insights model: {}\n", text.insights_model));
        }
        Provider::Unconfigured { missing } => {
            out.push_str(&format!(
                "   ℹ️  Not configured ({} not set; insights use rules, assistant answers in demo mode)\n",
                missing
            ));
        }
    }

    out.push_str("\nImage-to-3D\n");
    match &config.mesh {
        Provider::Configured(mesh) => {
            out.push_str(&format!("   ✅ API key: {}\n", mask(&mesh.api_key)));
            out.push_str(&format!("   Base URL: {}\n", mesh.base_url));
            out.push_str(&format!(
                "   Polling: every {}s, give up after {}s\n",
                mesh.poll_interval.as_secs(),
                mesh.deadline.as_secs()
            ));
        }
        Provider::Unconfigured { missing } => {
            out.push_str(&format!("   ℹ️  Not configured ({} not set)\n", missing));
        }
    }

    out
}
