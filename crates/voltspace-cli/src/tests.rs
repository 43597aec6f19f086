//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::Path;

use chrono::DateTime;
use clap::Parser;
use serde_json::json;
use tempfile::NamedTempFile;
use voltspace_core::config::{parse_config, Config};
use voltspace_core::AIBackend;

use crate::cli::{Cli, Commands};
use crate::commands;

fn config_with(env: &[(&str, &str)]) -> Config {
    let env: Vec<(String, String)> = env
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::resolve(parse_config("").unwrap(), |key| {
        env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    })
}

fn temp_file(suffix: &str, content: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content).unwrap();
    file
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_serve_overrides() {
    let cli = Cli::try_parse_from([
        "voltspace", "serve", "--port", "9000", "--host", "0.0.0.0", "--verbose",
    ])
    .unwrap();
    assert!(cli.verbose);
    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
        } => {
            assert_eq!(port, Some(9000));
            assert_eq!(host.as_deref(), Some("0.0.0.0"));
            assert!(static_dir.is_none());
        }
        _ => panic!("expected serve"),
    }
}

#[test]
fn test_parse_insights_and_global_config() {
    let cli = Cli::try_parse_from([
        "voltspace",
        "insights",
        "--file",
        "devices.json",
        "--ai",
        "--config",
        "/etc/voltspace.toml",
    ])
    .unwrap();
    assert_eq!(
        cli.config.as_deref(),
        Some(Path::new("/etc/voltspace.toml"))
    );
    match cli.command {
        Commands::Insights { file, ai, at } => {
            assert_eq!(file, Path::new("devices.json"));
            assert!(ai);
            assert!(at.is_none());
        }
        _ => panic!("expected insights"),
    }
}

#[test]
fn test_parse_requires_subcommand() {
    assert!(Cli::try_parse_from(["voltspace"]).is_err());
    assert!(Cli::try_parse_from(["voltspace", "meshify"]).is_err());
}

// ========== Insights Command Tests ==========

#[tokio::test]
async fn test_run_insights_rules() {
    let now = DateTime::parse_from_rfc3339("2024-06-10T02:00:00+02:00").unwrap();
    let devices = json!([
        {"name": "Hallway", "type": "light", "power_w": 9,
         "state": {"on": true}, "last_active": "2024-06-09T13:00:00Z"},
        {"name": "Dishwasher", "type": "plug", "power_w": 0,
         "state": {"on": false, "flexible": true}}
    ]);

    let response = commands::run_insights(&devices.to_string(), now, None)
        .await
        .unwrap();
    let titles: Vec<&str> = response.insights.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Light on for 11h: Hallway", "Shiftable load: Dishwasher"]
    );
}

#[tokio::test]
async fn test_run_insights_rejects_non_list() {
    let now = DateTime::parse_from_rfc3339("2024-06-10T02:00:00+02:00").unwrap();
    let err = commands::run_insights(r#"{"name": "Hallway"}"#, now, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Expected a JSON list of devices"));
}

#[tokio::test]
async fn test_cmd_insights_from_file() {
    let file = temp_file(".json", br#"[{"name": "TV", "type": "plug", "power_w": 45, "state": {"on": true}}]"#);
    let config = config_with(&[]);

    let result = commands::cmd_insights(
        &config,
        file.path(),
        true,
        Some("2024-06-10T02:00:00+02:00"),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_insights_invalid_at() {
    let file = temp_file(".json", b"[]");
    let config = config_with(&[]);

    let err = commands::cmd_insights(&config, file.path(), false, Some("yesterday"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Invalid --at time"));
}

#[test]
fn test_insights_client_uses_insights_model() {
    assert!(commands::insights_client(&config_with(&[])).is_none());

    let config = config_with(&[
        ("OPENAI_API_KEY", "sk-test"),
        ("OPENAI_INSIGHTS_MODEL", "gpt-4o"),
    ]);
    let client = commands::insights_client(&config).unwrap();
    assert_eq!(client.model(), "gpt-4o");
}

// ========== Ask Command Tests ==========

#[test]
fn test_read_context_json_and_text() {
    let file = temp_file(".json", br#"{"kwh_today": 12}"#);
    assert_eq!(
        commands::read_context(file.path()).unwrap(),
        json!({"kwh_today": 12})
    );

    let file = temp_file(".txt", b"kWh today: 12");
    assert_eq!(
        commands::read_context(file.path()).unwrap(),
        json!("kWh today: 12")
    );
}

#[tokio::test]
async fn test_cmd_ask_without_credential() {
    let config = config_with(&[]);
    assert!(commands::cmd_ask(&config, "How do I save?", None).await.is_ok());
}

#[tokio::test]
async fn test_cmd_ask_blank_question() {
    let config = config_with(&[]);
    let err = commands::cmd_ask(&config, "  ", None).await.unwrap_err();
    assert_eq!(err.to_string(), "Missing question");
}

// ========== Meshify Command Tests ==========

#[test]
fn test_content_type_for() {
    assert_eq!(commands::content_type_for(Path::new("plan.png")), "image/png");
    assert_eq!(commands::content_type_for(Path::new("plan.JPG")), "image/jpeg");
    assert_eq!(commands::content_type_for(Path::new("plan.jpeg")), "image/jpeg");
    assert_eq!(
        commands::content_type_for(Path::new("plan.gif")),
        "application/octet-stream"
    );
}

#[test]
fn test_read_image() {
    let file = temp_file(".png", b"\x89PNG\r\n");
    let upload = commands::read_image(file.path(), Some("floor plan")).unwrap();
    assert_eq!(upload.content_type, "image/png");
    assert_eq!(upload.bytes, b"\x89PNG\r\n");
    assert_eq!(upload.hint.as_deref(), Some("floor plan"));
    assert!(upload.filename.as_deref().unwrap().ends_with(".png"));
    assert!(upload.validate().is_ok());
}

#[tokio::test]
async fn test_cmd_meshify_not_configured() {
    let file = temp_file(".png", b"\x89PNG");
    let config = config_with(&[]);

    let err = commands::cmd_meshify(&config, file.path(), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "MESHY_API_KEY not set");
}

// ========== Config Command Tests ==========

#[test]
fn test_render_config_masks_credentials() {
    let config = config_with(&[
        ("OPENAI_API_KEY", "sk-abcdefgh1234"),
        ("MESHY_API_KEY", "msy-secretvalue9876"),
    ]);
    let rendered = commands::render_config(&config);

    assert!(!rendered.contains("sk-abcdefgh1234"));
    assert!(!rendered.contains("msy-secretvalue9876"));
    assert!(rendered.contains("****1234"));
    assert!(rendered.contains("****9876"));
    assert!(rendered.contains("Chat model: gpt-4o-mini"));
}

#[test]
fn test_render_config_unconfigured() {
    let rendered = commands::render_config(&config_with(&[]));
    assert!(rendered.contains("OPENAI_API_KEY not set"));
    assert!(rendered.contains("MESHY_API_KEY not set"));
    assert!(rendered.contains("Public URL: http://127.0.0.1:8000"));
}
