//! Config Persistence Integration Tests

use std::fs;

use tempfile::TempDir;

use mint_ai::models::settings::{AppConfig, RetryConfig, SettingsUpdate};
use mint_ai::storage::ConfigService;
use mint_ai::utils::error::AppError;
use mint_ai_core::SessionMode;

#[test]
fn test_partial_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(&path, r#"{"backend_url": "https://gen.example.com"}"#).unwrap();

    let service = ConfigService::with_path(&path).unwrap();
    let config = service.get_config();
    assert_eq!(config.backend_url, "https://gen.example.com");
    assert_eq!(config.generate_path, "/api/generate");
    assert_eq!(config.retry, RetryConfig::default());
    assert_eq!(config.plan_buffer_window, 500);
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    fs::write(
        &path,
        r#"{"backend_url": "http://x", "retry": {"max_attempts": 0, "base_delay_ms": 1, "max_delay_ms": 2}}"#,
    )
    .unwrap();

    assert!(matches!(
        ConfigService::with_path(&path),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn test_update_round_trips_through_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.json");
    let mut service = ConfigService::with_path(&path).unwrap();

    service
        .update_config(SettingsUpdate {
            default_mode: Some(SessionMode::Plan),
            retry: Some(RetryConfig {
                max_attempts: 5,
                base_delay_ms: 100,
                max_delay_ms: 1_000,
            }),
            ..Default::default()
        })
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["default_mode"], "plan");
    assert_eq!(raw["retry"]["max_attempts"], 5);

    let reopened = ConfigService::with_path(&path).unwrap();
    assert_eq!(reopened.get_config().retry.to_policy().max_attempts, 5);
    assert_ne!(reopened.get_config(), &AppConfig::default());
}
