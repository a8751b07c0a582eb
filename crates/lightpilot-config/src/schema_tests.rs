use super::*;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.xai.model, "grok-preview");
    assert_eq!(config.xai.temperature, 0.7);
    assert!(config.xai.api_key.is_none());
    assert_eq!(config.bus.reply_timeout_ms, 30_000);
    assert_eq!(config.agent.control_selector, r#"button[data-cy="ai-prompt-submit"]"#);
    assert_eq!(config.store.backend, StoreBackend::File);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_partial_section_keeps_defaults() {
    let config: Config = toml::from_str(
        r#"
        [agent]
        poll_timeout_ms = 250
        "#,
    )
    .unwrap();
    assert_eq!(config.agent.poll_timeout_ms, 250);
    assert_eq!(config.agent.poll_interval_ms, 100);
    assert_eq!(config.agent.build_url, "https://replit.com/new/nix?tab=ai");
}

#[test]
fn test_store_backend_lowercase() {
    let config: Config = toml::from_str(
        r#"
        [store]
        backend = "memory"
        "#,
    )
    .unwrap();
    assert_eq!(config.store.backend, StoreBackend::Memory);
}

#[test]
fn test_unknown_backend_rejected() {
    let result = toml::from_str::<Config>(
        r#"
        [store]
        backend = "sqlite"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_serialize_skips_missing_secrets() {
    let text = toml::to_string(&Config::default()).unwrap();
    assert!(!text.contains("api_key"));
    assert!(!text.contains("bearer_token"));
}
