use windlass::config::{WindlassConfig, load};
use windlass::secrets::write_key_to;

#[test]
fn default_config_has_sensible_values() {
    let config = WindlassConfig::default();
    assert_eq!(config.model.provider, "anthropic");
    assert_eq!(config.model.model, "claude-sonnet-4-5-20250929");
    assert_eq!(config.model.max_tokens, 4096);
    assert!(config.model.api_key.is_none());
    assert!(config.model.system_prompt.is_none());
    assert!(!config.model.deterministic);
    assert_eq!(config.memory.window_turns, 5);
    assert!(!config.memory.unlimited);
}

#[test]
fn valid_toml_parses_successfully() {
    let toml_str = r#"
[model]
provider = "openai"
model = "gpt-4o"
max_tokens = 2048
api_key = "sk-test"
system_prompt = "You are helpful."
deterministic = true

[memory]
window_turns = 3
unlimited = false
"#;

    let config: WindlassConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.model.provider, "openai");
    assert_eq!(config.model.model, "gpt-4o");
    assert_eq!(config.model.max_tokens, 2048);
    assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
    assert_eq!(
        config.model.system_prompt.as_deref(),
        Some("You are helpful.")
    );
    assert!(config.model.deterministic);
    assert_eq!(config.memory.window_turns, 3);
}

#[test]
fn partial_config_uses_defaults_for_missing_fields() {
    let toml_str = r#"
[model]
api_key = "test-key"
"#;

    let config: WindlassConfig = toml::from_str(toml_str).unwrap();
    assert_eq!(config.model.provider, "anthropic");
    assert_eq!(config.model.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.memory.window_turns, 5);
}

#[test]
fn empty_toml_uses_all_defaults() {
    let config: WindlassConfig = toml::from_str("").unwrap();
    assert_eq!(config.model.provider, "anthropic");
    assert_eq!(config.memory.window_turns, 5);
    assert!(!config.memory.unlimited);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = toml::from_str::<WindlassConfig>("this is not valid toml {{{");
    assert!(result.is_err());
    let err = result.unwrap_err().to_string();
    assert!(
        err.contains("expected") || err.contains("invalid"),
        "error should be descriptive: {err}"
    );
}

#[test]
fn unlimited_memory_parses() {
    let toml_str = r#"
[memory]
unlimited = true
"#;

    let config: WindlassConfig = toml::from_str(toml_str).unwrap();
    assert!(config.memory.unlimited);
    // Turn count still carries its default alongside the flag
    assert_eq!(config.memory.window_turns, 5);
}

#[test]
fn config_path_env_var_controls_loading() {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("windlass-config-test-{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    let config_file = dir.join("config.toml");

    // 1. Non-existent file falls back to defaults
    // SAFETY: env var access is confined to this test
    unsafe {
        std::env::set_var("WINDLASS_CONFIG", config_file.to_str().unwrap());
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
    let config = load().unwrap();
    assert_eq!(config.model.provider, "anthropic");
    assert!(config.model.api_key.is_none());

    // 2. Values from the file win
    std::fs::write(
        &config_file,
        r#"
[model]
provider = "openai"
model = "gpt-4o"

[memory]
window_turns = 2
"#,
    )
    .unwrap();
    unsafe {
        std::env::remove_var("OPENAI_API_KEY");
    }
    let config = load().unwrap();
    assert_eq!(config.model.provider, "openai");
    assert_eq!(config.memory.window_turns, 2);

    // 3. A key file next to the config resolves the credential
    write_key_to(&dir, "openai", "sk-from-file").unwrap();
    let config = load().unwrap();
    assert_eq!(config.model.api_key.as_deref(), Some("sk-from-file"));

    // 4. An unknown provider is rejected by validation
    std::fs::write(
        &config_file,
        r#"
[model]
provider = "deepmind"
"#,
    )
    .unwrap();
    let err = load().unwrap_err().to_string();
    assert!(err.contains("invalid provider"), "got: {err}");

    // 5. A zero-turn window without unlimited is rejected
    std::fs::write(
        &config_file,
        r#"
[memory]
window_turns = 0
"#,
    )
    .unwrap();
    let err = load().unwrap_err().to_string();
    assert!(err.contains("window_turns"), "got: {err}");

    unsafe {
        std::env::remove_var("WINDLASS_CONFIG");
    }
    std::fs::remove_dir_all(&dir).ok();
}
