use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WindlassConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub deterministic: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            max_tokens: default_max_tokens(),
            system_prompt: None,
            deterministic: false,
        }
    }
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-5-20250929".into()
}
fn default_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_window_turns")]
    pub window_turns: u32,
    #[serde(default)]
    pub unlimited: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_turns: default_window_turns(),
            unlimited: false,
        }
    }
}

fn default_window_turns() -> u32 {
    5
}

/// Load configuration from file or use defaults.
///
/// Search order:
/// 1. `WINDLASS_CONFIG` env var
/// 2. `~/.windlass/config.toml`
/// 3. Zero-config defaults (no file needed)
pub fn load() -> anyhow::Result<WindlassConfig> {
    let path = config_path();

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let mut config: WindlassConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;

        resolve_api_key(&mut config);
        validate(&config)?;

        info!("loaded config from {}", path.display());
        Ok(config)
    } else {
        info!("no config file found, using zero-config defaults");
        let mut config = WindlassConfig::default();
        resolve_api_key(&mut config);
        Ok(config)
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("WINDLASS_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".windlass").join("config.toml")
}

/// Write a starter config file to the given path.
pub fn save_to_path(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", parent.display()))?;
    }

    let starter = r#"# windlass configuration

[model]
provider = "anthropic"
model = "claude-sonnet-4-5-20250929"
max_tokens = 4096
# system_prompt = "You are a helpful assistant."
# deterministic = true

[memory]
window_turns = 5
unlimited = false
"#;

    std::fs::write(path, starter)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    info!("wrote starter config to {}", path.display());
    Ok(())
}

/// Resolve the API credential if not set in the config file.
///
/// Order: config value, provider env var, key file in the credentials dir.
fn resolve_api_key(config: &mut WindlassConfig) {
    if config.model.api_key.is_none() {
        config.model.api_key = match config.model.provider.as_str() {
            "anthropic" => std::env::var("ANTHROPIC_API_KEY").ok(),
            "openai" => std::env::var("OPENAI_API_KEY").ok(),
            _ => None,
        };
    }
    if config.model.api_key.is_none() {
        config.model.api_key = crate::secrets::load_api_key(&config.model.provider);
    }
}

/// Validate the config and return clear error messages.
fn validate(config: &WindlassConfig) -> anyhow::Result<()> {
    let valid_providers = ["anthropic", "openai"];
    if !valid_providers.contains(&config.model.provider.as_str()) {
        anyhow::bail!(
            "invalid provider '{}': must be one of {:?}",
            config.model.provider,
            valid_providers
        );
    }

    if config.model.max_tokens == 0 {
        anyhow::bail!("model.max_tokens must be > 0");
    }

    if !config.memory.unlimited && config.memory.window_turns == 0 {
        anyhow::bail!("memory.window_turns must be > 0 unless memory.unlimited is set");
    }

    Ok(())
}
