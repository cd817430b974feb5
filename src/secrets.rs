use std::path::{Path, PathBuf};

fn default_state_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".windlass")
}

fn state_dir() -> PathBuf {
    if let Ok(path) = std::env::var("WINDLASS_CONFIG") {
        let config_path = PathBuf::from(path);
        if let Some(parent) = config_path.parent() {
            return parent.to_path_buf();
        }
    }
    default_state_dir()
}

fn credentials_dir_for(state_dir: &Path) -> PathBuf {
    state_dir.join("credentials")
}

fn normalize_provider(provider: &str) -> anyhow::Result<String> {
    let provider = provider.trim().to_ascii_lowercase();
    match provider.as_str() {
        "anthropic" | "openai" => Ok(provider),
        _ => anyhow::bail!("unsupported provider for key store: {provider}"),
    }
}

fn key_file_path_for(state_dir: &Path, provider: &str) -> anyhow::Result<PathBuf> {
    let provider = normalize_provider(provider)?;
    Ok(credentials_dir_for(state_dir).join(format!("{provider}.key")))
}

pub fn write_key_to(state_dir: &Path, provider: &str, api_key: &str) -> anyhow::Result<PathBuf> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        anyhow::bail!("API key cannot be empty");
    }

    let dir = credentials_dir_for(state_dir);
    std::fs::create_dir_all(&dir)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {e}", dir.display()))?;
    set_secure_dir_permissions(&dir)?;

    let path = key_file_path_for(state_dir, provider)?;
    std::fs::write(&path, api_key)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    set_secure_file_permissions(&path)?;
    Ok(path)
}

pub fn read_key_from(state_dir: &Path, provider: &str) -> Option<String> {
    let path = key_file_path_for(state_dir, provider).ok()?;
    let value = std::fs::read_to_string(path).ok()?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Store a provider API key in ~/.windlass/credentials/{provider}.key.
pub fn store_api_key(provider: &str, api_key: &str) -> anyhow::Result<PathBuf> {
    write_key_to(&state_dir(), provider, api_key)
}

/// Load a provider API key from ~/.windlass/credentials/{provider}.key.
pub fn load_api_key(provider: &str) -> Option<String> {
    read_key_from(&state_dir(), provider)
}

#[cfg(unix)]
fn set_secure_dir_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| anyhow::anyhow!("failed to chmod 700 {}: {e}", path.display()))
}

#[cfg(not(unix))]
fn set_secure_dir_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_secure_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| anyhow::anyhow!("failed to chmod 600 {}: {e}", path.display()))
}

#[cfg(not(unix))]
fn set_secure_file_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
