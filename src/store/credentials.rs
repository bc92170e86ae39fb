//! Credential store for the Jules API key.
//!
//! The key lives in a mode-0600 file under the config directory;
//! `JULES_API_KEY` in the environment takes precedence (useful for CI and
//! one-off runs without touching the stored credential).

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "JULES_API_KEY";

const API_KEY_FILE: &str = "api_key";

fn api_key_path() -> Result<PathBuf> {
    Ok(crate::config::config_dir()?.join(API_KEY_FILE))
}

/// Resolve the API key: environment first, then the credential file.
pub fn load_api_key() -> Result<Option<String>> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok(Some(key));
        }
    }

    load_from_path(&api_key_path()?)
}

/// Load the key from a specific file (used for testing).
pub fn load_from_path(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read API key from {}", path.display()))?;

    let key = content.trim().to_string();
    if key.is_empty() {
        return Ok(None);
    }
    Ok(Some(key))
}

pub fn save_api_key(key: &str) -> Result<()> {
    save_to_path(&api_key_path()?, key)
}

/// Save the key to a specific file (used for testing).
pub fn save_to_path(path: &Path, key: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, key.trim())
        .with_context(|| format!("Failed to write API key to {}", path.display()))?;

    // The key is a bearer credential; keep it private (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub fn delete_api_key() -> Result<()> {
    let path = api_key_path()?;
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete API key at {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api_key");

        save_to_path(&path, "  secret-key \n").unwrap();
        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded.as_deref(), Some("secret-key"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent");
        assert!(load_from_path(&path).unwrap().is_none());
    }

    #[test]
    fn test_empty_file_counts_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api_key");
        std::fs::write(&path, "  \n").unwrap();
        assert!(load_from_path(&path).unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_key_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("api_key");
        save_to_path(&path, "secret").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
