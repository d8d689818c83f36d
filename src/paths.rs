//! Centralized path resolution for devhub
//!
//! # Environment Variables
//!
//! - `DEVHUB_CONFIG_DIR` - Override config directory
//! - `DEVHUB_STATE_DIR` - Override state directory (tracked state lives here)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `DEVHUB_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/devhub` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\devhub`
//!    - macOS/Linux: `~/.config/devhub`
//!
//! For state_dir():
//! 1. `DEVHUB_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/devhub` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\devhub`
//!    - macOS/Linux: `~/.local/state/devhub`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "DEVHUB_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "DEVHUB_STATE_DIR";

/// Default declaration file name
pub const DECLARATIONS_FILE: &str = "devhub.toml";

/// Tracked state file name
pub const STATE_FILE: &str = "state.json";

/// Get the devhub config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("devhub");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("devhub");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("devhub");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the devhub state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("devhub");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join("devhub");
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("devhub");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Resolve the declaration file.
///
/// An explicit `--file` wins. Otherwise `devhub.toml` in the working
/// directory, falling back to the one in the config directory.
pub fn declarations_file(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(file) = explicit {
        return Ok(expand(file));
    }

    let local = PathBuf::from(DECLARATIONS_FILE);
    if local.exists() {
        return Ok(local);
    }

    Ok(config_dir()?.join(DECLARATIONS_FILE))
}

/// Tracked state file, `state.json` in the state directory.
pub fn state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join(STATE_FILE))
}

/// Path of the temporary file a write of `path` goes through.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/config/path", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/config/path"));
        });
    }

    #[test]
    fn test_state_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let expected = home.join("devhub-tilde-test");
        with_env_var(ENV_STATE_DIR, "~/devhub-tilde-test", || {
            let result = state_dir().unwrap();
            assert_eq!(result, expected);
            assert_eq!(state_file().unwrap(), expected.join("state.json"));
        });
    }

    #[test]
    fn test_xdg_state_home() {
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-test", || {
                let result = state_dir().unwrap();
                assert_eq!(result, PathBuf::from("/tmp/xdg-state-test/devhub"));
            });
        });
    }

    #[test]
    fn test_declarations_file_explicit() {
        let result = declarations_file(Some("/srv/devhub/prod.toml")).unwrap();
        assert_eq!(result, PathBuf::from("/srv/devhub/prod.toml"));
    }

    #[test]
    fn test_temp_sibling() {
        let tmp = temp_sibling(Path::new("/var/state/state.json"));
        assert_eq!(tmp, PathBuf::from("/var/state/state.json.tmp"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_with_env_var() {
        with_env_var("DEVHUB_TEST_VAR", "test_value", || {
            let result = expand("/path/$DEVHUB_TEST_VAR/file");
            assert_eq!(result, PathBuf::from("/path/test_value/file"));
        });
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_config_dir_unix() {
        without_env_var(ENV_CONFIG_DIR, || {
            without_env_var("XDG_CONFIG_HOME", || {
                let result = config_dir().unwrap();
                let home = dirs::home_dir().unwrap();
                assert_eq!(result, home.join(".config").join("devhub"));
            });
        });
    }
}
