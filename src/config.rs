//! Application configuration management.
//!
//! This module handles loading and saving the application configuration
//! (last used account identifier, preferred storage backend) and defines the
//! endpoint and storage-key constants shared by the auth and API layers.
//!
//! Configuration is stored at `~/.config/farecard/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "farecard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL for authentication endpoints (login, refresh, registration)
const DEFAULT_AUTH_BASE_URL: &str = "https://account.farecard.app";

/// Default base URL for account and resource endpoints
const DEFAULT_API_BASE_URL: &str = "https://api.farecard.app";

// ============================================================================
// Storage keys
// ============================================================================

/// Storage key for the short-lived bearer token
pub const KEY_ACCESS_TOKEN: &str = "access_token";

/// Storage key for the long-lived refresh token
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";

/// Storage key older releases used for the access token.
/// Never written anymore, but `clear_all` must still remove it so a stale
/// credential cannot survive an upgrade.
pub const KEY_LEGACY_TOKEN: &str = "token";

/// Storage key for the cached profile snapshot
pub const KEY_PROFILE: &str = "profile";

/// Every key the credential store has ever written, in any release.
pub const ALL_CREDENTIAL_KEYS: &[&str] = &[
    KEY_ACCESS_TOKEN,
    KEY_REFRESH_TOKEN,
    KEY_LEGACY_TOKEN,
    KEY_PROFILE,
];

// ============================================================================
// Endpoint classification
// ============================================================================

/// Path prefixes that belong to the authentication surface.
/// A 403 from one of these is a terminal session failure; a 403 from any
/// other endpoint is an ordinary permission error and must not touch the
/// session. The list is deliberately explicit rather than inferred from
/// substrings at call sites.
pub const AUTH_SURFACE_PREFIXES: &[&str] = &["/auth/", "/account/register"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub last_identifier: Option<String>,
    /// Store tokens in the OS keychain instead of the session file
    #[serde(default)]
    pub use_keyring: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Base URL for authentication endpoints.
    /// Overridable with FARECARD_AUTH_URL for staging environments.
    pub fn auth_base_url(&self) -> String {
        std::env::var("FARECARD_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_BASE_URL.to_string())
    }

    /// Base URL for account and resource endpoints.
    /// Overridable with FARECARD_API_URL for staging environments.
    pub fn api_base_url(&self) -> String {
        std::env::var("FARECARD_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_token_key_is_in_the_clear_list() {
        assert!(ALL_CREDENTIAL_KEYS.contains(&KEY_LEGACY_TOKEN));
        assert!(ALL_CREDENTIAL_KEYS.contains(&KEY_ACCESS_TOKEN));
        assert!(ALL_CREDENTIAL_KEYS.contains(&KEY_REFRESH_TOKEN));
        assert!(ALL_CREDENTIAL_KEYS.contains(&KEY_PROFILE));
    }
}
