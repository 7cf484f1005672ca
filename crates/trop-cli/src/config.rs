use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TropConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub credentials: CredentialSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    #[default]
    DefaultChain,
}

impl CredentialSource {
    /// Short description safe to log.
    pub fn describe(&self) -> String {
        match self {
            Self::Inline {
                access_key_id,
                session_token,
                ..
            } => {
                let kind = if session_token.is_some() {
                    "temporary"
                } else {
                    "inline"
                };
                format!("{kind} ({})", redact_access_key(access_key_id))
            }
            Self::Profile { profile_name } => format!("profile ({profile_name})"),
            Self::DefaultChain => "default_chain".to_string(),
        }
    }
}

/// Fully resolved settings for talking to the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub region: String,
    pub credentials: CredentialSource,
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("trop").join("config.json"))
}

/// Load the config file at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> eyre::Result<TropConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(TropConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so the version can be checked before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    if on_disk_version > u64::from(CURRENT_VERSION) {
        return Err(eyre::eyre!(
            "config_version {on_disk_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update trop."
        ));
    }

    let mut config: TropConfig = serde_json::from_value(json)?;
    config.config_version = CURRENT_VERSION;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Merge command-line values over the config file.
///
/// A `--profile` flag replaces whatever credential source the file names.
pub fn resolve(
    config: TropConfig,
    region: Option<String>,
    profile: Option<String>,
) -> eyre::Result<Settings> {
    let region = region.or(config.region).ok_or_else(|| {
        eyre::eyre!("no AWS region configured: pass --region or set AWS_REGION")
    })?;
    let credentials = match profile {
        Some(profile_name) => CredentialSource::Profile { profile_name },
        None => config.credentials,
    };

    tracing::debug!(region = %region, credentials = %credentials.describe(), "resolved settings");
    Ok(Settings {
        region,
        credentials,
    })
}

fn redact_access_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    let prefix = &key[..4];
    let suffix = &key[key.len() - 4..];
    format!("{prefix}...{suffix}")
}
