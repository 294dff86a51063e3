use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
pub const CURRENT_VERSION: u32 = 1;

pub const API_KEY_ENV: &str = "BONSAI_API_KEY";
pub const API_TOKEN_ENV: &str = "BONSAI_API_TOKEN";

const DEFAULT_TIMEOUT_SECS: u64 = 5 * 60;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
/// One day. Anything longer is a misconfiguration, not a wait.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Everything the provisioner needs from the outside world, passed in
/// explicitly rather than read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    pub credentials: ApiCredentials,
    /// Override for the control-plane base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Added in v1; older configs get the defaults via [`migrate`].
    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_token: String,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &redact_key(&self.api_key))
            .field("api_token", &"<redacted>")
            .finish()
    }
}

impl ApiCredentials {
    pub fn new(
        api_key: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let creds = Self {
            api_key: api_key.into(),
            api_token: api_token.into(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Read `BONSAI_API_KEY` / `BONSAI_API_TOKEN`. Meant for binaries at the
    /// edge; the engine only ever sees the resulting value.
    pub fn from_env() -> Result<Self, CoreError> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        let api_token = std::env::var(API_TOKEN_ENV).unwrap_or_default();
        Self::new(api_key, api_token)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.api_key.trim().is_empty() {
            return Err(CoreError::MissingCredential("api_key"));
        }
        if self.api_token.trim().is_empty() {
            return Err(CoreError::MissingCredential("api_token"));
        }
        Ok(())
    }
}

/// Bounds on how long a single create/update/delete may wait for the
/// control plane to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSettings {
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// Optional cap on fetches per operation, on top of the timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_attempts: None,
        }
    }
}

impl ReconcileSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.timeout_secs == 0 {
            return Err(CoreError::InvalidConfig("reconcile.timeout_secs must be > 0".into()));
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(CoreError::InvalidConfig(format!(
                "reconcile.timeout_secs must be <= {MAX_TIMEOUT_SECS}"
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "reconcile.poll_interval_secs must be > 0".into(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(CoreError::InvalidConfig(
                "reconcile.max_attempts must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Redacted config info safe to log or display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub config_version: u32,
    pub endpoint: Option<String>,
    pub api_key_hint: String,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub max_attempts: Option<u32>,
}

pub fn load_config(path: &Path) -> Result<ProviderConfig, CoreError> {
    let contents = std::fs::read_to_string(path)?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    let on_disk_version = u32::try_from(on_disk_version).unwrap_or(u32::MAX);

    let migrated = migrate(json, on_disk_version)?;
    let config: ProviderConfig = serde_json::from_value(migrated)?;
    config.credentials.validate()?;
    config.reconcile.validate()?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
pub fn migrate(
    mut json: serde_json::Value,
    from_version: u32,
) -> Result<serde_json::Value, CoreError> {
    if from_version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedConfigVersion {
            found: from_version,
            supported: CURRENT_VERSION,
        });
    }

    // v0 → v1: add the reconcile block with default timeout and interval
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| CoreError::InvalidConfig("config is not a JSON object".into()))?;
        if !obj.contains_key("reconcile") {
            obj.insert(
                "reconcile".to_string(),
                serde_json::to_value(ReconcileSettings::default())?,
            );
        }
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added reconcile settings)");
    }

    Ok(json)
}

pub fn save_config(path: &Path, config: &ProviderConfig) -> Result<(), CoreError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // Set restrictive permissions on Unix before renaming
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

pub fn config_info(config: &ProviderConfig) -> ConfigInfo {
    ConfigInfo {
        config_version: config.config_version,
        endpoint: config.endpoint.clone(),
        api_key_hint: redact_key(&config.credentials.api_key),
        timeout_secs: config.reconcile.timeout_secs,
        poll_interval_secs: config.reconcile.poll_interval_secs,
        max_attempts: config.reconcile.max_attempts,
    }
}

fn redact_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
