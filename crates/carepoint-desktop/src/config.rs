use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use carepoint_session::config::SessionConfig;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

/// Default draft storage budget, matching a browser's local storage quota.
pub const DEFAULT_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarepointConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Where drafts and local records are kept.
    pub data_dir: PathBuf,
    pub autosave_debounce_secs: u64,
    pub saved_display_secs: u64,
    /// Added in v1. `None` disables the quota.
    #[serde(default)]
    pub storage_quota_bytes: Option<usize>,
    pub created_at: jiff::Timestamp,
}

impl CarepointConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        let session = SessionConfig::default();
        Self {
            config_version: CURRENT_VERSION,
            data_dir,
            autosave_debounce_secs: session.autosave_debounce.as_secs(),
            saved_display_secs: session.saved_display.as_secs(),
            storage_quota_bytes: Some(DEFAULT_STORAGE_QUOTA_BYTES),
            created_at: jiff::Timestamp::now(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            autosave_debounce: Duration::from_secs(self.autosave_debounce_secs),
            saved_display: Duration::from_secs(self.saved_display_secs),
        }
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.data_dir.join("drafts")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }
}

fn config_dir() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("com.carepoint.desktop"))
}

pub fn config_path() -> eyre::Result<PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn default_data_dir() -> eyre::Result<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| eyre::eyre!("no data directory found"))?;
    Ok(base.join("com.carepoint.desktop"))
}

pub fn has_config() -> bool {
    config_path().map(|p| p.exists()).unwrap_or(false)
}

pub fn load_config() -> eyre::Result<CarepointConfig> {
    load_config_at(&config_path()?)
}

/// Load the config, writing a fresh default one on first run.
pub fn load_or_init() -> eyre::Result<CarepointConfig> {
    if has_config() {
        return load_config();
    }
    let config = CarepointConfig::new(default_data_dir()?);
    save_config(&config)?;
    tracing::info!(data_dir = %config.data_dir.display(), "created default config");
    Ok(config)
}

pub fn load_config_at(path: &Path) -> eyre::Result<CarepointConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: CarepointConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
///
/// Each migration is a pure transform on the raw JSON value.
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update CarePoint."
        ));
    }

    // v0 → v1: add storage_quota_bytes with the default budget
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.entry("storage_quota_bytes")
            .or_insert(serde_json::Value::Number(DEFAULT_STORAGE_QUOTA_BYTES.into()));
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (added storage_quota_bytes)");
    }

    Ok(json)
}

pub fn save_config(config: &CarepointConfig) -> eyre::Result<()> {
    save_config_at(&config_path()?, config)
}

pub fn save_config_at(path: &Path, config: &CarepointConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

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

pub fn delete_config() -> eyre::Result<()> {
    let path = config_path()?;
    if path.exists() {
        std::fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "config deleted");
    }
    Ok(())
}
