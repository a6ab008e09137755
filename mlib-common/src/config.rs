//! Configuration loading and root folder resolution
//!
//! The root folder holds everything the service owns: the database, the
//! upload folders and the `mlib.toml` service settings file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "MLIB_ROOT_FOLDER";

/// Service settings file name inside the root folder
pub const SERVICE_CONFIG_FILE: &str = "mlib.toml";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "mlib.db";

/// Service settings loaded from `<root>/mlib.toml`
///
/// Every field has a default so a missing or partial file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Shared passphrase unlocking the private zone for a session
    pub private_passphrase: String,
    pub session_ttl_minutes: u64,
    /// Days an item stays in the trash before the purge removes it
    pub trash_retention_days: i64,
    pub max_upload_bytes: usize,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
            private_passphrase: String::new(),
            session_ttl_minutes: 720,
            trash_retention_days: 5,
            max_upload_bytes: 512 * 1024 * 1024,
            bcrypt_cost: 12,
        }
    }
}

impl ServiceConfig {
    /// Load `<root>/mlib.toml`, falling back to defaults when the file is absent
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(SERVICE_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// True when a passphrase is configured; an empty one never unlocks
    pub fn private_zone_enabled(&self) -> bool {
        !self.private_passphrase.is_empty()
    }
}

/// On-disk layout derived from the root folder
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn private_uploads_dir(&self) -> PathBuf {
        self.uploads_dir().join("private")
    }

    /// Upload folder for an item with the given privacy flag
    pub fn upload_dir_for(&self, is_private: bool) -> PathBuf {
        if is_private {
            self.private_uploads_dir()
        } else {
            self.uploads_dir()
        }
    }

    /// Create the root and upload folders if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(self.private_uploads_dir())?;
        Ok(())
    }
}

/// Root folder resolution, in priority order:
/// 1. Command-line argument
/// 2. `MLIB_ROOT_FOLDER` environment variable
/// 3. `root_folder` key of the user/system config file
/// 4. OS-dependent default
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root) = find_config_file().and_then(|p| root_folder_from_file(&p)) {
        return root;
    }

    default_root_folder()
}

/// Read the `root_folder` key from a config file, if present and valid
fn root_folder_from_file(path: &Path) -> Option<PathBuf> {
    let content = std::fs::read_to_string(path).ok()?;
    root_folder_from_toml(&content)
}

fn root_folder_from_toml(content: &str) -> Option<PathBuf> {
    let config = toml::from_str::<toml::Value>(content).ok()?;
    config
        .get("root_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
}

/// Locate the config file: `~/.config/mlib/config.toml`, then `/etc/mlib/config.toml`
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mlib").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mlib/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/mlib (or /var/lib/mlib for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("mlib"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/mlib"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("mlib"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/mlib"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("mlib"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\mlib"))
    } else {
        PathBuf::from("./mlib_data")
    }
}
