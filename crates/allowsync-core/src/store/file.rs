// # File Registry Store
//
// File-based implementation of RegistryStore with crash recovery.
//
// ## Purpose
//
// Keeps the account registry in a JSON document next to the operator's
// other tooling. The first run on a machine creates the document with the
// default label and no accounts, ready to be filled in.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good document
// - Recovery: Falls back to backup if corruption detected
//
// Unlike a cache, the registry cannot be rebuilt from nothing. When both the
// document and its backup are unreadable, loading fails instead of silently
// starting with an empty registry.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "label": "MyDevMachine",
//   "accounts": [
//     {
//       "kind": "document_db",
//       "name": "Analytics",
//       "auth_profile": "analytics",
//       "project_id": "5f1e0c"
//     },
//     {
//       "kind": "firewall",
//       "name": "Bastion",
//       "auth_profile": "prod",
//       "region": "eu-west-1",
//       "security_group_id": "sg-0123"
//     }
//   ]
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::accounts::{Account, Registry};
use crate::traits::RegistryStore;

/// Registry file format version
const REGISTRY_FILE_VERSION: &str = "1.0";

/// Serializable registry file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct RegistryFileFormat {
    version: String,
    label: String,
    #[serde(default)]
    accounts: Vec<Account>,
}

impl From<RegistryFileFormat> for Registry {
    fn from(file: RegistryFileFormat) -> Self {
        Registry {
            label: file.label,
            accounts: file.accounts,
        }
    }
}

/// File-based registry store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use allowsync_core::store::FileRegistryStore;
/// use allowsync_core::traits::RegistryStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRegistryStore::new("allowsync.json").await?;
///
///     // Creates the document on first use
///     let registry = store.load().await?;
///     println!("label: {}", registry.label);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    /// Create a store for the document at `path`
    ///
    /// Parent directories are created if needed. Nothing is read until
    /// [`RegistryStore::load`] is called.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create registry directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self { path })
    }

    /// Path of the registry document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, falling back to the backup on corruption
    ///
    /// Returns `Ok(None)` when neither document nor backup exists.
    async fn load_with_recovery(&self) -> Result<Option<Registry>, Error> {
        let backup_path = Self::backup_path(&self.path);

        match Self::load_document(&self.path).await {
            Ok(Some(registry)) => {
                tracing::debug!(
                    "Loaded registry from {}: {} account(s)",
                    self.path.display(),
                    registry.accounts.len()
                );
                Ok(Some(registry))
            }
            Ok(None) if backup_path.exists() => {
                tracing::warn!(
                    "Registry file {} is missing, recovering from backup",
                    self.path.display()
                );
                self.recover_from_backup(&backup_path).await.map(Some)
            }
            Ok(None) => Ok(None),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Registry file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                if !backup_path.exists() {
                    return Err(Error::registry_store(format!(
                        "Registry file {} is corrupted ({}) and no backup exists",
                        self.path.display(),
                        e
                    )));
                }

                self.recover_from_backup(&backup_path).await.map(Some)
            }
            Err(e) => Err(e),
        }
    }

    async fn recover_from_backup(&self, backup_path: &Path) -> Result<Registry, Error> {
        let registry = match Self::load_document(backup_path).await {
            Ok(Some(registry)) => registry,
            Ok(None) => {
                return Err(Error::registry_store(format!(
                    "Backup {} disappeared during recovery",
                    backup_path.display()
                )));
            }
            Err(e) => {
                tracing::error!("Registry backup also unreadable: {}", e);
                return Err(Error::registry_store(format!(
                    "Registry file {} and its backup are unreadable: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        tracing::info!(
            "Recovered registry from backup: {} account(s)",
            registry.accounts.len()
        );

        if let Err(e) = fs::copy(backup_path, &self.path).await {
            tracing::error!("Failed to restore registry file from backup: {}", e);
        }

        Ok(registry)
    }

    /// Read and parse one document
    ///
    /// Parse failures surface as [`Error::Json`] so callers can tell
    /// corruption apart from I/O errors.
    async fn load_document(path: &Path) -> Result<Option<Registry>, Error> {
        if !path.exists() {
            tracing::debug!("Registry file does not exist: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::registry_store(format!(
                "Failed to read registry file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: RegistryFileFormat = serde_json::from_str(&content)?;

        if file.version != REGISTRY_FILE_VERSION {
            tracing::warn!(
                "Registry file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                REGISTRY_FILE_VERSION,
                file.version
            );
        }

        Ok(Some(file.into()))
    }

    /// Write the document atomically, keeping the previous one as backup
    async fn write_document(&self, registry: &Registry) -> Result<(), Error> {
        let file = RegistryFileFormat {
            version: REGISTRY_FILE_VERSION.to_string(),
            label: registry.label.clone(),
            accounts: registry.accounts.clone(),
        };

        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::registry_store(format!("Failed to serialize registry: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut handle = fs::File::create(&temp_path).await.map_err(|e| {
                Error::registry_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            handle.write_all(json.as_bytes()).await.map_err(|e| {
                Error::registry_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            handle.flush().await.map_err(|e| {
                Error::registry_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create registry backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::registry_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Registry written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl RegistryStore for FileRegistryStore {
    async fn load(&self) -> Result<Registry, Error> {
        if let Some(registry) = self.load_with_recovery().await? {
            return Ok(registry);
        }

        let registry = Registry::default();
        self.write_document(&registry).await?;
        tracing::info!(
            "Created registry {} with label '{}'",
            self.path.display(),
            registry.label
        );
        Ok(registry)
    }

    async fn save(&self, registry: &Registry) -> Result<(), Error> {
        self.write_document(registry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::{DEFAULT_LABEL, DocumentDbAccount, FirewallAccount};
    use tempfile::tempdir;

    fn sample(label: &str) -> Registry {
        Registry::new(label)
            .with_account(DocumentDbAccount {
                name: "Analytics".to_string(),
                auth_profile: "analytics".to_string(),
                project_id: "5f1e0c".to_string(),
            })
            .with_account(FirewallAccount {
                name: "Bastion".to_string(),
                auth_profile: "prod".to_string(),
                region: "eu-west-1".to_string(),
                security_group_id: "sg-0123".to_string(),
            })
    }

    #[tokio::test]
    async fn test_missing_file_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("allowsync.json");

        let store = FileRegistryStore::new(&path).await.unwrap();
        let registry = store.load().await.unwrap();

        assert_eq!(registry.label, DEFAULT_LABEL);
        assert!(registry.is_empty());
        assert!(path.exists());

        let raw = fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["accounts"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("allowsync.json");

        let store = FileRegistryStore::new(&path).await.unwrap();
        store.save(&sample("laptop")).await.unwrap();

        let reopened = FileRegistryStore::new(&path).await.unwrap();
        let registry = reopened.load().await.unwrap();
        assert_eq!(registry, sample("laptop"));
    }

    #[tokio::test]
    async fn test_corruption_recovers_previous_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("allowsync.json");

        let store = FileRegistryStore::new(&path).await.unwrap();
        store.save(&sample("first")).await.unwrap();
        store.save(&sample("second")).await.unwrap();

        let backup_path = FileRegistryStore::backup_path(&path);
        assert!(backup_path.exists(), "Backup file should exist after write");

        fs::write(&path, b"{ not json").await.unwrap();

        let registry = store.load().await.unwrap();
        assert_eq!(registry.label, "first");

        // The main document is restored from the backup
        let again = store.load().await.unwrap();
        assert_eq!(again.label, "first");
    }

    #[tokio::test]
    async fn test_corruption_without_backup_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("allowsync.json");
        fs::write(&path, b"[1, 2").await.unwrap();

        let store = FileRegistryStore::new(&path).await.unwrap();
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::RegistryStore(_)));

        // The corrupt document is left for the operator to inspect
        let raw = fs::read_to_string(&path).await.unwrap();
        assert_eq!(raw, "[1, 2");
    }

    #[tokio::test]
    async fn test_unknown_kind_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("allowsync.json");
        fs::write(
            &path,
            r#"{"version":"1.0","label":"x","accounts":[{"kind":"dns","name":"a"}]}"#,
        )
        .await
        .unwrap();

        let store = FileRegistryStore::new(&path).await.unwrap();
        assert!(store.load().await.is_err());
    }
}
