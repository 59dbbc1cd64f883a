//! File-backed persistence for API definitions and policies

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, info, warn};

use super::reload::DefinitionSource;
use crate::domain::{ApiDefinition, DomainError, Policy};

const OAS_SUFFIX: &str = "-oas";

/// How an existing definition file is replaced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Remove the old file, then write the new one; a crash in between
    /// loses the definition
    #[default]
    DeleteThenWrite,
    /// Write a temporary file and rename it over the old one
    TempThenRename,
}

/// Definitions stored as one pretty-printed JSON file per entity
#[derive(Debug, Clone)]
pub struct DefinitionStore {
    app_path: PathBuf,
    policy_path: PathBuf,
    mode: WriteMode,
}

impl DefinitionStore {
    pub fn new(app_path: impl Into<PathBuf>, policy_path: impl Into<PathBuf>) -> Self {
        Self {
            app_path: app_path.into(),
            policy_path: policy_path.into(),
            mode: WriteMode::default(),
        }
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn write_mode(&self) -> WriteMode {
        self.mode
    }

    fn api_file(&self, api_id: &str) -> PathBuf {
        self.app_path.join(format!("{}.json", api_id))
    }

    fn oas_file(&self, api_id: &str) -> PathBuf {
        self.app_path.join(format!("{}{}.json", api_id, OAS_SUFFIX))
    }

    fn policy_file(&self, policy_id: &str) -> PathBuf {
        self.policy_path.join(format!("{}.json", policy_id))
    }

    async fn read_dir<T: DeserializeOwned>(
        dir: &Path,
        skip_oas: bool,
    ) -> Result<Vec<(String, T)>, DomainError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %dir.display(), "Definition directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Failed to read {}: {}",
                    dir.display(),
                    e
                )))
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list {}: {}", dir.display(), e)))?
        {
            let path = entry.path();
            let Some(stem) = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.strip_suffix(".json"))
                .map(str::to_string)
            else {
                continue;
            };

            if skip_oas && stem.ends_with(OAS_SUFFIX) {
                continue;
            }
            paths.push((stem, path));
        }
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for (stem, path) in paths {
            let contents = match fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable definition");
                    continue;
                }
            };

            match serde_json::from_str::<T>(&contents) {
                Ok(value) => loaded.push((stem, value)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unparsable definition");
                }
            }
        }

        Ok(loaded)
    }

    async fn write_file<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), DomainError> {
        let contents = serde_json::to_string_pretty(value)
            .map_err(|e| DomainError::encoding(format!("Marshalling failed: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::storage(format!("Failed to create file! - {}", e)))?;
        }

        match self.mode {
            WriteMode::DeleteThenWrite => {
                if fs::try_exists(path).await.unwrap_or(false) {
                    fs::remove_file(path).await.map_err(|e| {
                        DomainError::storage(format!("Failed to remove old file! - {}", e))
                    })?;
                }
                fs::write(path, contents)
                    .await
                    .map_err(|e| DomainError::storage(format!("Failed to create file! - {}", e)))?;
            }
            WriteMode::TempThenRename => {
                let temp = path.with_extension("json.tmp");
                fs::write(&temp, contents)
                    .await
                    .map_err(|e| DomainError::storage(format!("Failed to create file! - {}", e)))?;
                fs::rename(&temp, path)
                    .await
                    .map_err(|e| DomainError::storage(format!("Failed to create file! - {}", e)))?;
            }
        }

        debug!(path = %path.display(), "Definition written");
        Ok(())
    }

    async fn remove_file(path: &Path) -> Result<(), DomainError> {
        fs::remove_file(path).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "Delete failed");
            DomainError::storage("Delete failed")
        })
    }

    pub async fn write_api(&self, api: &ApiDefinition) -> Result<(), DomainError> {
        self.write_file(&self.api_file(&api.api_id), api).await?;
        info!(api_id = %api.api_id, "API definition saved");
        Ok(())
    }

    pub async fn write_api_oas(&self, api_id: &str, document: &Value) -> Result<(), DomainError> {
        self.write_file(&self.oas_file(api_id), document).await
    }

    /// The stored OAS companion of an API, if one exists and parses
    pub async fn read_api_oas(&self, api_id: &str) -> Result<Option<Value>, DomainError> {
        let path = self.oas_file(api_id);

        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents).ok()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub async fn write_policy(&self, policy: &Policy) -> Result<(), DomainError> {
        self.write_file(&self.policy_file(&policy.id), policy).await?;
        info!(policy_id = %policy.id, "Policy saved");
        Ok(())
    }

    /// Remove an API and its OAS companion
    pub async fn delete_api(&self, api_id: &str) -> Result<(), DomainError> {
        Self::remove_file(&self.api_file(api_id)).await?;

        let oas = self.oas_file(api_id);
        if fs::try_exists(&oas).await.unwrap_or(false) {
            Self::remove_file(&oas).await?;
        }

        info!(api_id = %api_id, "API definition deleted");
        Ok(())
    }

    pub async fn delete_policy(&self, policy_id: &str) -> Result<(), DomainError> {
        Self::remove_file(&self.policy_file(policy_id)).await?;
        info!(policy_id = %policy_id, "Policy deleted");
        Ok(())
    }
}

#[async_trait]
impl DefinitionSource for DefinitionStore {
    async fn load_apis(&self) -> Result<Vec<ApiDefinition>, DomainError> {
        let loaded: Vec<(String, ApiDefinition)> = Self::read_dir(&self.app_path, true).await?;

        Ok(loaded
            .into_iter()
            .filter_map(|(stem, api)| {
                if api.api_id.is_empty() {
                    warn!(file = %stem, "Skipping API definition without api_id");
                    None
                } else {
                    Some(api)
                }
            })
            .collect())
    }

    async fn load_policies(&self) -> Result<Vec<Policy>, DomainError> {
        let loaded: Vec<(String, Policy)> = Self::read_dir(&self.policy_path, false).await?;

        Ok(loaded
            .into_iter()
            .map(|(stem, mut policy)| {
                // Policies written by hand may rely on the file name for their ID
                if policy.id.is_empty() {
                    policy.id = stem;
                }
                policy
            })
            .collect())
    }
}
