//! Sync group repository trait for storage abstraction.

use async_trait::async_trait;
use dashmap::DashMap;
use paramsync_types::{SyncError, SyncGroup};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RepositoryError> for SyncError {
    fn from(e: RepositoryError) -> Self {
        SyncError::Repository { message: e.to_string() }
    }
}

/// Durable storage for group definitions.
#[async_trait]
pub trait SyncGroupRepository: Send + Sync {
    /// Insert or replace a group by id.
    async fn save_group(&self, group: &SyncGroup) -> RepoResult<()>;
    async fn get_group(&self, id: &str) -> RepoResult<Option<SyncGroup>>;
    async fn list_groups(&self) -> RepoResult<Vec<SyncGroup>>;
    /// Returns whether a group was removed.
    async fn delete_group(&self, id: &str) -> RepoResult<bool>;
}

/// Process-local repository.
#[derive(Default)]
pub struct InMemorySyncGroupRepository {
    groups: DashMap<String, SyncGroup>,
}

impl InMemorySyncGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncGroupRepository for InMemorySyncGroupRepository {
    async fn save_group(&self, group: &SyncGroup) -> RepoResult<()> {
        self.groups.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn get_group(&self, id: &str) -> RepoResult<Option<SyncGroup>> {
        Ok(self.groups.get(id).map(|g| g.clone()))
    }

    async fn list_groups(&self) -> RepoResult<Vec<SyncGroup>> {
        let mut groups: Vec<SyncGroup> = self.groups.iter().map(|g| g.value().clone()).collect();
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(groups)
    }

    async fn delete_group(&self, id: &str) -> RepoResult<bool> {
        Ok(self.groups.remove(id).is_some())
    }
}

/// Stores every group in one pretty-printed JSON array.
///
/// Writes go to a temp file that is renamed over the original, so a crash
/// mid-write leaves the previous file intact.
pub struct JsonFileRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> RepoResult<Vec<SyncGroup>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| RepositoryError::Serialization(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RepositoryError::Storage(e.to_string())),
        }
    }

    async fn write_all(&self, groups: &mut [SyncGroup]) -> RepoResult<()> {
        groups.sort_by(|a, b| a.id.cmp(&b.id));
        let content = serde_json::to_string_pretty(groups)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RepositoryError::Storage(e.to_string()))?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    }
}

#[async_trait]
impl SyncGroupRepository for JsonFileRepository {
    async fn save_group(&self, group: &SyncGroup) -> RepoResult<()> {
        let _guard = self.lock.lock().await;
        let mut groups = self.read_all().await?;
        match groups.iter_mut().find(|g| g.id == group.id) {
            Some(existing) => *existing = group.clone(),
            None => groups.push(group.clone()),
        }
        self.write_all(&mut groups).await
    }

    async fn get_group(&self, id: &str) -> RepoResult<Option<SyncGroup>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.into_iter().find(|g| g.id == id))
    }

    async fn list_groups(&self) -> RepoResult<Vec<SyncGroup>> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    async fn delete_group(&self, id: &str) -> RepoResult<bool> {
        let _guard = self.lock.lock().await;
        let mut groups = self.read_all().await?;
        let before = groups.len();
        groups.retain(|g| g.id != id);
        if groups.len() == before {
            return Ok(false);
        }
        self.write_all(&mut groups).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use paramsync_types::SyncMode;

    async fn exercise(repo: &dyn SyncGroupRepository) {
        let group = SyncGroup::new("dates", ["from", "to"], SyncMode::Bidirectional).with_id("g1");
        repo.save_group(&group).await.unwrap();
        assert_eq!(repo.get_group("g1").await.unwrap(), Some(group.clone()));

        let renamed = SyncGroup { name: "periods".into(), ..group };
        repo.save_group(&renamed).await.unwrap();
        let all = repo.list_groups().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "periods");

        assert!(repo.delete_group("g1").await.unwrap());
        assert!(!repo.delete_group("g1").await.unwrap());
        assert_eq!(repo.get_group("g1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_repository() {
        exercise(&InMemorySyncGroupRepository::new()).await;
    }

    #[tokio::test]
    async fn test_json_file_repository() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("groups.json"));
        exercise(&repo).await;
        assert!(!dir.path().join("groups.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_json_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.json");
        let group = SyncGroup::new("regions", ["a", "b", "c"], SyncMode::Broadcast).with_id("g2");
        JsonFileRepository::new(&path).save_group(&group).await.unwrap();

        let reopened = JsonFileRepository::new(&path);
        assert_eq!(reopened.list_groups().await.unwrap(), vec![group]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groups.json");
        std::fs::write(&path, "[{").unwrap();
        let err = JsonFileRepository::new(&path).list_groups().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
        let sync_err: SyncError = err.into();
        assert!(matches!(sync_err, SyncError::Repository { .. }));
    }
}
