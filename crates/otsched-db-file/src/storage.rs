use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use otsched_core::RosterState;
use otsched_storage::{RosterPersistence, StorageError};
use tokio::fs;
use tracing::{debug, warn};

/// Roster persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write_atomic(&self, content: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, content).await?;

        let sync_path = tmp_path.clone();
        match tokio::task::spawn_blocking(move || {
            std::fs::File::open(&sync_path).and_then(|file| file.sync_all())
        })
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to sync roster temp file"),
            Err(e) => warn!(error = %e, "Roster sync task failed"),
        }

        fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), "Roster written");
        Ok(())
    }
}

#[async_trait]
impl RosterPersistence for JsonFilePersistence {
    async fn get(&self) -> Result<Option<RosterState>, StorageError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::corrupt(format!("{}: {e}", self.path.display())))
    }

    async fn put(&self, roster: &RosterState) -> Result<(), StorageError> {
        let content = serde_json::to_vec_pretty(roster)?;
        self.write_atomic(&content).await
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otsched_core::{Doctor, DoctorStatus, OperatingTheatre};

    fn roster() -> RosterState {
        RosterState::new(
            vec![
                Doctor::new(1, "Dr. Smith", "Cardiology"),
                Doctor::new(2, "Dr. Brown", "Oncology").with_status(DoctorStatus::OnCall),
            ],
            vec![
                OperatingTheatre::new(1, "OT-1", false),
                OperatingTheatre::new(2, "OT-2", true),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFilePersistence::new(dir.path().join("roster.json"));
        assert_eq!(storage.get().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("roster.json");
        let storage = JsonFilePersistence::new(&path);

        storage.put(&roster()).await.unwrap();

        assert_eq!(storage.get().await.unwrap(), Some(roster()));
        assert!(!storage.tmp_path().exists());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["doctors"][1]["status"], "on-call");
        assert_eq!(raw["ots"][1]["isEmergencyDedicated"], true);
    }

    #[tokio::test]
    async fn test_put_replaces_previous_roster() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFilePersistence::new(dir.path().join("roster.json"));

        storage.put(&roster()).await.unwrap();
        let mut next = roster();
        next.doctors.pop();
        storage.put(&next).await.unwrap();

        assert_eq!(storage.get().await.unwrap(), Some(next));
    }

    #[tokio::test]
    async fn test_unparseable_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFilePersistence::new(&path).get().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn test_tmp_path_is_sibling() {
        let storage = JsonFilePersistence::new("/var/lib/otsched/roster.json");
        assert_eq!(
            storage.tmp_path(),
            PathBuf::from("/var/lib/otsched/roster.json.tmp")
        );
    }
}
