//! Durable storage for the schedule state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ScheduleState, SchedulerError};

/// Backing medium for the schedule state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state, `None` if nothing was ever stored.
    async fn load(&self) -> Result<Option<ScheduleState>, SchedulerError>;

    /// Overwrite the persisted state.
    async fn save(&self, state: &ScheduleState) -> Result<(), SchedulerError>;
}

/// Schedule state stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<Option<ScheduleState>, SchedulerError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let state: ScheduleState = serde_json::from_str(&content)?;
        state.validate()?;
        Ok(Some(state))
    }

    async fn save(&self, state: &ScheduleState) -> Result<(), SchedulerError> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(state)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = file.metadata().await?.permissions();
            perms.set_mode(0o600);
            file.set_permissions(perms).await?;
        }

        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), next_fire = %state.next_fire_time, "schedule stored");
        Ok(())
    }
}

/// In-process state store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Option<ScheduleState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state`.
    pub fn with_state(state: ScheduleState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
        }
    }

    /// Current contents, without going through the trait.
    pub async fn snapshot(&self) -> Option<ScheduleState> {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<Option<ScheduleState>, SchedulerError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &ScheduleState) -> Result<(), SchedulerError> {
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }
}
