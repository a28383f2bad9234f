use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::{BotError, BotResult};
use crate::models::participants::ParticipantList;

/// A change to the participant list. Returns whether anything changed.
pub type ListEdit = Box<dyn FnOnce(&mut ParticipantList) -> bool + Send>;

/// Result of [`ParticipantStore::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListUpdate {
    pub list: ParticipantList,
    pub changed: bool,
}

/// Where the participant list lives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Read the list. `Ok(None)` means it has never been written.
    async fn load(&self) -> BotResult<Option<ParticipantList>>;

    /// Replace the stored list.
    async fn save(&self, list: &ParticipantList) -> BotResult<()>;

    /// Load, edit and save the list as one step. A missing or unreadable list
    /// is reset to an empty one on disk before `edit` sees it.
    async fn update(&self, edit: ListEdit) -> BotResult<ListUpdate>;
}

/// Load the list for a read-only command, turning a missing or empty list
/// into the message the command replies with.
pub async fn load_non_empty<S: ParticipantStore + ?Sized>(
    store: &S,
    missing_message: &str,
    empty_message: &str,
) -> BotResult<ParticipantList> {
    let list = match store.load().await {
        Ok(Some(list)) => list,
        Ok(None) => return Err(BotError::NotFound(missing_message.to_string())),
        Err(BotError::Json(_)) => return Err(BotError::Validation(empty_message.to_string())),
        Err(e) => return Err(e),
    };

    if list.is_empty() {
        return Err(BotError::Validation(empty_message.to_string()));
    }

    Ok(list)
}

/// A flat JSON file, overwritten wholesale on every save.
pub struct JsonFileStore {
    path: PathBuf,
    // Held for the whole of each load, save and update.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JsonFileStore {
    async fn read(&self) -> BotResult<Option<ParticipantList>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let list: ParticipantList = serde_json::from_slice(&bytes)?;
        debug!("Loaded {} participants from {}", list.len(), self.path.display());
        Ok(Some(list))
    }

    async fn write(&self, list: &ParticipantList) -> BotResult<()> {
        let bytes = list.to_pretty_json()?;
        tokio::fs::write(&self.path, bytes).await?;
        debug!("Saved {} participants to {}", list.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ParticipantStore for JsonFileStore {
    async fn load(&self) -> BotResult<Option<ParticipantList>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn save(&self, list: &ParticipantList) -> BotResult<()> {
        let _guard = self.lock.lock().await;
        self.write(list).await
    }

    async fn update(&self, edit: ListEdit) -> BotResult<ListUpdate> {
        let _guard = self.lock.lock().await;

        let (mut list, reset) = match self.read().await {
            Ok(Some(list)) => (list, false),
            Ok(None) => (ParticipantList::new(), true),
            Err(BotError::Json(e)) => {
                warn!("Participant list is corrupt, resetting it: {}", e);
                (ParticipantList::new(), true)
            }
            Err(e) => return Err(e),
        };

        let changed = edit(&mut list);
        if changed || reset {
            self.write(&list).await?;
        }
        Ok(ListUpdate { list, changed })
    }
}
