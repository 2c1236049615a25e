use crate::error::StoreError;
use crate::notifications::NotificationRecord;
use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Durable key-value adapter for the notification log. `load` never fails:
/// an absent or unparsable value is a cold start, not an error.
pub trait NotificationStore {
    fn load(&self) -> Vec<NotificationRecord>;

    fn save(&self, records: &[NotificationRecord]) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

impl<S: NotificationStore + ?Sized> NotificationStore for Rc<S> {
    fn load(&self) -> Vec<NotificationRecord> {
        (**self).load()
    }

    fn save(&self, records: &[NotificationRecord]) -> Result<(), StoreError> {
        (**self).save(records)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

impl<S: NotificationStore + ?Sized> NotificationStore for Box<S> {
    fn load(&self) -> Vec<NotificationRecord> {
        (**self).load()
    }

    fn save(&self, records: &[NotificationRecord]) -> Result<(), StoreError> {
        (**self).save(records)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// One JSON document on disk holding the serialized record array.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationStore for FileStore {
    fn load(&self) -> Vec<NotificationRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("no persisted notifications at {}", self.path.display());
                return Vec::new();
            }
            Err(err) => {
                log::warn!("notification store unreadable, starting empty: {err}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                log::warn!("notification store corrupt, starting empty: {err}");
                Vec::new()
            }
        }
    }

    fn save(&self, records: &[NotificationRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return self.clear();
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        let encoded =
            serde_json::to_vec(records).map_err(|e| StoreError::Encode(e.to_string()))?;
        fs::write(&self.path, encoded).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err.to_string())),
        }
    }
}

/// In-memory store with the same absent-key semantics as `FileStore`.
#[derive(Default)]
pub struct MemoryStore {
    records: RefCell<Option<Vec<NotificationRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(records: Vec<NotificationRecord>) -> Self {
        Self { records: RefCell::new(Some(records)) }
    }

    /// `None` means the key is absent, as opposed to holding an empty array.
    pub fn persisted(&self) -> Option<Vec<NotificationRecord>> {
        self.records.borrow().clone()
    }
}

impl NotificationStore for MemoryStore {
    fn load(&self) -> Vec<NotificationRecord> {
        self.records.borrow().clone().unwrap_or_default()
    }

    fn save(&self, records: &[NotificationRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return self.clear();
        }
        *self.records.borrow_mut() = Some(records.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.records.borrow_mut() = None;
        Ok(())
    }
}
