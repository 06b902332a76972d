use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StorageError;
use crate::model::Task;

/// Durable home of the task collection. Implementations replace the whole
/// collection on every save and return it in stored order on load.
pub trait TaskRepository: Send {
    /// Load every stored task. A store that does not exist yet yields an empty list.
    fn load_all(&self) -> Result<Vec<Task>, StorageError>;

    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StorageError>;
}

fn decode(document: &str) -> Result<Vec<Task>, StorageError> {
    if document.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(document)?)
}

/// Tasks kept as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TaskRepository for JsonFileRepository {
    fn load_all(&self) -> Result<Vec<Task>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(document) => decode(&document),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(StorageError::io(&self.path, err)),
        }
    }

    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let document = serde_json::to_string_pretty(tasks)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| StorageError::io(parent, err))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, document).map_err(|err| StorageError::io(&temp, err))?;
        fs::rename(&temp, &self.path).map_err(|err| StorageError::io(&self.path, err))?;
        tracing::debug!(path = %self.path.display(), count = tasks.len(), "tasks written");
        Ok(())
    }
}

/// In-process store holding the serialized document. Clones share the same
/// document, so a second store opened on a clone sees what the first saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    document: Arc<Mutex<Option<String>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the repository with a raw document, valid or not.
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Arc::new(Mutex::new(Some(document.into()))),
        }
    }

    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TaskRepository for MemoryRepository {
    fn load_all(&self) -> Result<Vec<Task>, StorageError> {
        match self.document() {
            Some(document) => decode(&document),
            None => Ok(Vec::new()),
        }
    }

    fn save_all(&mut self, tasks: &[Task]) -> Result<(), StorageError> {
        let document = serde_json::to_string(tasks)?;
        *self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(document);
        Ok(())
    }
}

/// Stands in for a store that failed to open. Loads nothing and refuses
/// every write, so the damaged original is never overwritten.
#[derive(Debug, Clone)]
pub struct UnavailableRepository {
    reason: String,
}

impl UnavailableRepository {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TaskRepository for UnavailableRepository {
    fn load_all(&self) -> Result<Vec<Task>, StorageError> {
        Ok(Vec::new())
    }

    fn save_all(&mut self, _tasks: &[Task]) -> Result<(), StorageError> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}
