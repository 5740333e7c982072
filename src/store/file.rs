use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind::{AlreadyExists, NotFound};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::store::memory::{MemoryStore, State};
use crate::store::{Document, DocumentStore, Filter, StoreError};

const LOCK_ATTEMPTS: u32 = 200;
const LOCK_RETRY_DELAY: Duration = Duration::from_millis(25);

/// `data.json` -> `data.json.lock`, next to the data file.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("data"), |name| name.to_os_string());
    name.push(suffix);
    path.with_file_name(name)
}

fn load(path: &Path) -> Result<State, StoreError> {
    match fs::read_to_string(path) {
        Ok(data) if data.trim().is_empty() => Ok(State::default()),
        Ok(data) => Ok(serde_json::from_str(&data)?),
        Err(error) if error.kind() == NotFound => Ok(State::default()),
        Err(error) => Err(error.into()),
    }
}

/// Exclusive lock on the data file, held as a `.lock` file created next to it and removed on drop.
struct FileLock {
    path: PathBuf,
}

impl FileLock {
    fn acquire(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        for _ in 0..LOCK_ATTEMPTS {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(error) if error.kind() == AlreadyExists => thread::sleep(LOCK_RETRY_DELAY),
                Err(error) => return Err(error.into()),
            }
        }

        Err(StoreError::Locked(path))
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!("Couldn't remove lock file {}: {error}", self.path.display());
        }
    }
}

/// A JSON file holding every collection.
///
/// Every call reloads the file. Writes hold the lock file from reload to rename, so writers
/// in other processes are serialized and readers only ever see a complete file.
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Nothing is created on disk until the first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let state = load(&path)?;

        debug!("Opened data file {}", path.display());

        Ok(Self {
            path,
            inner: MemoryStore::from_state(state),
        })
    }

    fn refresh(&self) -> Result<&MemoryStore, StoreError> {
        self.inner.replace_state(load(&self.path)?);
        Ok(&self.inner)
    }

    fn flush(&self) -> Result<(), StoreError> {
        let tmp = sibling(&self.path, ".tmp");
        fs::write(&tmp, self.inner.to_json()? + "\n")?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn write<T>(&self, change: impl FnOnce(&MemoryStore) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _lock = FileLock::acquire(sibling(&self.path, ".lock"))?;
        let value = change(self.refresh()?)?;
        self.flush()?;
        Ok(value)
    }
}

impl DocumentStore for FileStore {
    fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.refresh()?.find_one(collection, filter)
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.refresh()?.find(collection, filter)
    }

    fn insert(&self, collection: &str, record: Document) -> Result<Document, StoreError> {
        self.write(|store| store.insert(collection, record))
    }

    fn update_one(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError> {
        self.write(|store| store.update_one(collection, filter, patch))
    }

    fn update_many(&self, collection: &str, filter: &Filter, patch: &Document) -> Result<usize, StoreError> {
        self.write(|store| store.update_many(collection, filter, patch))
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> Result<usize, StoreError> {
        self.write(|store| store.delete_one(collection, filter))
    }

    fn ensure_unique_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        if self.refresh()?.has_unique_index(collection, field) {
            return Ok(());
        }

        self.write(|store| store.add_unique_index(collection, field).map(|_| ()))
    }
}
