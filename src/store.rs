//! Durable key-value storage for session persistence.
//!
//! The session store persists through a [`DurableStore`]: process-wide
//! string-keyed storage that survives restarts and offers no transactions.
//! [`FileStore`] keeps the whole map in a single JSON file, rewriting it
//! on every put; [`MemoryStore`] is ephemeral and useful for tests and
//! throwaway sessions.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};
use crate::observability::STORE_WRITES;

/// Process-wide persistent string-keyed storage.
///
/// Each key is written independently; a crash between two puts can leave
/// the entries mutually inconsistent, and callers must repair on read.
pub trait DurableStore {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` under `key`, replacing any previous value.
    fn put(&mut self, key: &str, value: &str) -> Result<()>;
}

/// An in-memory store that forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        STORE_WRITES.click();
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A store backed by a single JSON object file.
///
/// The file is read once at open; every put rewrites the whole file. There
/// is no partial-write protection beyond writing through a buffered writer,
/// matching the no-transaction contract of [`DurableStore`].
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens a file-backed store, creating an empty one if the file does
    /// not exist yet. A file that fails to parse is treated as empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match File::open(&path) {
            Ok(file) => {
                let reader = BufReader::new(file);
                from_reader(reader).unwrap_or_default()
            }
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(Error::io("failed to open store file", err)),
        };
        Ok(Self { path, entries })
    }

    /// Returns the path backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let file = File::create(&self.path)
            .map_err(|err| Error::io("failed to create store file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &self.entries)
            .map_err(|err| Error::serialization("failed to serialize store", Some(Box::new(err))))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<()> {
        STORE_WRITES.click();
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
