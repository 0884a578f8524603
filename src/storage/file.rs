use crate::error::StorageError;
use crate::storage::Storage;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const ITEM_SUFFIX: &str = ".item";
/// Short keys are stored under their hex encoding.
const PLAIN_PREFIX: &str = "k_";
/// Keys too long for a hex file name are stored under their SHA-256.
const HASHED_PREFIX: &str = "h_";
/// Longest key (in bytes) that is hex-encoded directly. Keeps every item
/// file name well under the common 255-byte limit.
const MAX_PLAIN_KEY_LEN: usize = 100;

/// Durable storage keeping one file per key under a root directory.
///
/// Any string is a valid key. Short keys are hex-encoded into file names,
/// longer ones are hashed. Writes go to a uniquely named temporary file that
/// is renamed over the target, so a reader never sees a partially written
/// value.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened file storage");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.root.join(item_file_name(key))
    }
}

fn item_file_name(key: &str) -> String {
    if key.len() <= MAX_PLAIN_KEY_LEN {
        format!("{PLAIN_PREFIX}{}{ITEM_SUFFIX}", hex::encode(key))
    } else {
        format!(
            "{HASHED_PREFIX}{}{ITEM_SUFFIX}",
            hex::encode(Sha256::digest(key.as_bytes()))
        )
    }
}

fn is_item_file(name: &str) -> bool {
    name.ends_with(ITEM_SUFFIX) && (name.starts_with(PLAIN_PREFIX) || name.starts_with(HASHED_PREFIX))
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.item_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let tmp = NamedTempFile::new_in(&self.root)?;
        fs::write(tmp.path(), value)?;
        tmp.persist(self.item_path(key)).map_err(|err| err.error)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.item_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_name().to_str().is_some_and(is_item_file) {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}
