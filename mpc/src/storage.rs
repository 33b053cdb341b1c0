use std::{
    collections::{HashMap, VecDeque},
    fs::File,
    io::{self, BufReader, BufWriter},
    path::Path,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Stream of multiplication triples.
pub const TRIPLE_STORAGE: &str = "TRIPLE";
/// Stream of random bits.
pub const BIT_STORAGE: &str = "BIT";
/// Stream of exponentiation pipes.
pub const EXP_PIPE_STORAGE: &str = "EXP";
/// Stream of input masks toward some party, suffixed by party ID.
pub const INPUT_STORAGE: &str = "INPUT_";
/// Field modulus.
pub const MODULUS_KEY: &str = "MOD_P";
/// Share of MAC key, suffixed by party ID.
pub const MAC_KEY_SHARE_KEY: &str = "SSK_";

/// Storage key of input masks toward given party.
pub fn input_storage_key(prefix: &str, party_id: usize) -> String {
    format!("{prefix}{INPUT_STORAGE}{party_id}")
}

/// Storage key of MAC key share of given party.
pub fn mac_key_share_key(party_id: usize) -> String {
    format!("{MAC_KEY_SHARE_KEY}{party_id}")
}

/// Error type for preprocessing storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("stream {0} is exhausted")]
    Exhausted(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed storage item: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Append-only, per-key streams of preprocessed items.
pub trait StreamedStorage {
    /// Next unread item of given stream.
    fn get_next(&mut self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Next unread item of given stream, decoded with bincode.
    fn get_next_item<T: DeserializeOwned>(&mut self, key: &str) -> Result<T, StorageError>
    where
        Self: Sized,
    {
        let raw = self.get_next(key)?;
        Ok(bincode::deserialize(&raw)?)
    }
}

/// Streamed storage held in memory, which can be persisted as a single file.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InMemoryStorage {
    streams: HashMap<String, VecDeque<Vec<u8>>>,
}

impl InMemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw item to given stream.
    pub fn append(&mut self, key: &str, item: Vec<u8>) {
        self.streams.entry(key.to_owned()).or_default().push_back(item);
    }

    /// Append item to given stream, encoded with bincode.
    pub fn append_item<T: Serialize>(&mut self, key: &str, item: &T) -> Result<(), StorageError> {
        self.append(key, bincode::serialize(item)?);
        Ok(())
    }

    /// Number of unread items in given stream.
    pub fn remaining(&self, key: &str) -> usize {
        self.streams.get(key).map_or(0, |stream| stream.len())
    }

    /// Load storage from file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Save storage to file.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(bincode::serialize_into(writer, self)?)
    }
}

impl StreamedStorage for InMemoryStorage {
    fn get_next(&mut self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.streams
            .get_mut(key)
            .and_then(|stream| stream.pop_front())
            .ok_or_else(|| StorageError::Exhausted(key.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_are_fifo() {
        let mut storage = InMemoryStorage::new();
        storage.append_item(TRIPLE_STORAGE, &1u32).unwrap();
        storage.append_item(TRIPLE_STORAGE, &2u32).unwrap();
        storage.append_item(BIT_STORAGE, &3u32).unwrap();

        assert_eq!(storage.get_next_item::<u32>(TRIPLE_STORAGE).unwrap(), 1);
        assert_eq!(storage.get_next_item::<u32>(BIT_STORAGE).unwrap(), 3);
        assert_eq!(storage.get_next_item::<u32>(TRIPLE_STORAGE).unwrap(), 2);
        assert!(matches!(
            storage.get_next(TRIPLE_STORAGE),
            Err(StorageError::Exhausted(key)) if key == TRIPLE_STORAGE
        ));
        assert!(matches!(
            storage.get_next("unknown"),
            Err(StorageError::Exhausted(_))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let mut storage = InMemoryStorage::new();
        storage.append(&input_storage_key("run1_", 2), vec![1, 2, 3]);

        let path = std::env::temp_dir().join(format!("mpc-storage-{}.bin", std::process::id()));
        storage.save_file(&path).unwrap();
        let mut loaded = InMemoryStorage::load_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.remaining("run1_INPUT_2"), 1);
        assert_eq!(loaded.get_next("run1_INPUT_2").unwrap(), vec![1, 2, 3]);
    }
}
