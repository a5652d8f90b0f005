//! The ordered key-value store a world lives in, and decoding on top of it.

use crate::keys::{chunk_coordinates, ContentType};
use crate::record::Record;
use lodestone_common::{ChunkCoords, CodecOptions, Result};
use std::collections::BTreeMap;
use tracing::debug;

pub type Entry = (Vec<u8>, Vec<u8>);

/// Read access to a world database. Iteration is in ascending key order.
pub trait WorldStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn entries(&self) -> Box<dyn Iterator<Item = Result<Entry>> + '_>;

    fn keys(&self) -> Box<dyn Iterator<Item = Result<Vec<u8>>> + '_> {
        Box::new(self.entries().map(|entry| entry.map(|(key, _)| key)))
    }
}

/// A store held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WorldStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn entries(&self) -> Box<dyn Iterator<Item = Result<Entry>> + '_> {
        Box::new(
            self.entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), value.clone()))),
        )
    }

    fn keys(&self) -> Box<dyn Iterator<Item = Result<Vec<u8>>> + '_> {
        Box::new(self.entries.keys().cloned().map(Ok))
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = MemoryStore::new();
        for (key, value) in iter {
            store.put(key, value);
        }
        store
    }
}

/// A record together with what its key says about it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEntry {
    pub key: Vec<u8>,
    pub content_type: ContentType,
    pub coords: Option<ChunkCoords>,
    pub record: Record,
}

/// Classifies `key` and decodes `value` with the matching format. Failures
/// carry the key.
pub fn decode_entry(key: &[u8], value: &[u8], options: &CodecOptions) -> Result<DecodedEntry> {
    let content_type = ContentType::classify(key);
    debug!(
        content_type = content_type.name(),
        len = value.len(),
        "decoding record"
    );
    let record = content_type
        .format()
        .decode(value, options)
        .map_err(|err| err.in_record(key))?;
    let coords = if content_type.is_chunk_scoped() {
        chunk_coordinates(key)
    } else {
        None
    };
    Ok(DecodedEntry {
        key: key.to_vec(),
        content_type,
        coords,
        record,
    })
}

/// Encodes a record for the given key. Failures carry the key.
pub fn encode_entry(key: &[u8], record: &Record, options: &CodecOptions) -> Result<Vec<u8>> {
    ContentType::classify(key)
        .format()
        .encode(record, options)
        .map_err(|err| err.in_record(key))
}

/// Looks up and decodes one record.
pub fn read_record<S: WorldStore + ?Sized>(
    store: &S,
    key: &[u8],
    options: &CodecOptions,
) -> Result<Option<DecodedEntry>> {
    match store.get(key)? {
        Some(value) => decode_entry(key, &value, options).map(Some),
        None => Ok(None),
    }
}

/// Lazily decodes every record of one content type, in key order. Each item
/// fails on its own so a caller can skip bad records and keep going.
pub fn records_of_type<'a, S: WorldStore + ?Sized>(
    store: &'a S,
    content_type: ContentType,
    options: &'a CodecOptions,
) -> impl Iterator<Item = Result<DecodedEntry>> + 'a {
    store.entries().filter_map(move |entry| match entry {
        Ok((key, value)) => (ContentType::classify(&key) == content_type)
            .then(|| decode_entry(&key, &value, options)),
        Err(err) => Some(Err(err)),
    })
}
