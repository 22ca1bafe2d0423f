use std::io::{self, ErrorKind};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::ports::BlobStore;
use crate::records::{BudgetSnapshotRecord, SubscriptionRecord};

/// Typed view over a blob store holding one [`SubscriptionRecord`] per key.
#[derive(Clone)]
pub struct SubscriptionStore {
    inner: Arc<dyn BlobStore>,
}

impl SubscriptionStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self { inner }
    }

    pub fn get(&self, key: &str) -> io::Result<Option<SubscriptionRecord>> {
        read_record(self.inner.as_ref(), key)
    }

    pub fn set(&self, key: &str, record: &SubscriptionRecord) -> io::Result<()> {
        write_record(self.inner.as_ref(), key, record)
    }

    /// Lazy enumeration for the dispatch sweep. Unparseable blobs surface as
    /// `Err` items so one corrupt record cannot abort the whole sweep.
    pub fn list(
        &self,
    ) -> io::Result<Box<dyn Iterator<Item = io::Result<(String, SubscriptionRecord)>> + Send>>
    {
        let entries = self.inner.list()?;
        let iter = entries.map(|entry| {
            let (key, raw) = entry?;
            let record = decode(&key, &raw)?;
            Ok((key, record))
        });
        Ok(Box::new(iter))
    }
}

/// Typed view over the budget-snapshot blob store, sharing keys with
/// [`SubscriptionStore`] but without any referential-integrity enforcement.
#[derive(Clone)]
pub struct BudgetStore {
    inner: Arc<dyn BlobStore>,
}

impl BudgetStore {
    pub fn new(inner: Arc<dyn BlobStore>) -> Self {
        Self { inner }
    }

    pub fn get(&self, key: &str) -> io::Result<Option<BudgetSnapshotRecord>> {
        read_record(self.inner.as_ref(), key)
    }

    pub fn set(&self, key: &str, record: &BudgetSnapshotRecord) -> io::Result<()> {
        write_record(self.inner.as_ref(), key, record)
    }
}

fn read_record<R: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> io::Result<Option<R>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(decode(key, &raw)?)),
        None => Ok(None),
    }
}

fn write_record<R: Serialize>(store: &dyn BlobStore, key: &str, record: &R) -> io::Result<()> {
    let encoded = serde_json::to_string(record)
        .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))?;
    store.set(key, &encoded)
}

fn decode<R: DeserializeOwned>(key: &str, raw: &str) -> io::Result<R> {
    serde_json::from_str(raw).map_err(|err| {
        io::Error::new(
            ErrorKind::InvalidData,
            format!("corrupt record for key '{key}': {err}"),
        )
    })
}
