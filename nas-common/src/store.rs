//! Append-only record storage
//!
//! Forms, submissions and corrections are all persisted through [`Store`].
//! Records are never updated or deleted; a correction is a new record.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// A persisted record
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    pub id: String,
    pub data: T,
}

/// Top-level field name -> exact string value
pub type SearchFields = BTreeMap<String, String>;

/// Storage contract shared by all record kinds
#[async_trait]
pub trait Store<T>: Send + Sync
where
    T: Send + Sync,
{
    /// Persist `data` under `id`
    async fn persist(&self, id: &str, data: T) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Record<T>>>;

    /// Records whose top-level string fields equal every entry of
    /// `search`, in persistence order
    async fn find_all(&self, search: &SearchFields) -> Result<Vec<Record<T>>>;
}

struct Entry<T> {
    record: Record<T>,
    fields: Value,
}

/// Store keeping records in memory
pub struct InMemoryStore<T> {
    name: &'static str,
    entries: RwLock<Vec<Entry<T>>>,
}

impl<T> InMemoryStore<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn matches(fields: &Value, search: &SearchFields) -> bool {
    search
        .iter()
        .all(|(key, expected)| fields.get(key).and_then(Value::as_str) == Some(expected.as_str()))
}

#[async_trait]
impl<T> Store<T> for InMemoryStore<T>
where
    T: Serialize + Clone + Send + Sync,
{
    async fn persist(&self, id: &str, data: T) -> Result<()> {
        let fields = serde_json::to_value(&data)?;
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.record.id == id) {
            return Err(Error::Storage(format!(
                "{} record {} already exists",
                self.name, id
            )));
        }
        entries.push(Entry {
            record: Record {
                id: id.to_string(),
                data,
            },
            fields,
        });
        debug!(store = self.name, id, "Record persisted");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Record<T>>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .find(|e| e.record.id == id)
            .map(|e| e.record.clone()))
    }

    async fn find_all(&self, search: &SearchFields) -> Result<Vec<Record<T>>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|e| matches(&e.fields, search))
            .map(|e| e.record.clone())
            .collect())
    }
}

/// Search for records whose `field` equals `value`
pub fn search(field: &str, value: &str) -> SearchFields {
    let mut fields = SearchFields::new();
    fields.insert(field.to_string(), value.to_string());
    fields
}
