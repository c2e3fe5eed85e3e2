use std::{collections::BTreeMap, path::PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{config, error::StoreError};

/// Keys of the persisted fields.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const TOKEN_EXPIRATION: &str = "tokenExpiration";
    pub const PORT: &str = "port";
    pub const CLIENT_ID: &str = "clientId";
    pub const DEVICE_ID: &str = "deviceId";
}

/// Persistent key-value store for configuration and secrets.
///
/// Implementors only provide raw [`Value`] access; the typed accessors are
/// built on top of it.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `value` under `key`, or removes the key for `None`.
    async fn set(&self, key: &str, value: Option<Value>) -> Result<(), StoreError>;

    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(match self.get(key).await? {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        })
    }

    async fn set_string(&self, key: &str, value: Option<&str>) -> Result<(), StoreError> {
        self.set(key, value.map(|v| Value::String(v.to_string())))
            .await
    }

    async fn get_int(&self, key: &str) -> Result<Option<i64>, StoreError> {
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) if n.is_i64() => Ok(n.as_i64()),
            Some(Value::String(s)) => match s.parse() {
                Ok(n) => Ok(Some(n)),
                Err(_) => Err(StoreError::NotAnInteger {
                    key: key.to_string(),
                    value: s,
                }),
            },
            Some(other) => Err(StoreError::NotAnInteger {
                key: key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    async fn set_int(&self, key: &str, value: Option<i64>) -> Result<(), StoreError> {
        self.set(key, value.map(Value::from)).await
    }
}

/// A [`SecretStore`] kept as a pretty-printed JSON object on disk.
pub struct FileStore {
    path: PathBuf,
    // serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store at `<data dir>/secrets.json`.
    pub fn open_default() -> Self {
        Self::new(config::data_dir().join("secrets.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let json = match async_fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    async fn write_all(&self, entries: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        // written next to the target, then renamed over it
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SecretStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Option<Value>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_all().await?;
        match value {
            Some(v) => entries.insert(key.to_string(), v),
            None => entries.remove(key),
        };
        self.write_all(&entries).await
    }
}

/// In-process [`SecretStore`], useful for hosts that persist elsewhere and for tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Option<Value>) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        match value {
            Some(v) => entries.insert(key.to_string(), v),
            None => entries.remove(key),
        };
        Ok(())
    }
}
