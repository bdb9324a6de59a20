use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::core::error::StoreError;

/// Durable key/value storage for small JSON documents.
pub trait KeyValueStore {
    fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// A single JSON object on disk. Read lazily on first access and cached;
/// every `set` rewrites the whole file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Option<Map<String, Value>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: None,
        }
    }

    fn load(&mut self) -> Result<&mut Map<String, Value>, StoreError> {
        if self.cache.is_none() {
            let map = read_map(&self.path)?;
            self.cache = Some(map);
        }
        match self.cache.as_mut() {
            Some(map) => Ok(map),
            None => Err(StoreError::Unavailable {
                message: "store cache missing after load".to_string(),
            }),
        }
    }

    fn flush(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_vec_pretty(map).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

fn read_map(path: &Path) -> Result<Map<String, Value>, StoreError> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    if contents.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    serde_json::from_slice(&contents).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

impl KeyValueStore for JsonFileStore {
    fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        // A corrupt file must not block writes; the next flush replaces it.
        if self.cache.is_none() {
            match read_map(&self.path) {
                Ok(map) => self.cache = Some(map),
                Err(StoreError::Corrupt { path, source }) => {
                    tracing::warn!(%path, error = %source, "Replacing corrupt store file");
                    self.cache = Some(Map::new());
                }
                Err(err) => return Err(err),
            }
        }
        let map = self.load()?;
        map.insert(key.to_string(), value);
        let snapshot = map.clone();
        self.flush(&snapshot)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

#[cfg(test)]
pub(crate) fn temp_store_path(name: &str) -> PathBuf {
    std::env::temp_dir()
        .join(format!("jobwatch-test-{}-{name}", std::process::id()))
        .join("job-tracker.json")
}
