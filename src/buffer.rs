// Recoverable local buffer for staged edits, behind an injectable key-value interface.
// Browser hosts use localStorage; tests and native hosts use an in-memory map.

use std::collections::HashMap;

use crate::error::Result;
#[cfg(any(target_arch = "wasm32", test))]
use crate::error::RoadmapError;

/// Key-value persistence for the staged-edit buffer.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
    fn clear(&mut self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value)
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        (**self).clear(key)
    }
}

/// In-memory buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    entries: HashMap<String, String>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut buffer = Self::new();
        buffer.entries.insert(key.to_string(), value.to_string());
        buffer
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl KeyValueStore for MemoryBuffer {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Browser `localStorage` buffer.
#[cfg(target_arch = "wasm32")]
pub struct LocalStorageBuffer {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorageBuffer {
    /// Fails when the page has no window or storage is disabled.
    pub fn open() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| RoadmapError::PersistFailure("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| RoadmapError::PersistFailure(format!("{:?}", e)))?
            .ok_or_else(|| RoadmapError::PersistFailure("localStorage unavailable".to_string()))?;
        Ok(LocalStorageBuffer { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl KeyValueStore for LocalStorageBuffer {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| RoadmapError::PersistFailure(format!("{:?}", e)))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| RoadmapError::PersistFailure(format!("{:?}", e)))
    }

    fn clear(&mut self, key: &str) -> Result<()> {
        self.storage
            .remove_item(key)
            .map_err(|e| RoadmapError::PersistFailure(format!("{:?}", e)))
    }
}

/// Write-failing buffer for exercising persist-failure paths.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FailingBuffer;

#[cfg(test)]
impl KeyValueStore for FailingBuffer {
    fn load(&self, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn save(&mut self, _key: &str, _value: &str) -> Result<()> {
        Err(RoadmapError::PersistFailure("quota exceeded".to_string()))
    }

    fn clear(&mut self, _key: &str) -> Result<()> {
        Ok(())
    }
}
