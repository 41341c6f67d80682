use client::firebase::KeyValueStore;
use gloo_storage::{LocalStorage, Storage};

/// Browser local storage, so a reload keeps the user signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStorage;

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::get::<String>(key).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        LocalStorage::set(key, value).map_err(|e| e.to_string())
    }

    fn remove(&self, key: &str) {
        LocalStorage::delete(key);
    }
}
