use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{next_save_time, now_millis, CompoundKey, FavoriteRecord, PlayRecord},
    store::{FavoritesStore, FlagStore, PlayRecordStore},
};

/// Process-local store implementing every store contract
///
/// Clones share the same underlying maps, so a clone handed to a second
/// component observes the first one's writes.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    favorites: HashMap<CompoundKey, FavoriteRecord>,
    play_records: HashMap<CompoundKey, PlayRecord>,
    flags: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FavoritesStore for MemoryStore {
    async fn get_all(&self) -> AppResult<HashMap<CompoundKey, FavoriteRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.favorites.clone())
    }

    async fn get(&self, key: &CompoundKey) -> AppResult<Option<FavoriteRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.favorites.get(key).cloned())
    }

    async fn upsert(
        &self,
        key: &CompoundKey,
        mut record: FavoriteRecord,
    ) -> AppResult<FavoriteRecord> {
        let mut inner = self.inner.write().await;
        let previous = inner.favorites.get(key).map(|r| r.save_time);
        record.save_time = next_save_time(previous, now_millis());
        inner.favorites.insert(key.clone(), record.clone());
        Ok(record)
    }

    async fn remove(&self, key: &CompoundKey) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.favorites.remove(key);
        Ok(())
    }

    async fn contains(&self, key: &CompoundKey) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.favorites.contains_key(key))
    }

    async fn clear(&self) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.favorites.clear();
        Ok(())
    }
}

#[async_trait::async_trait]
impl PlayRecordStore for MemoryStore {
    async fn get_all(&self) -> AppResult<HashMap<CompoundKey, PlayRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.play_records.clone())
    }

    async fn get(&self, key: &CompoundKey) -> AppResult<Option<PlayRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.play_records.get(key).cloned())
    }

    async fn save(&self, key: &CompoundKey, mut record: PlayRecord) -> AppResult<PlayRecord> {
        let mut inner = self.inner.write().await;
        let previous = inner.play_records.get(key).map(|r| r.save_time);
        record.save_time = next_save_time(previous, now_millis());
        inner.play_records.insert(key.clone(), record.clone());
        Ok(record)
    }

    async fn remove(&self, key: &CompoundKey) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.play_records.remove(key);
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.play_records.clear();
        Ok(())
    }
}

#[async_trait::async_trait]
impl FlagStore for MemoryStore {
    async fn get_flag(&self, name: &str) -> AppResult<Option<String>> {
        let inner = self.inner.read().await;
        Ok(inner.flags.get(name).cloned())
    }

    async fn set_flag(&self, name: &str, value: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.flags.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
