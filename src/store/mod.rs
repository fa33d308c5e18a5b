//! Client-local persistent stores
//!
//! Every store is keyed by [`CompoundKey`] and durable across restarts when
//! backed by Redis. The in-memory backend shares the exact contract and is
//! used for tests and throwaway sessions.
use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{CompoundKey, FavoriteRecord, PlayRecord},
};

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// Persistent flag recording that the one-time notice was dismissed
pub const NOTICE_SHOWN_FLAG: &str = "hasShownNotice";

/// Durable mapping from compound key to favorite record
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoritesStore: Send + Sync {
    /// Every stored favorite, in no particular order
    ///
    /// Entries whose persisted key or payload cannot be decoded are skipped.
    async fn get_all(&self) -> AppResult<HashMap<CompoundKey, FavoriteRecord>>;

    async fn get(&self, key: &CompoundKey) -> AppResult<Option<FavoriteRecord>>;

    /// Inserts or replaces a favorite, refreshing its save time to now
    ///
    /// Returns the record as stored.
    async fn upsert(&self, key: &CompoundKey, record: FavoriteRecord) -> AppResult<FavoriteRecord>;

    /// Deletes a favorite. Removing an absent key is not an error.
    async fn remove(&self, key: &CompoundKey) -> AppResult<()>;

    async fn contains(&self, key: &CompoundKey) -> AppResult<bool>;

    async fn clear(&self) -> AppResult<()>;
}

/// Durable mapping from compound key to last playback position
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlayRecordStore: Send + Sync {
    async fn get_all(&self) -> AppResult<HashMap<CompoundKey, PlayRecord>>;

    async fn get(&self, key: &CompoundKey) -> AppResult<Option<PlayRecord>>;

    /// Inserts or replaces a play record, refreshing its save time to now
    async fn save(&self, key: &CompoundKey, record: PlayRecord) -> AppResult<PlayRecord>;

    async fn remove(&self, key: &CompoundKey) -> AppResult<()>;

    async fn clear(&self) -> AppResult<()>;
}

/// Durable string flags
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FlagStore: Send + Sync {
    async fn get_flag(&self, name: &str) -> AppResult<Option<String>>;

    async fn set_flag(&self, name: &str, value: &str) -> AppResult<()>;
}

/// Decodes raw `key -> json` pairs read from a backend, skipping corrupted entries
pub(crate) fn decode_entries<T: serde::de::DeserializeOwned>(
    raw: HashMap<String, String>,
    store: &'static str,
) -> HashMap<CompoundKey, T> {
    let mut entries = HashMap::with_capacity(raw.len());

    for (raw_key, json) in raw {
        let key = match raw_key.parse::<CompoundKey>() {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(store, key = %raw_key, error = %e, "Skipping entry with malformed key");
                continue;
            }
        };

        match serde_json::from_str::<T>(&json) {
            Ok(record) => {
                entries.insert(key, record);
            }
            Err(e) => {
                tracing::warn!(store, key = %raw_key, error = %e, "Skipping entry with corrupted payload");
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entries_skips_malformed_keys_and_payloads() {
        let good = serde_json::to_string(&FavoriteRecord {
            title: "Good".to_string(),
            cover: "c".to_string(),
            source_name: "S".to_string(),
            total_episodes: 1,
            save_time: 1,
            year: None,
            search_title: None,
        })
        .unwrap();

        let mut raw = HashMap::new();
        raw.insert("src+1".to_string(), good);
        raw.insert("no-delimiter".to_string(), "{}".to_string());
        raw.insert("src+2".to_string(), "not json".to_string());

        let decoded: HashMap<CompoundKey, FavoriteRecord> = decode_entries(raw, "favorites");
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded[&CompoundKey::new("src", "1").unwrap()].title,
            "Good"
        );
    }
}
