use std::collections::HashMap;

use ::redis::{aio::ConnectionManager, AsyncCommands, Client};

use crate::{
    error::AppResult,
    models::{next_save_time, now_millis, CompoundKey, FavoriteRecord, PlayRecord},
    store::{decode_entries, FavoritesStore, FlagStore, PlayRecordStore},
};

/// Redis-backed store implementing every store contract
///
/// Each store lives in its own hash (`{prefix}:favorites`, `{prefix}:playrecords`,
/// `{prefix}:flags`) whose fields are canonical compound keys and whose values
/// are JSON records. Redis serializes commands per key, so no client-side
/// locking is done.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connects to Redis and namespaces every hash under `prefix`
    pub async fn connect(client: Client, prefix: impl Into<String>) -> AppResult<Self> {
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn hash(&self, name: &str) -> String {
        format!("{}:{}", self.prefix, name)
    }

    fn favorites_hash(&self) -> String {
        self.hash("favorites")
    }

    fn play_records_hash(&self) -> String {
        self.hash("playrecords")
    }

    fn flags_hash(&self) -> String {
        self.hash("flags")
    }

    async fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        hash: String,
        key: &CompoundKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(hash, key.to_string()).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_record<T: serde::Serialize>(
        &self,
        hash: String,
        key: &CompoundKey,
        record: &T,
    ) -> AppResult<()> {
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn.hset(hash, key.to_string(), json).await?;
        Ok(())
    }

    async fn remove_field(&self, hash: String, key: &CompoundKey) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.hdel(hash, key.to_string()).await?;
        Ok(())
    }

    async fn delete_hash(&self, hash: String) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(hash).await?;
        Ok(())
    }

    /// Save time previously stored under `key`, ignoring unreadable payloads
    async fn previous_save_time(&self, hash: String, key: &CompoundKey) -> AppResult<Option<i64>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(hash, key.to_string()).await?;
        Ok(raw
            .and_then(|json| serde_json::from_str::<serde_json::Value>(&json).ok())
            .and_then(|value| value.get("save_time").and_then(|t| t.as_i64())))
    }
}

#[async_trait::async_trait]
impl FavoritesStore for RedisStore {
    async fn get_all(&self) -> AppResult<HashMap<CompoundKey, FavoriteRecord>> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(self.favorites_hash()).await?;
        Ok(decode_entries(raw, "favorites"))
    }

    async fn get(&self, key: &CompoundKey) -> AppResult<Option<FavoriteRecord>> {
        self.get_record(self.favorites_hash(), key).await
    }

    async fn upsert(
        &self,
        key: &CompoundKey,
        mut record: FavoriteRecord,
    ) -> AppResult<FavoriteRecord> {
        let previous = self.previous_save_time(self.favorites_hash(), key).await?;
        record.save_time = next_save_time(previous, now_millis());
        self.put_record(self.favorites_hash(), key, &record).await?;

        tracing::debug!(key = %key, save_time = record.save_time, "Favorite saved");
        Ok(record)
    }

    async fn remove(&self, key: &CompoundKey) -> AppResult<()> {
        self.remove_field(self.favorites_hash(), key).await
    }

    async fn contains(&self, key: &CompoundKey) -> AppResult<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.hexists(self.favorites_hash(), key.to_string()).await?;
        Ok(exists)
    }

    async fn clear(&self) -> AppResult<()> {
        self.delete_hash(self.favorites_hash()).await
    }
}

#[async_trait::async_trait]
impl PlayRecordStore for RedisStore {
    async fn get_all(&self) -> AppResult<HashMap<CompoundKey, PlayRecord>> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = conn.hgetall(self.play_records_hash()).await?;
        Ok(decode_entries(raw, "playrecords"))
    }

    async fn get(&self, key: &CompoundKey) -> AppResult<Option<PlayRecord>> {
        self.get_record(self.play_records_hash(), key).await
    }

    async fn save(&self, key: &CompoundKey, mut record: PlayRecord) -> AppResult<PlayRecord> {
        let previous = self.previous_save_time(self.play_records_hash(), key).await?;
        record.save_time = next_save_time(previous, now_millis());
        self.put_record(self.play_records_hash(), key, &record).await?;
        Ok(record)
    }

    async fn remove(&self, key: &CompoundKey) -> AppResult<()> {
        self.remove_field(self.play_records_hash(), key).await
    }

    async fn clear(&self) -> AppResult<()> {
        self.delete_hash(self.play_records_hash()).await
    }
}

#[async_trait::async_trait]
impl FlagStore for RedisStore {
    async fn get_flag(&self, name: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(self.flags_hash(), name).await?;
        Ok(value)
    }

    async fn set_flag(&self, name: &str, value: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(self.flags_hash(), name, value).await?;
        Ok(())
    }
}
