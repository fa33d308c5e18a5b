use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::{AppError, AppResult};

pub mod key;

pub use key::CompoundKey;

/// Current wall-clock instant in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Save time for a record being (re)written.
///
/// Always at least one millisecond past the previously stored save time, so a
/// re-save inside the same clock tick still moves the record to the front.
pub fn next_save_time(previous: Option<i64>, now: i64) -> i64 {
    match previous {
        Some(prev) if prev >= now => prev + 1,
        _ => now,
    }
}

// ============================================================================
// Persisted Records
// ============================================================================

/// A title the user saved to their favorites
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteRecord {
    pub title: String,
    /// Poster image URL
    pub cover: String,
    /// Human-readable provider label
    pub source_name: String,
    pub total_episodes: u32,
    /// Epoch milliseconds of the last save
    pub save_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    /// Query the user searched with when they found this title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_title: Option<String>,
}

impl FavoriteRecord {
    /// Creates a record stamped with the current instant
    pub fn new(
        title: impl Into<String>,
        cover: impl Into<String>,
        source_name: impl Into<String>,
        total_episodes: u32,
    ) -> AppResult<Self> {
        if total_episodes == 0 {
            return Err(AppError::InvalidInput(
                "A favorite must have at least one episode".to_string(),
            ));
        }

        Ok(Self {
            title: title.into(),
            cover: cover.into(),
            source_name: source_name.into(),
            total_episodes,
            save_time: now_millis(),
            year: None,
            search_title: None,
        })
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_search_title(mut self, search_title: impl Into<String>) -> Self {
        self.search_title = Some(search_title.into());
        self
    }
}

/// Last playback position of a title, read back as "continue watching"
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayRecord {
    pub title: String,
    pub source_name: String,
    pub cover: String,
    /// 1-based episode currently playing
    pub index: u32,
    pub total_episodes: u32,
    /// Seconds into the current episode
    pub play_time: u64,
    /// Duration of the current episode in seconds
    pub total_time: u64,
    pub save_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl PlayRecord {
    /// Playback progress through the current episode, 0 to 100
    pub fn progress_percent(&self) -> f64 {
        if self.total_time == 0 {
            return 0.0;
        }
        (self.play_time as f64 / self.total_time as f64 * 100.0).clamp(0.0, 100.0)
    }
}

// ============================================================================
// Catalog API Types
// ============================================================================

/// Which catalog listing a slice is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Movie,
    Tv,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Movie => "movie",
            CatalogKind::Tv => "tv",
        }
    }
}

impl Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ranked entry from the remote catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
}

/// Raw response body from the catalog API
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list: Vec<CatalogItem>,
}

// ============================================================================
// View Types
// ============================================================================

/// Top-level tab selector of the home screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Home,
    Favorites,
}

/// A favorite projected for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteItem {
    pub source: String,
    pub id: String,
    pub title: String,
    pub poster: String,
    pub episodes: u32,
    pub source_name: String,
    pub save_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// A play record projected for the "continue watching" row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContinueWatchingItem {
    pub source: String,
    pub id: String,
    pub title: String,
    pub poster: String,
    pub source_name: String,
    pub episode_index: u32,
    pub total_episodes: u32,
    pub progress_percent: f64,
    pub save_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_save_time_uses_clock_when_ahead() {
        assert_eq!(next_save_time(None, 1_000), 1_000);
        assert_eq!(next_save_time(Some(900), 1_000), 1_000);
    }

    #[test]
    fn test_next_save_time_strictly_increases_within_same_tick() {
        assert_eq!(next_save_time(Some(1_000), 1_000), 1_001);
        assert_eq!(next_save_time(Some(1_500), 1_000), 1_501);
    }

    #[test]
    fn test_favorite_record_rejects_zero_episodes() {
        assert!(FavoriteRecord::new("Title", "cover.jpg", "Source", 0).is_err());
    }

    #[test]
    fn test_favorite_record_stamps_save_time() {
        let before = now_millis();
        let record = FavoriteRecord::new("Title", "cover.jpg", "Source", 12).unwrap();
        assert!(record.save_time >= before);
        assert_eq!(record.year, None);
    }

    #[test]
    fn test_favorite_record_optional_fields_skipped_in_json() {
        let record = FavoriteRecord {
            title: "Title".to_string(),
            cover: "c".to_string(),
            source_name: "S".to_string(),
            total_episodes: 1,
            save_time: 5,
            year: None,
            search_title: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("year").is_none());
        assert!(json.get("search_title").is_none());
    }

    #[test]
    fn test_play_record_progress() {
        let mut record = PlayRecord {
            title: "Show".to_string(),
            source_name: "S".to_string(),
            cover: "c".to_string(),
            index: 2,
            total_episodes: 10,
            play_time: 300,
            total_time: 1200,
            save_time: 0,
            year: None,
        };
        assert_eq!(record.progress_percent(), 25.0);

        record.total_time = 0;
        assert_eq!(record.progress_percent(), 0.0);

        record.total_time = 100;
        record.play_time = 250;
        assert_eq!(record.progress_percent(), 100.0);
    }

    #[test]
    fn test_catalog_response_deserialization() {
        let json = r#"{
            "code": 200,
            "message": "ok",
            "list": [
                { "title": "肖申克的救赎", "poster": "https://img/1.jpg", "rate": "9.7" },
                { "title": "霸王别姬", "poster": "https://img/2.jpg" }
            ]
        }"#;

        let response: CatalogResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, 200);
        assert_eq!(response.list.len(), 2);
        assert_eq!(response.list[0].rate, Some("9.7".to_string()));
        assert_eq!(response.list[1].rate, None);
    }

    #[test]
    fn test_tab_serialization() {
        assert_eq!(serde_json::to_string(&Tab::Home).unwrap(), "\"home\"");
        assert_eq!(
            serde_json::from_str::<Tab>("\"favorites\"").unwrap(),
            Tab::Favorites
        );
        assert_eq!(Tab::default(), Tab::Home);
    }

    #[test]
    fn test_catalog_kind_display() {
        assert_eq!(format!("{}", CatalogKind::Movie), "movie");
        assert_eq!(format!("{}", CatalogKind::Tv), "tv");
    }
}
