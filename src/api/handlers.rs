use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        CompoundKey, ContinueWatchingItem, FavoriteItem, FavoriteRecord, PlayRecord, Tab,
    },
    services::RenderFrame,
};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct SetTabRequest {
    pub tab: Tab,
}

#[derive(Debug, Deserialize)]
pub struct SaveFavoriteRequest {
    pub title: String,
    pub cover: String,
    pub source_name: String,
    pub total_episodes: u32,
    pub year: Option<String>,
    pub search_title: Option<String>,
}

impl SaveFavoriteRequest {
    fn into_record(self) -> AppResult<FavoriteRecord> {
        let mut record = FavoriteRecord::new(
            self.title,
            self.cover,
            self.source_name,
            self.total_episodes,
        )?;
        record.year = self.year;
        record.search_title = self.search_title;
        Ok(record)
    }
}

#[derive(Debug, Deserialize)]
pub struct SavePlayRecordRequest {
    pub title: String,
    pub source_name: String,
    pub cover: String,
    pub index: u32,
    pub total_episodes: u32,
    pub play_time: u64,
    pub total_time: u64,
    pub year: Option<String>,
}

impl SavePlayRecordRequest {
    fn into_record(self) -> AppResult<PlayRecord> {
        if self.index == 0 || self.index > self.total_episodes {
            return Err(AppError::InvalidInput(format!(
                "Episode index {} outside 1..={}",
                self.index, self.total_episodes
            )));
        }

        Ok(PlayRecord {
            title: self.title,
            source_name: self.source_name,
            cover: self.cover,
            index: self.index,
            total_episodes: self.total_episodes,
            play_time: self.play_time,
            total_time: self.total_time,
            save_time: 0,
            year: self.year,
        })
    }
}

fn parse_key(source: String, id: String) -> AppResult<CompoundKey> {
    CompoundKey::new(source, id)
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Current render frame
pub async fn get_view(State(state): State<AppState>) -> Json<RenderFrame> {
    Json(state.orchestrator.render().await)
}

/// Render layer reports its first client paint
pub async fn hydrate(State(state): State<AppState>) -> Json<RenderFrame> {
    state.orchestrator.mark_hydrated().await;
    Json(state.orchestrator.render().await)
}

/// Re-fetches both hot catalog slices
pub async fn refresh_catalog(State(state): State<AppState>) -> Json<RenderFrame> {
    state.orchestrator.load_catalog().await;
    Json(state.orchestrator.render().await)
}

pub async fn set_tab(
    State(state): State<AppState>,
    Json(request): Json<SetTabRequest>,
) -> Json<RenderFrame> {
    tracing::info!(tab = ?request.tab, "Switching tab");
    state.orchestrator.set_tab(request.tab).await;
    Json(state.orchestrator.render().await)
}

pub async fn dismiss_notice(State(state): State<AppState>) -> AppResult<Json<RenderFrame>> {
    state.orchestrator.dismiss_notice().await?;
    Ok(Json(state.orchestrator.render().await))
}

/// All favorites, most recently saved first
pub async fn list_favorites(State(state): State<AppState>) -> AppResult<Json<Vec<FavoriteItem>>> {
    Ok(Json(state.orchestrator.list_favorites().await?))
}

pub async fn get_favorite(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
) -> AppResult<Json<FavoriteRecord>> {
    let key = parse_key(source, id)?;
    state
        .orchestrator
        .get_favorite(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Favorite {} not found", key)))
}

pub async fn save_favorite(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
    Json(request): Json<SaveFavoriteRequest>,
) -> AppResult<Json<FavoriteRecord>> {
    let key = parse_key(source, id)?;
    let record = request.into_record()?;
    let stored = state.orchestrator.save_favorite(&key, record).await?;

    tracing::info!(key = %key, save_time = stored.save_time, "Favorite saved");
    Ok(Json(stored))
}

pub async fn delete_favorite(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let key = parse_key(source, id)?;
    state.orchestrator.remove_favorite(&key).await?;

    tracing::info!(key = %key, "Favorite removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Continue-watching entries, most recently watched first
pub async fn list_play_records(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ContinueWatchingItem>>> {
    Ok(Json(state.orchestrator.list_play_records().await?))
}

pub async fn save_play_record(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
    Json(request): Json<SavePlayRecordRequest>,
) -> AppResult<Json<PlayRecord>> {
    let key = parse_key(source, id)?;
    let record = request.into_record()?;
    Ok(Json(state.orchestrator.save_play_record(&key, record).await?))
}

pub async fn delete_play_record(
    State(state): State<AppState>,
    Path((source, id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    let key = parse_key(source, id)?;
    state.orchestrator.remove_play_record(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
