//! Home screen orchestration
//!
//! Owns the single view state record the render layer draws from and
//! coordinates the catalog provider, the persistent stores and the hydration
//! gate behind it.
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{
        CatalogItem, CatalogKind, CompoundKey, ContinueWatchingItem, FavoriteItem,
        FavoriteRecord, PlayRecord, Tab,
    },
    services::{catalog::CatalogProvider, hydration::HydrationGate, placeholder},
    store::{FavoritesStore, FlagStore, PlayRecordStore},
};

/// Skeleton slots drawn per catalog row while loading
pub const PLACEHOLDER_COUNT: usize = 8;

pub const EMPTY_FAVORITES_MESSAGE: &str = "No favorites yet";

/// Mutable screen state, owned by the orchestrator
#[derive(Debug, Clone)]
pub struct ViewState {
    pub active_tab: Tab,
    pub loading: bool,
    pub hot_movies: Vec<CatalogItem>,
    pub hot_tv_shows: Vec<CatalogItem>,
    pub favorite_items: Vec<FavoriteItem>,
    pub continue_watching: Vec<ContinueWatchingItem>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            active_tab: Tab::Home,
            loading: true,
            hot_movies: Vec::new(),
            hot_tv_shows: Vec::new(),
            favorite_items: Vec::new(),
            continue_watching: Vec::new(),
        }
    }
}

/// One entry of a horizontally scrolling catalog row
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowSlot {
    Placeholder { key: String },
    Item { key: String, item: CatalogItem },
}

impl RowSlot {
    pub fn key(&self) -> &str {
        match self {
            RowSlot::Placeholder { key } | RowSlot::Item { key, .. } => key,
        }
    }
}

/// Favorites section content
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FavoritesView {
    Items { items: Vec<FavoriteItem> },
    Empty { message: String },
}

/// Everything the render layer needs for one frame
#[derive(Debug, Clone, Serialize)]
pub struct RenderFrame {
    pub active_tab: Tab,
    pub loading: bool,
    pub hydrated: bool,
    pub show_notice: bool,
    pub hot_movies: Vec<RowSlot>,
    pub hot_tv_shows: Vec<RowSlot>,
    pub continue_watching: Vec<ContinueWatchingItem>,
    pub favorites: FavoritesView,
}

/// Coordinates catalog fetches, favorites reads, tab switching and the notice
pub struct ViewOrchestrator {
    catalog: Arc<dyn CatalogProvider>,
    favorites: Arc<dyn FavoritesStore>,
    play_records: Arc<dyn PlayRecordStore>,
    gate: HydrationGate,
    catalog_tag: String,
    state: RwLock<ViewState>,
    /// Sequence number of the latest favorites read issued
    favorites_seq: AtomicU64,
    /// Generation of the latest catalog load issued
    catalog_seq: AtomicU64,
}

impl ViewOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        favorites: Arc<dyn FavoritesStore>,
        play_records: Arc<dyn PlayRecordStore>,
        flags: Arc<dyn FlagStore>,
        catalog_tag: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            favorites,
            play_records,
            gate: HydrationGate::new(flags),
            catalog_tag: catalog_tag.into(),
            state: RwLock::new(ViewState::default()),
            favorites_seq: AtomicU64::new(0),
            catalog_seq: AtomicU64::new(0),
        }
    }

    /// Snapshot of the raw view state
    pub async fn state(&self) -> ViewState {
        self.state.read().await.clone()
    }

    pub fn gate(&self) -> &HydrationGate {
        &self.gate
    }

    /// Initial load: both hot catalog slices
    ///
    /// The continue-watching row is client-local and waits for
    /// [`Self::mark_hydrated`].
    pub async fn mount(&self) {
        self.load_catalog().await;
    }

    /// Fetches the movie and tv slices concurrently
    ///
    /// Each slice is written as soon as its own request succeeds; a failed
    /// request leaves its slice as it was. `loading` falls only once both
    /// requests of the latest load have settled. A load overtaken by a newer
    /// one writes nothing.
    pub async fn load_catalog(&self) {
        let seq = self.catalog_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().await.loading = true;

        tokio::join!(
            self.load_slice(CatalogKind::Movie, seq),
            self.load_slice(CatalogKind::Tv, seq)
        );

        let mut state = self.state.write().await;
        if self.catalog_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Catalog load superseded, still loading");
            return;
        }
        state.loading = false;
        tracing::debug!(seq, "Catalog loading settled");
    }

    async fn load_slice(&self, kind: CatalogKind, seq: u64) {
        match self.catalog.fetch_slice(kind, &self.catalog_tag).await {
            Ok(items) => {
                let mut state = self.state.write().await;
                if self.catalog_seq.load(Ordering::SeqCst) != seq {
                    tracing::debug!(seq, kind = %kind, "Discarding stale catalog slice");
                    return;
                }
                match kind {
                    CatalogKind::Movie => state.hot_movies = items,
                    CatalogKind::Tv => state.hot_tv_shows = items,
                }
            }
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    provider = self.catalog.name(),
                    error = %e,
                    "Catalog slice unavailable, leaving section empty"
                );
            }
        }
    }

    /// Switches tabs; entering favorites always re-reads the store
    ///
    /// Leaving favorites keeps the last list so switching back draws it
    /// immediately. A failed read is logged and the previous list stays.
    pub async fn set_tab(&self, tab: Tab) {
        self.state.write().await.active_tab = tab;

        if tab == Tab::Favorites {
            if let Err(e) = self.refresh_favorites().await {
                tracing::error!(error = %e, "Failed to load favorites");
            }
        }
    }

    /// Re-reads every favorite and replaces the projected list
    ///
    /// Returns `Ok(false)` when a newer read was issued while this one was in
    /// flight; the stale result is discarded.
    pub async fn refresh_favorites(&self) -> AppResult<bool> {
        let seq = self.favorites_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let all = self.favorites.get_all().await?;
        let items = project_favorites(all);

        let mut state = self.state.write().await;
        if self.favorites_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Discarding stale favorites read");
            return Ok(false);
        }

        tracing::debug!(seq, count = items.len(), "Favorites refreshed");
        state.favorite_items = items;
        Ok(true)
    }

    pub async fn refresh_continue_watching(&self) -> AppResult<()> {
        let records = self.play_records.get_all().await?;
        let items = project_continue_watching(records);
        self.state.write().await.continue_watching = items;
        Ok(())
    }

    async fn refresh_continue_watching_logged(&self) {
        if let Err(e) = self.refresh_continue_watching().await {
            tracing::error!(error = %e, "Failed to load play records");
        }
    }

    /// Saves a favorite and refreshes the list if it is on screen
    pub async fn save_favorite(
        &self,
        key: &CompoundKey,
        record: FavoriteRecord,
    ) -> AppResult<FavoriteRecord> {
        let stored = self.favorites.upsert(key, record).await?;
        self.refresh_favorites_if_visible().await;
        Ok(stored)
    }

    pub async fn remove_favorite(&self, key: &CompoundKey) -> AppResult<()> {
        self.favorites.remove(key).await?;
        self.refresh_favorites_if_visible().await;
        Ok(())
    }

    pub async fn is_favorite(&self, key: &CompoundKey) -> AppResult<bool> {
        self.favorites.contains(key).await
    }

    pub async fn get_favorite(&self, key: &CompoundKey) -> AppResult<Option<FavoriteRecord>> {
        self.favorites.get(key).await
    }

    /// Current favorites straight from the store, most recent first
    pub async fn list_favorites(&self) -> AppResult<Vec<FavoriteItem>> {
        Ok(project_favorites(self.favorites.get_all().await?))
    }

    pub async fn save_play_record(
        &self,
        key: &CompoundKey,
        record: PlayRecord,
    ) -> AppResult<PlayRecord> {
        let stored = self.play_records.save(key, record).await?;
        self.refresh_continue_watching_if_hydrated().await;
        Ok(stored)
    }

    pub async fn remove_play_record(&self, key: &CompoundKey) -> AppResult<()> {
        self.play_records.remove(key).await?;
        self.refresh_continue_watching_if_hydrated().await;
        Ok(())
    }

    pub async fn list_play_records(&self) -> AppResult<Vec<ContinueWatchingItem>> {
        Ok(project_continue_watching(self.play_records.get_all().await?))
    }

    async fn refresh_continue_watching_if_hydrated(&self) {
        if self.gate.is_hydrated().await {
            self.refresh_continue_watching_logged().await;
        }
    }

    async fn refresh_favorites_if_visible(&self) {
        if self.state.read().await.active_tab == Tab::Favorites {
            if let Err(e) = self.refresh_favorites().await {
                tracing::error!(error = %e, "Failed to reload favorites after write");
            }
        }
    }

    /// First client paint happened; unlocks client-local UI
    ///
    /// Play records are first read here, never before.
    pub async fn mark_hydrated(&self) {
        self.gate.mark_hydrated().await;
        self.refresh_continue_watching_logged().await;
    }

    pub async fn dismiss_notice(&self) -> AppResult<()> {
        self.gate.dismiss().await
    }

    /// Builds the frame for the current render tick
    pub async fn render(&self) -> RenderFrame {
        let state = self.state().await;
        let hydrated = self.gate.is_hydrated().await;
        let show_notice = self.gate.show_notice().await;

        let favorites = if state.favorite_items.is_empty() {
            FavoritesView::Empty {
                message: EMPTY_FAVORITES_MESSAGE.to_string(),
            }
        } else {
            FavoritesView::Items {
                items: state.favorite_items,
            }
        };

        RenderFrame {
            active_tab: state.active_tab,
            loading: state.loading,
            hydrated,
            show_notice,
            hot_movies: row_slots(state.loading, state.hot_movies, "movie-placeholder", "movie"),
            hot_tv_shows: row_slots(
                state.loading,
                state.hot_tv_shows,
                "tv-placeholder",
                "tv-show",
            ),
            continue_watching: if hydrated {
                state.continue_watching
            } else {
                Vec::new()
            },
            favorites,
        }
    }
}

/// Orders favorites most recently saved first, ties by key
pub fn project_favorites(all: HashMap<CompoundKey, FavoriteRecord>) -> Vec<FavoriteItem> {
    let mut entries: Vec<(CompoundKey, FavoriteRecord)> = all.into_iter().collect();
    entries.sort_by(|(ka, a), (kb, b)| {
        (Reverse(a.save_time), ka).cmp(&(Reverse(b.save_time), kb))
    });

    entries
        .into_iter()
        .map(|(key, fav)| {
            let (source, id) = key.into_parts();
            FavoriteItem {
                source,
                id,
                title: fav.title,
                poster: fav.cover,
                episodes: fav.total_episodes,
                source_name: fav.source_name,
                save_time: fav.save_time,
                year: fav.year,
            }
        })
        .collect()
}

/// Orders play records most recently watched first, ties by key
pub fn project_continue_watching(
    all: HashMap<CompoundKey, PlayRecord>,
) -> Vec<ContinueWatchingItem> {
    let mut entries: Vec<(CompoundKey, PlayRecord)> = all.into_iter().collect();
    entries.sort_by(|(ka, a), (kb, b)| {
        (Reverse(a.save_time), ka).cmp(&(Reverse(b.save_time), kb))
    });

    entries
        .into_iter()
        .map(|(key, record)| {
            let progress_percent = record.progress_percent();
            let (source, id) = key.into_parts();
            ContinueWatchingItem {
                source,
                id,
                title: record.title,
                poster: record.cover,
                source_name: record.source_name,
                episode_index: record.index,
                total_episodes: record.total_episodes,
                progress_percent,
                save_time: record.save_time,
            }
        })
        .collect()
}

/// Keys a catalog row for rendering
///
/// Loading rows get fresh placeholder keys. Loaded items are keyed by title;
/// an empty or repeated title falls back to a generated key.
pub fn row_slots(
    loading: bool,
    items: Vec<CatalogItem>,
    placeholder_prefix: &str,
    fallback_prefix: &str,
) -> Vec<RowSlot> {
    if loading {
        return placeholder::generate_many(placeholder_prefix, PLACEHOLDER_COUNT)
            .into_iter()
            .map(|key| RowSlot::Placeholder { key })
            .collect();
    }

    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| {
            let key = if !item.title.is_empty() && seen.insert(item.title.clone()) {
                item.title.clone()
            } else {
                placeholder::generate(fallback_prefix)
            };
            RowSlot::Item { key, item }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::catalog::MockCatalogProvider;
    use crate::store::{MemoryStore, MockFavoritesStore};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn item(title: &str) -> CatalogItem {
        CatalogItem {
            title: title.to_string(),
            poster: format!("https://img/{}.jpg", title),
            rate: None,
        }
    }

    fn favorite(title: &str, save_time: i64) -> FavoriteRecord {
        FavoriteRecord {
            title: title.to_string(),
            cover: "cover".to_string(),
            source_name: "Provider".to_string(),
            total_episodes: 1,
            save_time,
            year: None,
            search_title: None,
        }
    }

    fn key(source: &str, id: &str) -> CompoundKey {
        CompoundKey::new(source, id).unwrap()
    }

    fn catalog_mock(movies: AppResult<Vec<CatalogItem>>, tv: AppResult<Vec<CatalogItem>>) -> MockCatalogProvider {
        let mut movies = Some(movies);
        let mut tv = Some(tv);
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_name().return_const("mock");
        catalog
            .expect_fetch_slice()
            .returning(move |kind, _| match kind {
                CatalogKind::Movie => movies.take().unwrap_or(Ok(Vec::new())),
                CatalogKind::Tv => tv.take().unwrap_or(Ok(Vec::new())),
            });
        catalog
    }

    fn orchestrator_with(catalog: MockCatalogProvider, store: &MemoryStore) -> ViewOrchestrator {
        ViewOrchestrator::new(
            Arc::new(catalog),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            "热门",
        )
    }

    #[test]
    fn test_projection_orders_by_save_time_descending() {
        let mut all = HashMap::new();
        all.insert(key("a", "1"), favorite("First", 100));
        all.insert(key("b", "2"), favorite("Second", 300));
        all.insert(key("c", "3"), favorite("Third", 200));

        let times: Vec<i64> = project_favorites(all).iter().map(|f| f.save_time).collect();
        assert_eq!(times, vec![300, 200, 100]);
    }

    #[test]
    fn test_projection_breaks_ties_by_key() {
        let mut all = HashMap::new();
        all.insert(key("zeta", "1"), favorite("Z", 100));
        all.insert(key("alpha", "9"), favorite("A", 100));
        all.insert(key("alpha", "2"), favorite("A2", 100));

        let ids: Vec<(String, String)> = project_favorites(all)
            .into_iter()
            .map(|f| (f.source, f.id))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("alpha".to_string(), "2".to_string()),
                ("alpha".to_string(), "9".to_string()),
                ("zeta".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_projection_decodes_key_parts() {
        let mut all = HashMap::new();
        all.insert(key("ffzy", "abc+def"), favorite("Plus", 1));

        let items = project_favorites(all);
        assert_eq!(items[0].source, "ffzy");
        assert_eq!(items[0].id, "abc+def");
        assert_eq!(items[0].poster, "cover");
    }

    #[test]
    fn test_row_slots_loading_yields_eight_distinct_placeholders() {
        let slots = row_slots(true, vec![item("ignored")], "movie-placeholder", "movie");
        assert_eq!(slots.len(), PLACEHOLDER_COUNT);

        let keys: HashSet<&str> = slots.iter().map(RowSlot::key).collect();
        assert_eq!(keys.len(), PLACEHOLDER_COUNT);
        assert!(slots
            .iter()
            .all(|s| matches!(s, RowSlot::Placeholder { key } if key.starts_with("movie-placeholder-"))));
    }

    #[test]
    fn test_row_slots_fall_back_for_empty_and_duplicate_titles() {
        let slots = row_slots(
            false,
            vec![item("Dune"), item(""), item("Dune")],
            "tv-placeholder",
            "tv-show",
        );

        assert_eq!(slots[0].key(), "Dune");
        assert!(slots[1].key().starts_with("tv-show-"));
        assert!(slots[2].key().starts_with("tv-show-"));
        assert_ne!(slots[1].key(), slots[2].key());
    }

    #[tokio::test]
    async fn test_initial_state_is_loading_on_home() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);

        let frame = orchestrator.render().await;
        assert!(frame.loading);
        assert_eq!(frame.active_tab, Tab::Home);
        assert_eq!(frame.hot_movies.len(), PLACEHOLDER_COUNT);
        assert_eq!(frame.hot_tv_shows.len(), PLACEHOLDER_COUNT);
        assert!(!frame.show_notice);
    }

    #[tokio::test]
    async fn test_mount_loads_both_slices() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(
            catalog_mock(Ok(vec![item("Inception")]), Ok(vec![item("Dark"), item("Lost")])),
            &store,
        );

        orchestrator.mount().await;
        let state = orchestrator.state().await;
        assert!(!state.loading);
        assert_eq!(state.hot_movies, vec![item("Inception")]);
        assert_eq!(state.hot_tv_shows.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_catalog_failure_still_settles() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(
            catalog_mock(
                Err(AppError::ExternalApi("movie listing down".to_string())),
                Ok(vec![item("Dark")]),
            ),
            &store,
        );

        orchestrator.mount().await;
        let state = orchestrator.state().await;
        assert!(!state.loading);
        assert!(state.hot_movies.is_empty());
        assert_eq!(state.hot_tv_shows, vec![item("Dark")]);

        let frame = orchestrator.render().await;
        assert!(frame.hot_movies.is_empty());
        assert_eq!(frame.hot_tv_shows[0].key(), "Dark");
    }

    #[tokio::test]
    async fn test_both_catalog_failures_still_settle() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(
            catalog_mock(
                Err(AppError::ExternalApi("down".to_string())),
                Err(AppError::ExternalApi("down".to_string())),
            ),
            &store,
        );

        orchestrator.mount().await;
        let state = orchestrator.state().await;
        assert!(!state.loading);
        assert!(state.hot_movies.is_empty());
        assert!(state.hot_tv_shows.is_empty());
    }

    #[tokio::test]
    async fn test_continue_watching_waits_for_hydration() {
        let store = MemoryStore::new();
        let record = PlayRecord {
            title: "Show".to_string(),
            source_name: "S".to_string(),
            cover: "c".to_string(),
            index: 4,
            total_episodes: 8,
            play_time: 30,
            total_time: 60,
            save_time: 0,
            year: None,
        };
        store.save(&key("lzi", "5"), record).await.unwrap();

        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);
        orchestrator.mount().await;
        assert!(orchestrator.state().await.continue_watching.is_empty());
        assert!(orchestrator.render().await.continue_watching.is_empty());

        orchestrator.mark_hydrated().await;
        let frame = orchestrator.render().await;
        assert_eq!(frame.continue_watching.len(), 1);
        assert_eq!(frame.continue_watching[0].episode_index, 4);
        assert_eq!(frame.continue_watching[0].progress_percent, 50.0);
    }

    #[tokio::test]
    async fn test_play_record_writes_hidden_until_hydrated() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);
        let record = PlayRecord {
            title: "Show".to_string(),
            source_name: "S".to_string(),
            cover: "c".to_string(),
            index: 1,
            total_episodes: 2,
            play_time: 0,
            total_time: 0,
            save_time: 0,
            year: None,
        };

        // Forced read before hydration still never reaches the frame
        orchestrator
            .save_play_record(&key("lzi", "5"), record)
            .await
            .unwrap();
        orchestrator.refresh_continue_watching().await.unwrap();
        let frame = orchestrator.render().await;
        assert!(!frame.hydrated);
        assert!(frame.continue_watching.is_empty());

        orchestrator.mark_hydrated().await;
        assert_eq!(orchestrator.render().await.continue_watching.len(), 1);

        orchestrator.remove_play_record(&key("lzi", "5")).await.unwrap();
        assert!(orchestrator.render().await.continue_watching.is_empty());
    }

    #[tokio::test]
    async fn test_empty_favorites_render_empty_state() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);

        orchestrator.set_tab(Tab::Favorites).await;
        let frame = orchestrator.render().await;
        assert_eq!(frame.active_tab, Tab::Favorites);
        assert_eq!(
            frame.favorites,
            FavoritesView::Empty {
                message: EMPTY_FAVORITES_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_switching_to_favorites_reads_store() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);
        store
            .upsert(&key("a", "1"), favorite("Older", 0))
            .await
            .unwrap();
        store
            .upsert(&key("b", "2"), favorite("Newer", 0))
            .await
            .unwrap();

        orchestrator.set_tab(Tab::Favorites).await;
        let state = orchestrator.state().await;
        assert_eq!(state.favorite_items.len(), 2);
        assert!(state.favorite_items[0].save_time >= state.favorite_items[1].save_time);
    }

    #[tokio::test]
    async fn test_switching_away_keeps_cached_favorites() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);
        store
            .upsert(&key("a", "1"), favorite("Kept", 0))
            .await
            .unwrap();

        orchestrator.set_tab(Tab::Favorites).await;
        orchestrator.set_tab(Tab::Home).await;

        let state = orchestrator.state().await;
        assert_eq!(state.active_tab, Tab::Home);
        assert_eq!(state.favorite_items.len(), 1);
    }

    #[tokio::test]
    async fn test_favorites_read_failure_keeps_previous_list() {
        let mut favorites = MockFavoritesStore::new();
        let mut calls = 0;
        favorites.expect_get_all().returning(move || {
            calls += 1;
            if calls == 1 {
                let mut all = HashMap::new();
                all.insert(CompoundKey::new("a", "1").unwrap(), favorite("Cached", 5));
                Ok(all)
            } else {
                Err(AppError::Internal("disk full".to_string()))
            }
        });

        let store = MemoryStore::new();
        let orchestrator = ViewOrchestrator::new(
            Arc::new(catalog_mock(Ok(vec![]), Ok(vec![]))),
            Arc::new(favorites),
            Arc::new(store.clone()),
            Arc::new(store),
            "热门",
        );

        orchestrator.set_tab(Tab::Favorites).await;
        orchestrator.set_tab(Tab::Home).await;
        orchestrator.set_tab(Tab::Favorites).await;

        let state = orchestrator.state().await;
        assert_eq!(state.favorite_items.len(), 1);
        assert_eq!(state.favorite_items[0].title, "Cached");
    }

    #[tokio::test]
    async fn test_save_favorite_refreshes_visible_list() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);
        orchestrator.set_tab(Tab::Favorites).await;

        orchestrator
            .save_favorite(&key("a", "1"), favorite("New", 0))
            .await
            .unwrap();
        assert_eq!(orchestrator.state().await.favorite_items.len(), 1);
        assert!(orchestrator.is_favorite(&key("a", "1")).await.unwrap());

        orchestrator.remove_favorite(&key("a", "1")).await.unwrap();
        assert!(orchestrator.state().await.favorite_items.is_empty());
    }

    struct SlowThenFastFavorites {
        calls: AtomicUsize,
        release: Notify,
    }

    #[async_trait::async_trait]
    impl FavoritesStore for SlowThenFastFavorites {
        async fn get_all(&self) -> AppResult<HashMap<CompoundKey, FavoriteRecord>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let mut all = HashMap::new();
            if call == 0 {
                self.release.notified().await;
                all.insert(CompoundKey::new("stale", "1").unwrap(), favorite("Stale", 1));
            } else {
                all.insert(CompoundKey::new("fresh", "1").unwrap(), favorite("Fresh", 2));
            }
            Ok(all)
        }

        async fn get(&self, _key: &CompoundKey) -> AppResult<Option<FavoriteRecord>> {
            Ok(None)
        }

        async fn upsert(
            &self,
            _key: &CompoundKey,
            record: FavoriteRecord,
        ) -> AppResult<FavoriteRecord> {
            Ok(record)
        }

        async fn remove(&self, _key: &CompoundKey) -> AppResult<()> {
            Ok(())
        }

        async fn contains(&self, _key: &CompoundKey) -> AppResult<bool> {
            Ok(false)
        }

        async fn clear(&self) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stale_favorites_read_is_discarded() {
        let favorites = Arc::new(SlowThenFastFavorites {
            calls: AtomicUsize::new(0),
            release: Notify::new(),
        });
        let store = MemoryStore::new();
        let orchestrator = Arc::new(ViewOrchestrator::new(
            Arc::new(catalog_mock(Ok(vec![]), Ok(vec![]))),
            favorites.clone(),
            Arc::new(store.clone()),
            Arc::new(store),
            "热门",
        ));

        let slow = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.refresh_favorites().await })
        };
        while favorites.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(orchestrator.refresh_favorites().await.unwrap());
        favorites.release.notify_one();
        assert!(!slow.await.unwrap().unwrap());

        let state = orchestrator.state().await;
        assert_eq!(state.favorite_items.len(), 1);
        assert_eq!(state.favorite_items[0].title, "Fresh");
    }

    /// Holds the first load's requests until `first` fires, the next load's until `second`
    struct GatedCatalog {
        calls: AtomicUsize,
        first: Notify,
        second: Notify,
    }

    #[async_trait::async_trait]
    impl CatalogProvider for GatedCatalog {
        async fn fetch_slice(&self, kind: CatalogKind, _tag: &str) -> AppResult<Vec<CatalogItem>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let round = if call < 2 {
                self.first.notified().await;
                "old"
            } else {
                self.second.notified().await;
                "new"
            };
            Ok(vec![item(&format!("{}-{}", kind, round))])
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    async fn wait_for_calls(catalog: &GatedCatalog, n: usize) {
        while catalog.calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_overlapping_catalog_loads_keep_loading_until_latest_settles() {
        let catalog = Arc::new(GatedCatalog {
            calls: AtomicUsize::new(0),
            first: Notify::new(),
            second: Notify::new(),
        });
        let store = MemoryStore::new();
        let orchestrator = Arc::new(ViewOrchestrator::new(
            catalog.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            "热门",
        ));

        let older = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.mount().await })
        };
        wait_for_calls(&catalog, 2).await;

        let newer = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.load_catalog().await })
        };
        wait_for_calls(&catalog, 4).await;

        catalog.first.notify_waiters();
        older.await.unwrap();

        let state = orchestrator.state().await;
        assert!(state.loading);
        assert!(state.hot_movies.is_empty());
        assert!(state.hot_tv_shows.is_empty());
        assert!(orchestrator
            .render()
            .await
            .hot_movies
            .iter()
            .all(|s| matches!(s, RowSlot::Placeholder { .. })));

        catalog.second.notify_waiters();
        newer.await.unwrap();

        let state = orchestrator.state().await;
        assert!(!state.loading);
        assert_eq!(state.hot_movies, vec![item("movie-new")]);
        assert_eq!(state.hot_tv_shows, vec![item("tv-new")]);
    }

    #[tokio::test]
    async fn test_notice_only_after_hydration() {
        let store = MemoryStore::new();
        let orchestrator = orchestrator_with(catalog_mock(Ok(vec![]), Ok(vec![])), &store);

        assert!(!orchestrator.render().await.show_notice);
        orchestrator.mount().await;
        assert!(!orchestrator.render().await.show_notice);

        orchestrator.mark_hydrated().await;
        let frame = orchestrator.render().await;
        assert!(frame.hydrated);
        assert!(frame.show_notice);

        orchestrator.dismiss_notice().await.unwrap();
        assert!(!orchestrator.render().await.show_notice);
    }
}
