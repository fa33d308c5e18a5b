pub mod catalog;
pub mod hydration;
pub mod orchestrator;
pub mod placeholder;

pub use catalog::{CatalogProvider, HttpCatalogProvider};
pub use hydration::{HydrationGate, HydrationState};
pub use orchestrator::{FavoritesView, RenderFrame, RowSlot, ViewOrchestrator, ViewState};
