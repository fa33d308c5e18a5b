//! Client-side persistence and view-state layer for a media browsing client
//!
//! Holds the user's favorites and playback positions in durable client-local
//! stores, fetches ranked catalog slices, and reconciles all of it into the
//! frame a render layer draws.
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
