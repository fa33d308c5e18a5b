//! One-shot gate for UI that depends on client-local persistent state
//!
//! The render layer draws a first frame before anything client-local has
//! been read. Anything reading persisted flags stays hidden until the render
//! layer reports its first paint; only then is the notice flag read, once.
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};

use crate::{
    error::AppResult,
    store::{FlagStore, NOTICE_SHOWN_FLAG},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationState {
    /// Server-rendered and first client frame
    PreHydration,
    /// Set once after the first client paint, never left
    Hydrated,
}

#[derive(Debug)]
struct GateInner {
    state: HydrationState,
    notice_visible: bool,
}

/// Gates the one-time notice behind the first client paint
#[derive(Clone)]
pub struct HydrationGate {
    flags: Arc<dyn FlagStore>,
    inner: Arc<Mutex<GateInner>>,
    /// Notice decision, settled by the single flag read
    notice_decision: Arc<OnceCell<bool>>,
}

impl HydrationGate {
    pub fn new(flags: Arc<dyn FlagStore>) -> Self {
        Self {
            flags,
            inner: Arc::new(Mutex::new(GateInner {
                state: HydrationState::PreHydration,
                notice_visible: false,
            })),
            notice_decision: Arc::new(OnceCell::new()),
        }
    }

    pub async fn state(&self) -> HydrationState {
        self.inner.lock().await.state
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state().await == HydrationState::Hydrated
    }

    /// Whether the one-time notice should be drawn. Always false before hydration.
    pub async fn show_notice(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.state == HydrationState::Hydrated && inner.notice_visible
    }

    /// Records the first client paint and decides on the notice
    ///
    /// Only the first call transitions; later calls return the current
    /// decision untouched. A failed flag read hides the notice. The gate
    /// lock is not held while the flag is read.
    pub async fn mark_hydrated(&self) -> bool {
        {
            let inner = self.inner.lock().await;
            if inner.state == HydrationState::Hydrated {
                return inner.notice_visible;
            }
        }

        let show = *self
            .notice_decision
            .get_or_init(|| async {
                match self.flags.get_flag(NOTICE_SHOWN_FLAG).await {
                    Ok(value) => value.is_none(),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read notice flag, suppressing notice");
                        false
                    }
                }
            })
            .await;

        let mut inner = self.inner.lock().await;
        if inner.state == HydrationState::Hydrated {
            return inner.notice_visible;
        }
        inner.state = HydrationState::Hydrated;
        inner.notice_visible = show;

        tracing::info!(show_notice = inner.notice_visible, "Client hydrated");
        inner.notice_visible
    }

    /// Hides the notice now and records it as shown for every future session
    pub async fn dismiss(&self) -> AppResult<()> {
        {
            let mut inner = self.inner.lock().await;
            inner.notice_visible = false;
        }

        self.flags.set_flag(NOTICE_SHOWN_FLAG, "true").await?;
        tracing::info!("Notice dismissed");
        Ok(())
    }
}
