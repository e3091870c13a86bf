//! Shared state of the item-catalog server

use std::sync::Arc;

use crate::{metrics::Metrics, session::Sessions, store::CatalogStore, templates::Templates};

/// The shared app state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The catalog store
    pub store: CatalogStore,
    /// Page templates
    pub templates: Templates,
    /// Sessions of the connected browsers
    pub sessions: Sessions,
    /// Request and catalog metrics
    pub metrics: Arc<Metrics>,
    /// Number of items shown on the front page
    pub latest_items: usize,
}
