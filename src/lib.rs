// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod filter;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod pdf;
pub mod state;
pub mod stats;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::AppConfig;
pub use crate::model::{ImageRecord, NewsRecord, RecordDraft, SortKey, SortOrder, Tag};
pub use crate::store::ContentStore;
