// src/state.rs
//! Operator session: which view is open, which record is selected, and which
//! language the list should display. One session per process -- the dashboard
//! has a single operator -- held by the HTTP layer behind a lock and changed
//! only through the session endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    AllNews,
    Detail,
    Stats,
}

/// Which language variant of titles/bodies the list view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLanguage {
    Source,
    #[default]
    Localized,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub selected: Option<i64>,
    #[serde(default)]
    pub language: DisplayLanguage,
}
