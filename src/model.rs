// src/model.rs
//! Core record types shared by the store, the filter engine, and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored news item. Maps 1:1 onto the `content` table; the two trailing
/// fields are derived per filter pass and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsRecord {
    pub id: i64,
    pub title: String,
    pub title_localized: Option<String>,
    pub date: DateTime<Utc>,
    /// May carry HTML markup; the filter engine strips it before matching.
    pub content: String,
    pub content_localized: Option<String>,
    pub url: String,
    pub author: String,
    pub views: i64,
    pub source: String,
    pub summary: Option<String>,
    pub summary_localized: Option<String>,
    /// Relevance score computed upstream; read-only here.
    pub score: f64,
    /// Category label (the original column was called `type`).
    pub kind: String,

    /// Registrable domain of `url`, recomputed on every filter pass.
    #[sqlx(skip)]
    #[serde(default)]
    pub domain: Option<String>,
    /// Keywords whose occurrence count met their rule on the last pass.
    #[sqlx(skip)]
    #[serde(default)]
    pub matched_keywords: Vec<String>,
}

/// Insert payload for a new record. Tags ride along and are linked after the
/// row itself is committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordDraft {
    pub title: String,
    #[serde(default)]
    pub title_localized: Option<String>,
    pub date: DateTime<Utc>,
    pub content: String,
    #[serde(default)]
    pub content_localized: Option<String>,
    pub url: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub summary_localized: Option<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A tag row; `text` is unique, links to records live in `content_tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub text: String,
}

/// One generated illustration attached to a record. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: i64,
    pub content_id: i64,
    pub image_url: String,
}

/// Sort key for the filtered list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Date,
    /// Localized title, falling back to the source title.
    Title,
    Source,
    Score,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    /// Newest/highest first; the dashboard default.
    #[default]
    Desc,
}
