// src/api.rs
//! HTTP surface for the dashboard frontend: list/filter, detail, session,
//! AI actions, PDF download, and statistics. Handlers coerce query and body
//! input, dropping unparseable fragments instead of rejecting the request.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::config::AppConfig;
use crate::filter::{self, FilterCriteria, KeywordRule};
use crate::gateway::{AiGateway, ArticleRequest, TranslationProvider};
use crate::model::{ImageRecord, NewsRecord, SortKey, SortOrder, Tag};
use crate::pdf::{self, PdfOptions};
use crate::state::{Session, View};
use crate::stats;
use crate::store::ContentStore;

/// Upper bound for one image-generation request.
const MAX_IMAGES_PER_REQUEST: u32 = 4;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<ContentStore>,
    pub gateway: Arc<AiGateway>,
    pub session: Arc<RwLock<Session>>,
}

impl AppState {
    /// Wire up the shared pieces; the gateway is built from the config's AI
    /// and language sections.
    pub fn new(config: AppConfig, store: ContentStore) -> Self {
        let gateway = AiGateway::new(config.ai.clone(), config.language.clone());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            gateway: Arc::new(gateway),
            session: Arc::new(RwLock::new(Session::default())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(list_news))
        .route("/news/{id}", get(news_detail))
        .route("/news/{id}/translate", post(translate_record))
        .route("/news/{id}/tags", post(tag_record))
        .route("/news/{id}/article", post(article_record))
        .route("/news/{id}/images", post(illustrate_record))
        .route("/article/pdf", post(article_pdf))
        .route("/session", get(get_session).put(put_session))
        .route("/stats", get(stats_view))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn not_found(id: i64) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("no record with id {id}") })),
    )
        .into_response()
}

/* ----------------------------
List & filter
---------------------------- */

#[derive(Debug, Default, serde::Deserialize)]
struct NewsQuery {
    title: Option<String>,
    /// `word:count` pairs, comma separated; count defaults to 1.
    keywords: Option<String>,
    /// Comma separated allow-list; `all` disables.
    sources: Option<String>,
    domain: Option<String>,
    kind: Option<String>,
    from: Option<String>,
    to: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn criteria_from_query(q: &NewsQuery) -> FilterCriteria {
    let mut criteria = FilterCriteria {
        search: q.title.clone().filter(|t| !t.trim().is_empty()),
        ..Default::default()
    };

    if let Some(raw) = q.keywords.as_deref() {
        for pair in raw.split(',') {
            let (word, count) = match pair.split_once(':') {
                Some((w, c)) => match c.trim().parse::<u32>() {
                    Ok(n) => (w.trim(), n),
                    Err(_) => continue, // unparseable fragment, drop it
                },
                None => (pair.trim(), 1),
            };
            if !word.is_empty() {
                criteria.keywords.push(KeywordRule::new(word, count));
            }
        }
    }

    if let Some(raw) = q.sources.as_deref() {
        let listed: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        // `all` anywhere in the list turns the filter off.
        if !listed.iter().any(|s| s == "all") {
            criteria.sources = listed;
        }
    }

    criteria.domain = q
        .domain
        .clone()
        .filter(|d| !d.trim().is_empty() && d != "all");
    criteria.kind = q
        .kind
        .clone()
        .filter(|k| !k.trim().is_empty() && k != "all");

    // Both bounds must parse for the range to activate.
    let from = q.from.as_deref().and_then(parse_rfc3339);
    let to = q.to.as_deref().and_then(parse_rfc3339);
    if let (Some(from), Some(to)) = (from, to) {
        criteria.date_range = Some((from, to));
    }

    if let Some(sort) = q.sort.as_deref() {
        criteria.sort_key = match sort {
            "title" => SortKey::Title,
            "source" => SortKey::Source,
            "score" => SortKey::Score,
            _ => SortKey::Date,
        };
    }
    if let Some(order) = q.order.as_deref() {
        criteria.sort_order = match order {
            "asc" => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
    }

    criteria
}

async fn list_news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
) -> Json<Vec<NewsRecord>> {
    let criteria = criteria_from_query(&q);
    let records = state.store.load_all().await;
    Json(filter::apply(records, &criteria))
}

/* ----------------------------
Detail & session
---------------------------- */

#[derive(serde::Serialize)]
struct DetailResp {
    record: NewsRecord,
    tags: Vec<Tag>,
    images: Vec<ImageRecord>,
}

async fn news_detail(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let Some(mut record) = state.store.load_record(id).await else {
        return not_found(id);
    };
    record.domain = filter::extract_domain(&record.url);

    let tags = state.store.load_tags(id).await;
    let images = state.store.load_images(id).await;

    {
        let mut session = state.session.write().await;
        session.view = View::Detail;
        session.selected = Some(id);
    }

    Json(DetailResp {
        record,
        tags,
        images,
    })
    .into_response()
}

async fn get_session(State(state): State<AppState>) -> Json<Session> {
    Json(state.session.read().await.clone())
}

async fn put_session(State(state): State<AppState>, Json(next): Json<Session>) -> Json<Session> {
    let mut session = state.session.write().await;
    *session = next;
    Json(session.clone())
}

/* ----------------------------
AI actions
---------------------------- */

#[derive(Default, serde::Deserialize)]
struct TranslateReq {
    #[serde(default)]
    provider: TranslationProvider,
}

#[derive(serde::Serialize)]
struct TranslateResp {
    translation: String,
}

async fn translate_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response {
    let Some(record) = state.store.load_record(id).await else {
        return not_found(id);
    };
    // An absent or unparseable body means the default provider.
    let req: TranslateReq = serde_json::from_slice(&body).unwrap_or_default();
    let provider = req.provider;

    let lang = &state.config.language;
    let translation = state
        .gateway
        .translate(&record.content, &lang.source, &lang.target, provider)
        .await;
    if !translation.is_empty() {
        state.store.upsert_translation(id, &translation).await;
    }
    Json(TranslateResp { translation }).into_response()
}

#[derive(serde::Serialize)]
struct TagsResp {
    tags: Vec<String>,
}

async fn tag_record(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let Some(record) = state.store.load_record(id).await else {
        return not_found(id);
    };
    let existing: Vec<String> = state
        .store
        .load_tags(id)
        .await
        .into_iter()
        .map(|t| t.text)
        .collect();

    let tags = state.gateway.suggest_tags(&record.content, &existing).await;

    // Anything past the existing prefix is new and gets persisted.
    let fresh = tags[existing.len()..].to_vec();
    if !fresh.is_empty() {
        let ids = state.store.upsert_tags(&fresh).await;
        state.store.link_tags(id, &ids).await;
    }

    Json(TagsResp { tags }).into_response()
}

#[derive(Default, serde::Deserialize)]
struct ArticleReq {
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(serde::Serialize)]
struct ArticleResp {
    article: Option<String>,
}

async fn article_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response {
    let Some(record) = state.store.load_record(id).await else {
        return not_found(id);
    };
    let keywords = serde_json::from_slice::<ArticleReq>(&body)
        .unwrap_or_default()
        .keywords;

    let req = ArticleRequest {
        title: &record.title,
        source: &record.source,
        url: &record.url,
        date: record.date,
        body: &record.content,
        keywords: &keywords,
    };
    let article = state.gateway.generate_article(&req).await;
    Json(ArticleResp { article }).into_response()
}

#[derive(serde::Deserialize)]
struct ImagesReq {
    #[serde(default = "default_image_count")]
    count: u32,
}

impl Default for ImagesReq {
    fn default() -> Self {
        Self {
            count: default_image_count(),
        }
    }
}

fn default_image_count() -> u32 {
    1
}

#[derive(serde::Serialize)]
struct ImagesResp {
    images: Vec<String>,
}

async fn illustrate_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Response {
    let Some(record) = state.store.load_record(id).await else {
        return not_found(id);
    };
    let count = serde_json::from_slice::<ImagesReq>(&body)
        .unwrap_or_default()
        .count
        .clamp(1, MAX_IMAGES_PER_REQUEST);

    // The stored summary is the prompt; fall back to the title.
    let prompt = match record.summary.as_deref() {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => record.title.clone(),
    };

    let images = state.gateway.generate_images(&prompt, count).await;
    if !images.is_empty() {
        state.store.insert_images(id, &images).await;
    }
    Json(ImagesResp { images }).into_response()
}

/* ----------------------------
PDF & statistics
---------------------------- */

#[derive(serde::Deserialize)]
struct PdfReq {
    title: String,
    body: String,
}

async fn article_pdf(State(state): State<AppState>, Json(req): Json<PdfReq>) -> Response {
    let opts = PdfOptions::from(&state.config.pdf);
    match pdf::render_pdf(&req.title, &req.body, &opts) {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response(),
        Err(e) => {
            error!(error = %e, "pdf rendering failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "pdf rendering failed" })),
            )
                .into_response()
        }
    }
}

#[derive(serde::Serialize)]
struct SourceCount {
    source: String,
    count: usize,
}

#[derive(serde::Serialize)]
struct DayCount {
    day: NaiveDate,
    count: usize,
}

#[derive(serde::Serialize)]
struct StatsResp {
    sources: Vec<SourceCount>,
    daily: Vec<DayCount>,
}

async fn stats_view(State(state): State<AppState>) -> Json<StatsResp> {
    let records = state.store.load_all().await;
    let sources = stats::source_counts_last_week(&records, Utc::now())
        .into_iter()
        .map(|(source, count)| SourceCount { source, count })
        .collect();
    let daily = stats::daily_counts(&records)
        .into_iter()
        .map(|(day, count)| DayCount { day, count })
        .collect();
    Json(StatsResp { sources, daily })
}
