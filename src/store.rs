// src/store.rs
//! SQLite-backed content store. Reads are idempotent and degrade to empty
//! results on failure; writes are atomic per call. A connection-shaped error
//! is retried exactly once before the call degrades. Only `connect` and
//! `init_schema` return `Result` -- startup is allowed to fail loudly,
//! everything after it is not.

use std::future::Future;

use metrics::counter;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::model::{ImageRecord, NewsRecord, RecordDraft, Tag};

pub struct ContentStore {
    pool: SqlitePool,
}

/// Errors worth one reconnect attempt, as opposed to plain query failures.
fn is_connection_error(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

impl ContentStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        // A shared in-memory database exists per connection; keep the pool at
        // one connection so tests all see the same database.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the four tables if missing. Safe to run on every startup.
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                title_localized TEXT,
                date TEXT NOT NULL,
                content TEXT NOT NULL,
                content_localized TEXT,
                url TEXT NOT NULL,
                author TEXT NOT NULL DEFAULT '',
                views INTEGER NOT NULL DEFAULT 0,
                source TEXT NOT NULL DEFAULT '',
                summary TEXT,
                summary_localized TEXT,
                score REAL NOT NULL DEFAULT 0,
                kind TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_images (
                id INTEGER PRIMARY KEY,
                content_id INTEGER NOT NULL REFERENCES content(id),
                image_url TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY,
                text TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content_tags (
                content_id INTEGER NOT NULL REFERENCES content(id),
                tag_id INTEGER NOT NULL REFERENCES tags(id),
                PRIMARY KEY (content_id, tag_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_content_date
            ON content(date DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Run `f`; on a connection-shaped failure retry once on a fresh pool
    /// connection, otherwise hand the error back for degrading.
    async fn run_twice<T, F, Fut>(&self, op: &'static str, f: F) -> sqlx::Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = sqlx::Result<T>>,
    {
        match f().await {
            Err(e) if is_connection_error(&e) => {
                counter!("store_retries_total").increment(1);
                warn!(op, error = %e, "connection lost, retrying once");
                f().await
            }
            other => other,
        }
    }

    /* ----------------------------
    Reads
    ---------------------------- */

    /// All records, newest first. Empty on failure.
    pub async fn load_all(&self) -> Vec<NewsRecord> {
        self.run_twice("load_all", || async {
            sqlx::query_as::<_, NewsRecord>("SELECT * FROM content ORDER BY date DESC, id DESC")
                .fetch_all(&self.pool)
                .await
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "load_all failed; returning no records");
            Vec::new()
        })
    }

    /// One record by id. `None` for unknown ids and for failures (the failure
    /// is logged, unknown ids are not).
    pub async fn load_record(&self, id: i64) -> Option<NewsRecord> {
        self.run_twice("load_record", || async {
            sqlx::query_as::<_, NewsRecord>("SELECT * FROM content WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        })
        .await
        .unwrap_or_else(|e| {
            warn!(id, error = %e, "load_record failed");
            None
        })
    }

    /// Images attached to a record, oldest first. Empty on failure.
    pub async fn load_images(&self, content_id: i64) -> Vec<ImageRecord> {
        self.run_twice("load_images", || async {
            sqlx::query_as::<_, ImageRecord>(
                "SELECT * FROM content_images WHERE content_id = ? ORDER BY id",
            )
            .bind(content_id)
            .fetch_all(&self.pool)
            .await
        })
        .await
        .unwrap_or_else(|e| {
            warn!(content_id, error = %e, "load_images failed");
            Vec::new()
        })
    }

    /// Tags linked to a record, in link insertion order. Empty on failure.
    pub async fn load_tags(&self, content_id: i64) -> Vec<Tag> {
        self.run_twice("load_tags", || async {
            sqlx::query_as::<_, Tag>(
                r#"
                SELECT t.id, t.text FROM tags t
                JOIN content_tags ct ON ct.tag_id = t.id
                WHERE ct.content_id = ?
                ORDER BY t.id
                "#,
            )
            .bind(content_id)
            .fetch_all(&self.pool)
            .await
        })
        .await
        .unwrap_or_else(|e| {
            warn!(content_id, error = %e, "load_tags failed");
            Vec::new()
        })
    }

    /// Duplicate check used before ingesting a draft. False on failure.
    pub async fn exists_by_url(&self, url: &str) -> bool {
        self.run_twice("exists_by_url", || async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM content WHERE url = ?")
                .bind(url)
                .fetch_one(&self.pool)
                .await
        })
        .await
        .map(|n| n > 0)
        .unwrap_or_else(|e| {
            warn!(url, error = %e, "exists_by_url failed");
            false
        })
    }

    /* ----------------------------
    Writes
    ---------------------------- */

    /// Insert a record and return its id. Tags carried by the draft are
    /// upserted and linked in a second commit, so a crash in between leaves
    /// the record without tags rather than a half-written row.
    pub async fn insert_record(&self, draft: &RecordDraft) -> Option<i64> {
        let id = match self
            .run_twice("insert_record", || self.insert_record_row(draft))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(title = %draft.title, error = %e, "insert_record failed");
                return None;
            }
        };

        if !draft.tags.is_empty() {
            let tag_ids = self.upsert_tags(&draft.tags).await;
            self.link_tags(id, &tag_ids).await;
        }

        info!(id, title = %draft.title, "record inserted");
        Some(id)
    }

    async fn insert_record_row(&self, draft: &RecordDraft) -> sqlx::Result<i64> {
        let res = sqlx::query(
            r#"
            INSERT INTO content (
                title, title_localized, date, content, content_localized,
                url, author, views, source, summary, summary_localized,
                score, kind
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.title_localized)
        .bind(draft.date)
        .bind(&draft.content)
        .bind(&draft.content_localized)
        .bind(&draft.url)
        .bind(&draft.author)
        .bind(draft.views)
        .bind(&draft.source)
        .bind(&draft.summary)
        .bind(&draft.summary_localized)
        .bind(draft.score)
        .bind(&draft.kind)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    /// Set the localized body of a record.
    pub async fn upsert_translation(&self, id: i64, text: &str) {
        let res = self
            .run_twice("upsert_translation", || async {
                sqlx::query("UPDATE content SET content_localized = ? WHERE id = ?")
                    .bind(text)
                    .bind(id)
                    .execute(&self.pool)
                    .await
            })
            .await;
        match res {
            Ok(r) if r.rows_affected() == 0 => warn!(id, "upsert_translation: no such record"),
            Ok(_) => debug!(id, "translation stored"),
            Err(e) => warn!(id, error = %e, "upsert_translation failed"),
        }
    }

    /// Append image rows for a record in one transaction.
    pub async fn insert_images(&self, content_id: i64, urls: &[String]) {
        if urls.is_empty() {
            return;
        }
        let res = self
            .run_twice("insert_images", || async {
                let mut tx = self.pool.begin().await?;
                for url in urls {
                    sqlx::query("INSERT INTO content_images (content_id, image_url) VALUES (?, ?)")
                        .bind(content_id)
                        .bind(url)
                        .execute(&mut *tx)
                        .await?;
                }
                tx.commit().await
            })
            .await;
        match res {
            Ok(()) => debug!(content_id, count = urls.len(), "images stored"),
            Err(e) => warn!(content_id, error = %e, "insert_images failed"),
        }
    }

    /// Insert-or-fetch tags by their unique text, returning ids in input
    /// order. Blank texts are skipped. Empty on failure.
    pub async fn upsert_tags(&self, texts: &[String]) -> Vec<i64> {
        self.run_twice("upsert_tags", || async {
            let mut tx = self.pool.begin().await?;
            let mut ids = Vec::with_capacity(texts.len());
            for text in texts {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                sqlx::query("INSERT INTO tags (text) VALUES (?) ON CONFLICT(text) DO NOTHING")
                    .bind(text)
                    .execute(&mut *tx)
                    .await?;
                let id = sqlx::query_scalar::<_, i64>("SELECT id FROM tags WHERE text = ?")
                    .bind(text)
                    .fetch_one(&mut *tx)
                    .await?;
                ids.push(id);
            }
            tx.commit().await?;
            Ok(ids)
        })
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "upsert_tags failed");
            Vec::new()
        })
    }

    /// Link tags to a record in one transaction; duplicate links are ignored.
    pub async fn link_tags(&self, content_id: i64, tag_ids: &[i64]) {
        if tag_ids.is_empty() {
            return;
        }
        let res = self
            .run_twice("link_tags", || async {
                let mut tx = self.pool.begin().await?;
                for tag_id in tag_ids {
                    sqlx::query(
                        r#"
                        INSERT INTO content_tags (content_id, tag_id)
                        VALUES (?, ?)
                        ON CONFLICT(content_id, tag_id) DO NOTHING
                        "#,
                    )
                    .bind(content_id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await
            })
            .await;
        match res {
            Ok(()) => debug!(content_id, count = tag_ids.len(), "tags linked"),
            Err(e) => warn!(content_id, error = %e, "link_tags failed"),
        }
    }
}

/* ----------------------------
Tests
---------------------------- */
