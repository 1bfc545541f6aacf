use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::{params, Row, Statement};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{ArticleRecord, InsertOutcome, SeenArticle};

use super::schema;

const INSERT_ARTICLE: &str = r#"INSERT INTO articles (id, tag, title, link, published, author, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id, tag) DO NOTHING"#;

/// Durable record of which article ids have been reported under which tag.
///
/// Every method is one self-contained unit of work on the database; nothing
/// is cached in memory, so several processes can share one file.
#[derive(Clone)]
pub struct SeenStore {
    conn: Connection,
}

impl SeenStore {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path).await?;
        let store = Self::init(conn).await?;
        tracing::info!(path = %path.display(), "seen store ready");
        Ok(store)
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        let version = conn
            .call(|conn| {
                conn.busy_timeout(Duration::from_secs(5))?;
                Ok(schema::run_migrations(conn)?)
            })
            .await?;
        tracing::debug!(version, "schema up to date");

        Ok(Self { conn })
    }

    pub async fn schema_version(&self) -> Result<u32> {
        let version = self
            .conn
            .call(|conn| Ok(schema::schema_version(conn)?))
            .await?;
        Ok(version)
    }

    pub async fn is_seen(&self, id: &str, tag: &str) -> Result<bool> {
        let (id, tag) = (id.to_string(), tag.to_string());
        let seen = self
            .conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare_cached("SELECT 1 FROM articles WHERE id = ?1 AND tag = ?2 LIMIT 1")?;
                Ok(stmt.exists(params![id, tag])?)
            })
            .await?;
        Ok(seen)
    }

    /// Insert one record under `tag`, or do nothing if (`id`, `tag`) exists.
    pub async fn insert(&self, record: &ArticleRecord, tag: &str) -> Result<InsertOutcome> {
        let record = record.clone();
        let tag = tag.to_string();
        let created_at = format_timestamp(Utc::now());
        let outcome = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(INSERT_ARTICLE)?;
                Ok(insert_row(&mut stmt, &record, &tag, &created_at)?)
            })
            .await?;
        Ok(outcome)
    }

    /// Mark `records` as reported under `tag`. Returns how many rows were new.
    pub async fn save(&self, records: &[ArticleRecord], tag: &str) -> Result<usize> {
        self.save_at(records, tag, Utc::now()).await
    }

    pub(crate) async fn save_at(
        &self,
        records: &[ArticleRecord],
        tag: &str,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let records = records.to_vec();
        let tag_owned = tag.to_string();
        let created_at = format_timestamp(now);
        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0_usize;
                {
                    let mut stmt = tx.prepare_cached(INSERT_ARTICLE)?;
                    for record in &records {
                        if insert_row(&mut stmt, record, &tag_owned, &created_at)?.is_inserted() {
                            inserted += 1;
                        }
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        tracing::info!(tag, inserted, "saved articles");
        Ok(inserted)
    }

    /// Delete every row for `tag`, or every row at all.
    pub async fn clear_all(&self, tag: Option<&str>) -> Result<usize> {
        let tag_owned = tag.map(ToString::to_string);
        let removed = self
            .conn
            .call(move |conn| {
                let removed = match &tag_owned {
                    Some(tag) => conn.execute("DELETE FROM articles WHERE tag = ?1", params![tag])?,
                    None => conn.execute("DELETE FROM articles", [])?,
                };
                Ok(removed)
            })
            .await?;

        tracing::info!(tag = tag.unwrap_or("*"), removed, "cleared articles");
        Ok(removed)
    }

    /// Delete rows saved within the last `days` days (`created_at >= now - days`).
    ///
    /// This undoes recent tracking so those articles get reported again; rows
    /// older than the window are left alone.
    pub async fn clear_recent(&self, days: u32, tag: Option<&str>) -> Result<usize> {
        self.clear_recent_at(days, tag, Utc::now()).await
    }

    pub(crate) async fn clear_recent_at(
        &self,
        days: u32,
        tag: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if days == 0 {
            return Err(AppError::InvalidArgument(
                "days must be greater than 0".to_string(),
            ));
        }

        // A window reaching past chrono's range covers every row.
        let cutoff = TimeDelta::try_days(i64::from(days))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let cutoff = format_timestamp(cutoff);
        let tag_owned = tag.map(ToString::to_string);
        let removed = self
            .conn
            .call(move |conn| {
                let removed = match &tag_owned {
                    Some(tag) => conn.execute(
                        "DELETE FROM articles WHERE tag = ?1 AND created_at >= ?2",
                        params![tag, cutoff],
                    )?,
                    None => conn.execute(
                        "DELETE FROM articles WHERE created_at >= ?1",
                        params![cutoff],
                    )?,
                };
                Ok(removed)
            })
            .await?;

        tracing::info!(tag = tag.unwrap_or("*"), days, removed, "cleared recent articles");
        Ok(removed)
    }

    pub async fn count(&self, tag: Option<&str>) -> Result<usize> {
        let tag = tag.map(ToString::to_string);
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = match &tag {
                    Some(tag) => conn.query_row(
                        "SELECT COUNT(*) FROM articles WHERE tag = ?1",
                        params![tag],
                        |row| row.get(0),
                    )?,
                    None => conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?,
                };
                Ok(count)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Rows saved under `tag`, most recent first.
    pub async fn list(&self, tag: &str) -> Result<Vec<SeenArticle>> {
        let tag = tag.to_string();
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, tag, title, link, published, author, created_at
                       FROM articles
                       WHERE tag = ?1
                       ORDER BY created_at DESC, rowid DESC"#,
                )?;
                let articles = stmt
                    .query_map(params![tag], seen_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }
}

fn insert_row(
    stmt: &mut Statement<'_>,
    record: &ArticleRecord,
    tag: &str,
    created_at: &str,
) -> rusqlite::Result<InsertOutcome> {
    let changed = stmt.execute(params![
        record.id,
        tag,
        record.title,
        record.link,
        record.published.map(format_timestamp),
        record.author,
        created_at,
    ])?;

    Ok(if changed > 0 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::AlreadyExists
    })
}

/// Fixed-width UTC timestamps so SQL string comparison orders them correctly.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // RFC3339 as written by this crate (e.g., "2026-01-11T12:34:56.000000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive ISO timestamps from databases written before timestamps carried an offset
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn seen_from_row(row: &Row) -> rusqlite::Result<SeenArticle> {
    Ok(SeenArticle {
        id: row.get(0)?,
        tag: row.get(1)?,
        title: row.get(2)?,
        link: row.get(3)?,
        published: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| parse_datetime(&s)),
        author: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
    })
}
