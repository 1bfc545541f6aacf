//! Versioned migrations for the seen-article database.
//!
//! Migrations run in ascending order when the store is opened. Each one runs
//! in its own transaction together with its `schema_migrations` row, and each
//! inspects the live schema before changing it, so databases written by older
//! releases (no `tag` column, or `id` as the sole key) upgrade in place.

use rusqlite::{params, Connection, Transaction};

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// Tag given to rows written before tags existed.
pub(crate) const LEGACY_TAG: &str = "default";

pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "create articles table",
            apply: create_articles,
        },
        Migration {
            version: 2,
            description: "add tag column to legacy articles table",
            apply: add_tag_column,
        },
        Migration {
            version: 3,
            description: "key articles by (id, tag)",
            apply: composite_key,
        },
    ]
}

/// Apply pending migrations and return the resulting schema version.
pub(crate) fn run_migrations(conn: &mut Connection) -> rusqlite::Result<u32> {
    conn.execute_batch(MIGRATIONS_TABLE)?;
    let mut current = schema_version(conn)?;

    for migration in all_migrations() {
        if migration.version <= current {
            continue;
        }
        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        let tx = conn.transaction()?;
        (migration.apply)(&tx)?;
        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            params![migration.version],
        )?;
        tx.commit()?;
        current = migration.version;
    }

    Ok(current)
}

pub(crate) fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
}

fn create_articles(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS articles (
    id         TEXT NOT NULL,
    tag        TEXT NOT NULL DEFAULT 'default',
    title      TEXT NOT NULL,
    link       TEXT NOT NULL,
    published  TEXT,
    author     TEXT,
    created_at TEXT NOT NULL,
    PRIMARY KEY (id, tag)
);
"#,
    )
}

fn add_tag_column(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    if article_columns(tx)?.iter().any(|c| c.name == "tag") {
        return Ok(());
    }
    tracing::info!("legacy articles table has no tag column, adding it");
    tx.execute_batch(&format!(
        "ALTER TABLE articles ADD COLUMN tag TEXT NOT NULL DEFAULT '{LEGACY_TAG}'"
    ))
}

fn composite_key(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    let mut key: Vec<(i64, String)> = article_columns(tx)?
        .into_iter()
        .filter(|c| c.pk > 0)
        .map(|c| (c.pk, c.name))
        .collect();
    key.sort();
    let key: Vec<&str> = key.iter().map(|(_, name)| name.as_str()).collect();

    if key != ["id", "tag"] {
        tracing::info!(?key, "rebuilding articles table with (id, tag) key");
        tx.execute_batch(&format!(
            r#"
CREATE TABLE articles_rekeyed (
    id         TEXT NOT NULL,
    tag        TEXT NOT NULL DEFAULT '{LEGACY_TAG}',
    title      TEXT NOT NULL,
    link       TEXT NOT NULL,
    published  TEXT,
    author     TEXT,
    created_at TEXT NOT NULL,
    PRIMARY KEY (id, tag)
);
INSERT OR IGNORE INTO articles_rekeyed (id, tag, title, link, published, author, created_at)
    SELECT id, COALESCE(tag, '{LEGACY_TAG}'), title, link, published, author, created_at
    FROM articles;
DROP TABLE articles;
ALTER TABLE articles_rekeyed RENAME TO articles;
"#
        ))?;
    }

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_articles_tag_created_at ON articles(tag, created_at);",
    )
}

struct ColumnInfo {
    name: String,
    pk: i64,
}

fn article_columns(tx: &Transaction<'_>) -> rusqlite::Result<Vec<ColumnInfo>> {
    let mut stmt = tx.prepare("PRAGMA table_info(articles)")?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                pk: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}
