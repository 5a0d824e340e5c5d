use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS raw_posts (
            id         INTEGER PRIMARY KEY,
            category   TEXT NOT NULL,
            page       INTEGER NOT NULL,
            position   INTEGER NOT NULL,
            post_id    INTEGER,
            payload    TEXT NOT NULL,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(category, page, position)
        );
        CREATE INDEX IF NOT EXISTS idx_raw_posts_category ON raw_posts(category);
        ",
    )?;
    Ok(())
}

// ── Fetching ──

/// One page of posts as returned for a category.
pub struct FetchedPage {
    pub category: String,
    pub page: u32,
    pub posts: Vec<serde_json::Value>,
}

/// Start a new run: raw posts from earlier runs are discarded.
pub fn reset_raw_posts(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM raw_posts", [])?)
}

pub fn save_page(conn: &Connection, page: &FetchedPage) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO raw_posts (category, page, position, post_id, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, post) in page.posts.iter().enumerate() {
            let post_id = post.get("id").and_then(|v| v.as_i64());
            count += stmt.execute(rusqlite::params![
                page.category,
                page.page,
                position as i64,
                post_id,
                post.to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Processing ──

pub struct StoredPost {
    pub page: u32,
    pub position: i64,
    pub payload: String,
}

/// Posts of one category in fetch order.
pub fn fetch_category(conn: &Connection, category: &str) -> Result<Vec<StoredPost>> {
    let mut stmt = conn.prepare(
        "SELECT page, position, payload FROM raw_posts
         WHERE category = ?1
         ORDER BY page, position",
    )?;
    let rows = stmt
        .query_map([category], |row| {
            Ok(StoredPost {
                page: row.get(0)?,
                position: row.get(1)?,
                payload: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct CategoryStats {
    pub category: String,
    pub pages: i64,
    pub posts: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Vec<CategoryStats>> {
    let mut stmt = conn.prepare(
        "SELECT category, COUNT(DISTINCT page), COUNT(*) FROM raw_posts
         GROUP BY category ORDER BY category",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CategoryStats {
                category: row.get(0)?,
                pages: row.get(1)?,
                posts: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
