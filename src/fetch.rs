use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::{Category, Settings};
use crate::db::{self, FetchedPage};
use crate::error::FetchError;

const TOTAL_PAGES_HEADER: &str = "X-WP-TotalPages";

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub pages: usize,
    pub posts: usize,
    pub failed: Vec<String>,
}

enum Message {
    Page(FetchedPage),
    CategoryFailed(String),
}

pub fn build_client(settings: &Settings) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&settings.user_agent).context("Invalid user agent")?,
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch every configured category concurrently, saving each page to the DB
/// as it arrives.
pub async fn fetch_all_streaming(conn: &Connection, settings: &Settings) -> Result<FetchStats> {
    let client = build_client(settings)?;
    let settings = Arc::new(settings.clone());
    let semaphore = Arc::new(Semaphore::new(settings.concurrency.max(1)));

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Message>(settings.concurrency.max(1) * 2);

    for category in settings.categories.clone() {
        let client = client.clone();
        let settings = Arc::clone(&settings);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            if let Err(e) = fetch_category(&client, &settings, &category, &tx).await {
                warn!("Giving up on {}: {}", category.name, e);
                let _ = tx.send(Message::CategoryFailed(category.name.clone())).await;
            }
        });
    }

    // rx closes once every task has dropped its sender
    drop(tx);

    let mut stats = FetchStats {
        pages: 0,
        posts: 0,
        failed: Vec::new(),
    };

    while let Some(msg) = rx.recv().await {
        match msg {
            Message::Page(page) => {
                stats.posts += db::save_page(conn, &page)?;
                stats.pages += 1;
                pb.set_message(format!("{} - page {} ({} posts so far)", page.category, page.page, stats.posts));
                pb.tick();
            }
            Message::CategoryFailed(name) => stats.failed.push(name),
        }
    }

    pb.finish_and_clear();
    info!(
        "Fetched {} pages, {} posts ({} categories failed)",
        stats.pages,
        stats.posts,
        stats.failed.len()
    );
    Ok(stats)
}

/// Walk a category's pages from 1 until the reported last page.
async fn fetch_category(
    client: &reqwest::Client,
    settings: &Settings,
    category: &Category,
    tx: &tokio::sync::mpsc::Sender<Message>,
) -> Result<(), FetchError> {
    let mut page = 1u32;
    loop {
        let (posts, total_pages) = fetch_page_with_retry(client, settings, category, page).await?;
        info!("{} - {}/{}", category.name, page, total_pages);
        let fetched = FetchedPage {
            category: category.name.clone(),
            page,
            posts,
        };
        if tx.send(Message::Page(fetched)).await.is_err() {
            return Ok(());
        }
        if page >= total_pages {
            return Ok(());
        }
        page += 1;
    }
}

async fn fetch_page_with_retry(
    client: &reqwest::Client,
    settings: &Settings,
    category: &Category,
    page: u32,
) -> Result<(Vec<serde_json::Value>, u32), FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_page(client, &settings.base_url, category, page).await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < settings.max_retries => {
                let backoff = backoff_delay(settings.base_backoff_ms, attempt);
                warn!(
                    "{} (attempt {}/{}), backing off {:.1}s",
                    e,
                    attempt + 1,
                    settings.max_retries,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn fetch_page(
    client: &reqwest::Client,
    base_url: &str,
    category: &Category,
    page: u32,
) -> Result<(Vec<serde_json::Value>, u32), FetchError> {
    let http_err = |source| FetchError::Http {
        category: category.name.clone(),
        page,
        source,
    };

    let response = client
        .get(base_url)
        .query(&[("categories", category.id), ("page", page)])
        .send()
        .await
        .map_err(http_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            category: category.name.clone(),
            page,
            status,
        });
    }

    let total_pages = parse_total_pages(response.headers().get(TOTAL_PAGES_HEADER));
    let body: serde_json::Value = response.json().await.map_err(http_err)?;
    let posts = into_posts(body).ok_or_else(|| FetchError::NotAnArray {
        category: category.name.clone(),
        page,
    })?;
    Ok((posts, total_pages))
}

/// `base * 2^attempt`, saturating instead of overflowing on large attempts.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor))
}

/// Missing or garbled header means a single page.
fn parse_total_pages(value: Option<&HeaderValue>) -> u32 {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

fn into_posts(body: serde_json::Value) -> Option<Vec<serde_json::Value>> {
    match body {
        serde_json::Value::Array(posts) => Some(posts),
        _ => None,
    }
}
