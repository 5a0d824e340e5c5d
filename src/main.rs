mod collection;
mod config;
mod db;
mod error;
mod fetch;
mod parser;
mod query;
mod store;

use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use crate::collection::Collection;
use crate::config::Settings;
use crate::parser::fields::Layout;
use crate::parser::record::{RawPost, TechnologyRecord};

#[derive(Parser)]
#[command(name = "ufc_inova_scraper", about = "UFC Inova technology showcase scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every category's pages from the WordPress API into the local DB
    Fetch,
    /// Extract records from fetched posts and write the JSON collection
    Process,
    /// Fetch + process in one go
    Run,
    /// Show fetched pages/posts per category and record totals
    Stats,
    /// Look up records in the JSON collection
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
}

#[derive(Subcommand)]
enum QueryCommand {
    /// List category names
    Categories,
    /// Every record of one category
    Category { name: String },
    /// Records whose title contains the text
    Title { text: String },
    /// Records whose department contains the text
    Department { text: String },
    /// Records published in a year
    Year { year: i32 },
    /// Records listing this inventor
    Inventor { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Fetch => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            run_fetch(&conn, &settings).await
        }
        Commands::Process => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            run_process(&conn, &settings)
        }
        Commands::Run => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;

            // Phase 1: Fetch (streaming to DB)
            let t_fetch = Instant::now();
            run_fetch(&conn, &settings).await?;
            println!("Fetched in {:.1}s", t_fetch.elapsed().as_secs_f64());

            // Phase 2: Process
            let t_process = Instant::now();
            run_process(&conn, &settings)?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let rows = db::get_stats(&conn)?;
            if rows.is_empty() {
                println!("Nothing fetched yet. Run 'fetch' first.");
            } else {
                println!("{:<26} | {:>5} | {:>5}", "Category", "Pages", "Posts");
                println!("{}", "-".repeat(42));
                for r in &rows {
                    println!("{:<26} | {:>5} | {:>5}", r.category, r.pages, r.posts);
                }
            }
            if std::path::Path::new(&settings.output_path).exists() {
                let c = store::load(&settings.output_path)?;
                println!("\nRecords in {}:", settings.output_path);
                for (name, n) in query::totals(&c) {
                    println!("  {:<26} {:>5}", name, n);
                }
            }
            Ok(())
        }
        Commands::Query { query } => {
            let c = store::load(&settings.output_path)?;
            run_query(&c, query)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run_fetch(conn: &rusqlite::Connection, settings: &Settings) -> Result<()> {
    let cleared = db::reset_raw_posts(conn)?;
    if cleared > 0 {
        println!("Cleared {} posts from the previous run", cleared);
    }
    println!("Fetching {} categories...", settings.categories.len());
    let stats = fetch::fetch_all_streaming(conn, settings).await?;
    println!("Done: {} pages, {} posts.", stats.pages, stats.posts);
    if !stats.failed.is_empty() {
        println!("Failed categories: {}", stats.failed.join(", "));
    }
    Ok(())
}

fn run_process(conn: &rusqlite::Connection, settings: &Settings) -> Result<()> {
    let layout = Layout {
        department_offset: settings.department_offset,
    };
    let mut stored = Vec::with_capacity(settings.categories.len());
    for name in settings.category_names() {
        let posts = db::fetch_category(conn, &name)?;
        stored.push((name, posts));
    }
    let total: usize = stored.iter().map(|(_, p)| p.len()).sum();
    if total == 0 {
        println!("No fetched posts. Run 'fetch' first.");
        return Ok(());
    }

    println!("Processing {} posts...", total);
    let (collection, counts) = assemble(settings.category_names(), &stored, layout)?;
    counts.print();
    if collection.is_empty() {
        warn!("No records were built; writing an empty collection");
    }
    store::save(&settings.output_path, &collection)?;
    println!("Wrote {}", settings.output_path);
    Ok(())
}

struct ProcessCounts {
    records: usize,
    skipped: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Built {} records, skipped {} documents.",
            self.records, self.skipped,
        );
    }
}

/// Build the collection from stored posts, one category after another.
///
/// Documents are processed in parallel in chunks; results are appended in
/// stored order. A document that cannot be decoded or built is skipped and
/// logged with its id; its siblings are unaffected.
fn assemble(
    categories: Vec<String>,
    stored: &[(String, Vec<db::StoredPost>)],
    layout: Layout,
) -> Result<(Collection, ProcessCounts)> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let total: usize = stored.iter().map(|(_, p)| p.len()).sum();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut collection = Collection::new(categories);
    let mut counts = ProcessCounts {
        records: 0,
        skipped: 0,
    };

    for (category, posts) in stored {
        for chunk in posts.chunks(500) {
            let results: Vec<Option<TechnologyRecord>> = chunk
                .par_iter()
                .map(|p| process_stored(category, p, layout))
                .collect();

            for result in results {
                match result {
                    Some(record) => {
                        collection.push(category, record)?;
                        counts.records += 1;
                    }
                    None => counts.skipped += 1,
                }
            }
            pb.inc(chunk.len() as u64);
        }
    }

    pb.finish_and_clear();
    Ok((collection, counts))
}

fn process_stored(category: &str, stored: &db::StoredPost, layout: Layout) -> Option<TechnologyRecord> {
    let post: RawPost = match serde_json::from_str(&stored.payload) {
        Ok(p) => p,
        Err(e) => {
            warn!(
                "{} page {} #{}: undecodable post: {}",
                category, stored.page, stored.position, e
            );
            return None;
        }
    };
    match parser::process_post(&post, layout) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("{} page {}: skipping: {}", category, stored.page, e);
            None
        }
    }
}

fn run_query(c: &Collection, query: QueryCommand) -> Result<()> {
    match query {
        QueryCommand::Categories => print_json(&query::categories(c)),
        QueryCommand::Category { name } => print_json(&query::by_category(c, &name)?),
        QueryCommand::Title { text } => print_json(&query::by_title(c, &text)),
        QueryCommand::Department { text } => print_json(&query::by_department(c, &text)),
        QueryCommand::Year { year } => print_json(&query::by_publication_year(c, year)?),
        QueryCommand::Inventor { name } => print_json(&query::by_inventor(c, &name)),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_fixture() -> Vec<db::StoredPost> {
        let raw = std::fs::read_to_string("tests/fixtures/posts_page.json").unwrap();
        let posts: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        posts
            .into_iter()
            .enumerate()
            .map(|(i, p)| db::StoredPost {
                page: 1,
                position: i as i64,
                payload: p.to_string(),
            })
            .collect()
    }

    #[test]
    fn bad_document_is_skipped_siblings_kept() {
        let stored = vec![("QUÍMICO".to_string(), stored_fixture())];
        let (c, counts) = assemble(vec!["QUÍMICO".into(), "TIC".into()], &stored, Layout::default()).unwrap();
        assert_eq!(counts.records, 2);
        assert_eq!(counts.skipped, 1);
        let ids: Vec<i64> = c.get("QUÍMICO").unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5012, 5014]);
        assert!(c.get("TIC").unwrap().is_empty());

        let first = &c.get("QUÍMICO").unwrap()[0];
        assert_eq!(first.department.as_deref(), Some("Departamento de Química Orgânica e Inorgânica"));
        let last = &c.get("QUÍMICO").unwrap()[1];
        assert_eq!(last.status.as_deref(), Some("Expirada"));
        assert_eq!(last.benefits, vec!["Biodegradável"]);
    }

    #[test]
    fn undecodable_payload_is_skipped() {
        let mut posts = stored_fixture();
        posts.insert(
            0,
            db::StoredPost {
                page: 1,
                position: 99,
                payload: "{not json".into(),
            },
        );
        let stored = vec![("QUÍMICO".to_string(), posts)];
        let (c, counts) = assemble(vec!["QUÍMICO".into()], &stored, Layout::default()).unwrap();
        assert_eq!(counts.skipped, 2);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn synthetic_documents_keep_count_and_order() {
        let cats = ["ALIMENTOS", "TIC", "SOFTWARE"];
        let n = 1234;
        let mut stored: Vec<(String, Vec<db::StoredPost>)> =
            cats.iter().map(|c| (c.to_string(), Vec::new())).collect();
        for id in 0..n {
            let post = serde_json::json!({
                "id": id,
                "date_gmt": "2020-01-01T00:00:00",
                "modified_gmt": "2020-01-01T00:00:00",
                "slug": format!("t{id}"),
                "link": format!("https://ufcinova.ufc.br/t{id}/"),
                "title": { "rendered": format!("T{id}") },
                "content": { "rendered": format!("<p>Status Vigente.</p><p>{id}</p>") }
            });
            let slot = &mut stored[(id % 3) as usize].1;
            slot.push(db::StoredPost {
                page: 1 + (slot.len() / 10) as u32,
                position: (slot.len() % 10) as i64,
                payload: post.to_string(),
            });
        }

        let names = cats.iter().map(|s| s.to_string()).collect();
        let (c, counts) = assemble(names, &stored, Layout::default()).unwrap();
        assert_eq!(counts.records, n as usize);
        assert_eq!(c.len(), n as usize);

        let json = serde_json::to_string(&c).unwrap();
        let back: Collection = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), n as usize);
        for (name, records) in back.iter() {
            let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
            let mut sorted = ids.clone();
            sorted.sort();
            assert_eq!(ids, sorted, "order changed in {name}");
        }
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(std::time::Duration::from_secs(75)), "1m 15s");
        assert_eq!(format_duration(std::time::Duration::from_secs(3725)), "1h 2m 5s");
    }
}
