use anyhow::Result;
use clap::{Parser, Subcommand};
use retrace::pipeline::{PageRecord, PageRequest};
use retrace::{keys, IndexConfig, SearchIndex, SledStore};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputRecord {
    url: String,
    title: Option<String>,
    content: String,
    /// Visit timestamps, Unix milliseconds
    #[serde(default)]
    visits: Vec<u64>,
    /// Bookmark timestamps, Unix milliseconds
    #[serde(default)]
    bookmarks: Vec<u64>,
}

impl From<InputRecord> for PageRequest {
    fn from(rec: InputRecord) -> Self {
        PageRequest {
            page: PageRecord { url: rec.url, title: rec.title, content: rec.content },
            visits: rec.visits,
            bookmarks: rec.bookmarks,
        }
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Maintain the page/visit/bookmark full-text index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index page records from input JSON/JSONL files or a directory
    Index {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Index store directory
        #[arg(long)]
        store: String,
        /// Term-set size above which postings lookups use a prefix range scan
        #[arg(long, default_value_t = 3000)]
        range_scan_threshold: usize,
    },
    /// Attach a bookmark to an already indexed page
    Bookmark {
        /// Index store directory
        #[arg(long)]
        store: String,
        /// URL of the page to bookmark
        #[arg(long)]
        page_url: String,
        /// Bookmark time in Unix milliseconds (defaults to now)
        #[arg(long)]
        at: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Index { input, store, range_scan_threshold } => {
            index_files(&input, &store, range_scan_threshold).await
        }
        Commands::Bookmark { store, page_url, at } => bookmark(&store, &page_url, at).await,
    }
}

#[derive(Default)]
struct Stats {
    indexed: usize,
    skipped: usize,
    failed: usize,
    family_failures: usize,
}

async fn index_files(input: &str, store: &str, range_scan_threshold: usize) -> Result<()> {
    let input_path = Path::new(input);
    let config = IndexConfig { range_scan_threshold, ..IndexConfig::default() };
    let index = SearchIndex::with_config(SledStore::open(store)?, config);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }

    let mut stats = Stats::default();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&file, &index, &mut stats).await?;
        } else {
            index_json(&file, &index, &mut stats).await?;
        }
    }

    tracing::info!(
        indexed = stats.indexed,
        skipped = stats.skipped,
        failed = stats.failed,
        family_failures = stats.family_failures,
        "indexing complete"
    );
    index.shutdown().await;
    Ok(())
}

async fn index_jsonl(file: &Path, index: &SearchIndex<SledStore>, stats: &mut Stats) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: InputRecord = serde_json::from_str(&line)?;
        submit(rec, index, stats).await;
    }
    Ok(())
}

async fn index_json(file: &Path, index: &SearchIndex<SledStore>, stats: &mut Stats) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let rec: InputRecord = serde_json::from_value(v)?;
                submit(rec, index, stats).await;
            }
        }
        serde_json::Value::Object(_) => {
            let rec: InputRecord = serde_json::from_value(json)?;
            submit(rec, index, stats).await;
        }
        _ => {}
    }
    Ok(())
}

async fn submit(rec: InputRecord, index: &SearchIndex<SledStore>, stats: &mut Stats) {
    let url = rec.url.clone();
    match index.add_page(rec.into()).await {
        Ok(outcome) if outcome.indexed => {
            stats.indexed += 1;
            stats.family_failures += outcome.failures.len();
        }
        Ok(outcome) if outcome.is_clean() => {
            tracing::debug!(%url, page = %outcome.page_id, "skipped, no extractable terms");
            stats.skipped += 1;
        }
        Ok(outcome) => {
            tracing::warn!(%url, page = %outcome.page_id, "page merge failed, nothing indexed");
            stats.failed += 1;
            stats.family_failures += outcome.failures.len();
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "failed to index record");
            stats.failed += 1;
        }
    }
}

async fn bookmark(store: &str, page_url: &str, at: Option<u64>) -> Result<()> {
    let index = SearchIndex::new(SledStore::open(store)?);
    let page_id = keys::page_id(&keys::normalize_url(page_url));
    index.add_bookmark(&page_id, at).await?;
    tracing::info!(%page_url, %page_id, "bookmark attached");
    index.shutdown().await;
    Ok(())
}
