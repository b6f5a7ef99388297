use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ParallelProgressIterator, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use fixture_match_scraper::assembler::AssemblyReport;
use fixture_match_scraper::fetch::{HtmlFetcher, WebHtmlFetcher};
use fixture_match_scraper::store::{self, JsonMatchStore};
use fixture_match_scraper::types::MatchFile;
use fixture_match_scraper::{FixtureScraper, Match, ScraperConfig, SourceFormat};

const CONCURRENT_REQUESTS: usize = 4;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract matches from one saved page, text dump or JSON file
    ProcessFile {
        /// Path to the source file
        #[arg(short, long)]
        file: PathBuf,
        /// URL the source was fetched from; drives tournament and round
        #[arg(short, long, default_value = "")]
        url: String,
        #[arg(long, value_enum, default_value_t = SourceFormat::Auto)]
        format: SourceFormat,
        /// Also write the matches as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Extract matches from every file in a directory, in parallel
    ProcessDir {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short, long, default_value = "")]
        url: String,
        #[arg(long, value_enum, default_value_t = SourceFormat::Auto)]
        format: SourceFormat,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Fetch round pages and extract their matches
    Scrape {
        /// Round page URLs
        #[arg(required = true)]
        urls: Vec<String>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Upsert a results file into the match store
    Ingest {
        #[arg(short, long)]
        file: PathBuf,
    },
}

struct FileProcessor {
    scraper: FixtureScraper,
}

impl FileProcessor {
    fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            scraper: FixtureScraper::new(config)?,
        })
    }

    fn process_file(
        &self,
        path: &Path,
        url: &str,
        format: SourceFormat,
    ) -> Result<(Vec<Match>, AssemblyReport)> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        info!("Processing {:?}", path);
        let outcome = self.scraper.parse_source(&content, url, format)?;
        Ok((outcome.matches, outcome.report))
    }

    fn process_dir(
        &self,
        dir: &Path,
        url: &str,
        format: SourceFormat,
    ) -> Result<(Vec<Match>, AssemblyReport)> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to list {:?}", dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| matches!(e, "html" | "htm" | "md" | "txt" | "json"))
            })
            .collect();
        files.sort();
        info!("Found {} source files in {:?}", files.len(), dir);

        let style = ProgressStyle::default_bar().template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files processed ({eta})",
        )?;

        let results: Vec<(Vec<Match>, AssemblyReport)> = files
            .par_iter()
            .progress_with_style(style)
            .filter_map(|path| match self.process_file(path, url, format) {
                Ok(result) => Some(result),
                Err(e) => {
                    error!("Failed to process {:?}: {:#}", path, e);
                    None
                }
            })
            .collect();

        let mut report = AssemblyReport::default();
        let mut matches = Vec::new();
        for (found, file_report) in results {
            report.merge(&file_report);
            matches.extend(found);
        }
        Ok((dedup_by_id(matches), report))
    }
}

/// Sources are assembled independently, so the same fixture can show up
/// once per file. The first file (by name) wins.
fn dedup_by_id(matches: Vec<Match>) -> Vec<Match> {
    let mut seen = HashSet::new();
    matches.into_iter().filter(|m| seen.insert(m.id.clone())).collect()
}

fn write_csv(path: &Path, matches: &[Match]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    wtr.write_record([
        "id",
        "tournament",
        "home_team",
        "away_team",
        "match_date",
        "round",
        "status",
        "home_score",
        "away_score",
        "venue",
        "city",
        "state",
        "match_url",
    ])?;

    for m in matches {
        let venue = m.venue.clone().unwrap_or_default();
        let goals = |g: Option<u32>| g.map(|g| g.to_string()).unwrap_or_default();
        wtr.write_record(&[
            m.id.clone(),
            m.tournament.clone(),
            m.home_team.clone(),
            m.away_team.clone(),
            m.match_date.map(|d| d.to_rfc3339()).unwrap_or_default(),
            m.round.clone(),
            m.status.to_string(),
            goals(m.score.home),
            goals(m.score.away),
            venue.name.unwrap_or_default(),
            venue.city.unwrap_or_default(),
            venue.state.unwrap_or_default(),
            m.match_url.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    info!("Wrote {} rows to {:?}", matches.len(), path);
    Ok(())
}

fn save_results(config: &ScraperConfig, matches: &[Match], csv: Option<&Path>) -> Result<()> {
    let path = store::write_results_file(&config.paths.results_dir, matches, &Local::now())?;
    info!("Total matches: {}", matches.len());
    info!("Saved to: {:?}", path);
    if let Some(csv) = csv {
        write_csv(csv, matches)?;
    }
    Ok(())
}

async fn scrape_urls(config: &ScraperConfig, urls: &[String]) -> Result<Vec<Match>> {
    let fetcher = WebHtmlFetcher::new(config)?;
    let scraper = FixtureScraper::new(config)?;

    // Any fetch failure fails the whole batch.
    let pages: Vec<(String, String)> = stream::iter(urls.iter().cloned())
        .map(|url| {
            let fetcher = &fetcher;
            async move {
                let html = fetcher.fetch_html(&url).await?;
                Ok::<_, anyhow::Error>((url, html))
            }
        })
        .buffered(CONCURRENT_REQUESTS)
        .try_collect()
        .await?;

    let mut matches = Vec::new();
    let mut report = AssemblyReport::default();
    for (url, html) in &pages {
        let outcome = scraper.parse_html(html, url);
        report.merge(&outcome.report);
        matches.extend(outcome.matches);
    }
    report.log_summary("all pages");
    Ok(dedup_by_id(matches))
}

fn ingest(config: &ScraperConfig, file: &Path) -> Result<()> {
    let raw = fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let results: MatchFile = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid results file {:?}", file))?;

    let mut store = JsonMatchStore::open_or_create(&config.paths.matches_file)?;
    store.upsert(&results.matches);
    store.save()
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ScraperConfig::from_env();

    match cli.command {
        Commands::ProcessFile { file, url, format, csv } => {
            let processor = FileProcessor::new(&config)?;
            let (matches, report) = processor.process_file(&file, &url, format)?;
            report.log_summary(&file.display().to_string());
            save_results(&config, &matches, csv.as_deref())?;
        }
        Commands::ProcessDir { dir, url, format, csv } => {
            let processor = FileProcessor::new(&config)?;
            let (matches, report) = processor.process_dir(&dir, &url, format)?;
            report.log_summary(&dir.display().to_string());
            save_results(&config, &matches, csv.as_deref())?;
        }
        Commands::Scrape { urls, csv } => {
            let rt = tokio::runtime::Runtime::new()?;
            let matches = rt.block_on(scrape_urls(&config, &urls))?;
            save_results(&config, &matches, csv.as_deref())?;
        }
        Commands::Ingest { file } => ingest(&config, &file)?,
    }

    Ok(())
}
