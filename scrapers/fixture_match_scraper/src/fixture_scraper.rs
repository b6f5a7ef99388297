use anyhow::{Context, Result};
use clap::ValueEnum;
use scraper::Html;
use serde_json::Value;

use crate::alias::AliasMap;
use crate::assembler::{AssemblyReport, MatchAssembler};
use crate::block_strategy::BlockStrategy;
use crate::config::ScraperConfig;
use crate::json_strategy::JsonStrategy;
use crate::strategy::{collect_candidates, ExtractionStrategy, SourceContext, SourceDocument};
use crate::table_strategy::TableStrategy;
use crate::text_strategy::TextStrategy;
use crate::types::Match;
use crate::utils::SourcePatterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceFormat {
    #[default]
    Auto,
    Html,
    Text,
    Json,
}

impl SourceFormat {
    pub fn detect(content: &str) -> SourceFormat {
        let trimmed = content.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if serde_json::from_str::<Value>(trimmed).is_ok() {
                return SourceFormat::Json;
            }
        }
        let head: String = trimmed.chars().take(2048).collect::<String>().to_lowercase();
        if head.starts_with("<!doctype")
            || head.contains("<html")
            || head.contains("<table")
            || head.contains("<body")
        {
            SourceFormat::Html
        } else {
            SourceFormat::Text
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub matches: Vec<Match>,
    pub report: AssemblyReport,
}

/// One extraction pipeline: every strategy over one source, then assembly.
///
/// Holds no per-run state, so one instance can serve many sources from
/// many threads.
pub struct FixtureScraper {
    config: ScraperConfig,
    patterns: SourcePatterns,
    aliases: AliasMap,
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl FixtureScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let aliases = AliasMap::load(config.paths.alias_table.as_deref())?;
        Self::with_aliases(config, aliases)
    }

    pub fn with_aliases(config: &ScraperConfig, aliases: AliasMap) -> Result<Self> {
        let patterns = SourcePatterns::new(&config.source).context("Invalid source conventions")?;
        Ok(Self {
            config: config.clone(),
            patterns,
            aliases,
            strategies: vec![
                Box::new(TableStrategy),
                Box::new(BlockStrategy),
                Box::new(JsonStrategy),
                Box::new(TextStrategy),
            ],
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Tournament and starting round come from the URL alone.
    pub fn source_context<'a>(&'a self, url: &'a str) -> SourceContext<'a> {
        SourceContext {
            url,
            tournament: self
                .patterns
                .tournament_from_url(url)
                .unwrap_or_else(|| self.config.defaults.tournament.clone()),
            round: self.patterns.round_from_url(url),
            patterns: &self.patterns,
        }
    }

    fn run(&self, document: SourceDocument<'_>, url: &str) -> ScrapeOutcome {
        let source = self.source_context(url);
        let candidates = collect_candidates(&self.strategies, document, &source);

        let mut assembler =
            MatchAssembler::new(&self.patterns, &self.config.parsing, &self.config.defaults)
                .with_aliases(&self.aliases);
        let matches = assembler.assemble(candidates, &source);
        let report = assembler.into_report();
        report.log_summary(url);

        ScrapeOutcome { matches, report }
    }

    pub fn parse_html(&self, html: &str, url: &str) -> ScrapeOutcome {
        let document = Html::parse_document(html);
        self.run(SourceDocument::Html(&document), url)
    }

    pub fn parse_text(&self, text: &str, url: &str) -> ScrapeOutcome {
        self.run(SourceDocument::Text(text), url)
    }

    pub fn parse_json(&self, value: &Value, url: &str) -> ScrapeOutcome {
        self.run(SourceDocument::Json(value), url)
    }

    pub fn parse_source(
        &self,
        content: &str,
        url: &str,
        format: SourceFormat,
    ) -> Result<ScrapeOutcome> {
        let format = match format {
            SourceFormat::Auto => SourceFormat::detect(content),
            explicit => explicit,
        };
        Ok(match format {
            SourceFormat::Json => {
                let value: Value =
                    serde_json::from_str(content).context("Source is not valid JSON")?;
                self.parse_json(&value, url)
            }
            SourceFormat::Text => self.parse_text(content, url),
            SourceFormat::Html | SourceFormat::Auto => self.parse_html(content, url),
        })
    }
}
