use scraper::Html;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

use crate::utils::SourcePatterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Tabular,
    DelimitedBlock,
    EmbeddedData,
    GenericText,
}

impl StrategyKind {
    /// Candidate precedence for deduplication: when two strategies see the
    /// same team pair, the one listed first here wins.
    pub const PRIORITY: [StrategyKind; 4] = [
        StrategyKind::Tabular,
        StrategyKind::DelimitedBlock,
        StrategyKind::EmbeddedData,
        StrategyKind::GenericText,
    ];

    pub fn priority(self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(Self::PRIORITY.len())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Tabular => "tabular",
            StrategyKind::DelimitedBlock => "delimited_block",
            StrategyKind::EmbeddedData => "embedded_data",
            StrategyKind::GenericText => "generic_text",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, unvalidated fields one strategy found for one fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub strategy: StrategyKind,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub date_text: Option<String>,
    pub time_text: Option<String>,
    pub status_text: Option<String>,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub match_url: Option<String>,
    pub venue_text: Option<String>,
    pub round: Option<String>,
    /// Where in the source this came from (JSON path, row index). Tracing only.
    pub source_path: Option<String>,
}

impl Candidate {
    pub fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            home_team: None,
            away_team: None,
            date_text: None,
            time_text: None,
            status_text: None,
            home_score: None,
            away_score: None,
            match_url: None,
            venue_text: None,
            round: None,
            source_path: None,
        }
    }

    pub fn with_teams(mut self, home: impl Into<String>, away: impl Into<String>) -> Self {
        self.home_team = Some(home.into());
        self.away_team = Some(away.into());
        self
    }

    pub fn with_score(mut self, score: Option<(u32, u32)>) -> Self {
        if let Some((home, away)) = score {
            self.home_score = Some(home);
            self.away_score = Some(away);
        }
        self
    }

    pub fn has_text_teams(&self) -> bool {
        let present = |t: &Option<String>| t.as_deref().map_or(false, |s| !s.trim().is_empty());
        present(&self.home_team) && present(&self.away_team)
    }
}

/// One source as handed to the strategies. Each strategy picks the shapes
/// it understands and returns nothing for the rest.
#[derive(Clone, Copy)]
pub enum SourceDocument<'d> {
    Html(&'d Html),
    Text(&'d str),
    Json(&'d Value),
}

/// Per-source facts derived once from the source URL.
#[derive(Debug, Clone)]
pub struct SourceContext<'a> {
    pub url: &'a str,
    pub tournament: String,
    pub round: Option<String>,
    pub patterns: &'a SourcePatterns,
}

pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn extract(&self, document: SourceDocument<'_>, source: &SourceContext<'_>) -> Vec<Candidate>;
}

/// Runs every strategy and unions the output, ordered by
/// [`StrategyKind::PRIORITY`] whatever order the strategies were given in.
/// Within one strategy, document order is kept.
pub fn collect_candidates(
    strategies: &[Box<dyn ExtractionStrategy>],
    document: SourceDocument<'_>,
    source: &SourceContext<'_>,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for strategy in strategies {
        let found = strategy.extract(document, source);
        debug!("{} strategy yielded {} candidates", strategy.kind(), found.len());
        candidates.extend(found);
    }
    candidates.sort_by_key(|c| c.strategy.priority());
    candidates
}
