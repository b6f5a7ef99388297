use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::ContextTracker;
use crate::strategy::{Candidate, ExtractionStrategy, SourceContext, SourceDocument, StrategyKind};
use crate::utils::find_stadium_text;

/// Start of a fixture block: a line or table cell opening with a date-time.
static BLOCK_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)(?:^|\|)[ \t]*[0-9]{1,2}[ \t]+\p{L}{3,4}\.?[ \t]+[0-9]{2}[ \t]+[0-9]{1,2}:[0-9]{2}",
    )
    .unwrap()
});

static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)([0-9]{1,2}\s+\p{L}{3,4}\.?\s+[0-9]{2})\s+([0-9]{1,2}:[0-9]{2})\s+(finalizado|sin comenzar|en juego|aplazado|suspendido|encerrado|ao vivo|adiado|suspenso)",
    )
    .unwrap()
});

static BRACKET_SCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([0-9]+)\s*-\s*([0-9]+)\]").unwrap());

/// Splits a text or markdown dump into one block per fixture.
pub struct BlockStrategy;

/// Byte ranges of the preamble and of every fixture block.
fn split_blocks(text: &str) -> (&str, Vec<&str>) {
    let starts: Vec<usize> = BLOCK_START.find_iter(text).map(|m| m.start()).collect();
    let Some(&first) = starts.first() else {
        return (text, Vec::new());
    };

    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        blocks.push(&text[start..end]);
    }
    (&text[..first], blocks)
}

impl BlockStrategy {
    fn parse_block(
        &self,
        block: &str,
        index: usize,
        source: &SourceContext<'_>,
        round: Option<&String>,
    ) -> Option<Candidate> {
        let anchor = ANCHOR.captures(block)?;

        let teams = source.patterns.markdown_team_labels(block);
        if teams.len() < 2 {
            return None;
        }

        let score = BRACKET_SCORE.captures(block).and_then(|caps| {
            Some((caps[1].parse::<u32>().ok()?, caps[2].parse::<u32>().ok()?))
        });

        let mut candidate = Candidate::new(StrategyKind::DelimitedBlock)
            .with_teams(&teams[0], &teams[1])
            .with_score(score);
        candidate.date_text = Some(anchor[1].to_string());
        candidate.time_text = Some(anchor[2].to_string());
        candidate.status_text = Some(anchor[3].to_string());
        candidate.match_url = source.patterns.find_fixture_path(block).map(str::to_string);
        candidate.venue_text = find_stadium_text(block);
        candidate.round = round.cloned();
        candidate.source_path = Some(format!("block[{}]", index));
        Some(candidate)
    }
}

impl ExtractionStrategy for BlockStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DelimitedBlock
    }

    fn extract(&self, document: SourceDocument<'_>, source: &SourceContext<'_>) -> Vec<Candidate> {
        let SourceDocument::Text(raw) = document else {
            return Vec::new();
        };

        let text = html_escape::decode_html_entities(raw);
        let (preamble, blocks) = split_blocks(&text);

        let mut tracker = ContextTracker::new(source);
        for line in preamble.lines() {
            tracker.observe(line);
        }

        let mut candidates = Vec::new();
        for (index, block) in blocks.into_iter().enumerate() {
            if let Some(candidate) =
                self.parse_block(block, index, source, tracker.current().round.as_ref())
            {
                candidates.push(candidate);
            }
            // A header at the tail of this block labels the blocks after it.
            for line in block.lines().skip(1) {
                tracker.observe(line);
            }
        }

        candidates
    }
}
