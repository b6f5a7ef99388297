use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::strategy::SourceContext;
use crate::utils::SourcePatterns;

static DATE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{1,2}/[0-9]{1,2}/[0-9]{4})\b").unwrap());

/// Running state of one sequential scan.
///
/// Round and date headers are siblings of the fixtures they label, so the
/// latest one seen applies to everything after it until the next header.
/// The tournament is fixed for the whole source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanContext {
    pub tournament: String,
    pub round: Option<String>,
    pub date: Option<String>,
}

pub struct ContextTracker<'a> {
    patterns: &'a SourcePatterns,
    current: ScanContext,
}

impl<'a> ContextTracker<'a> {
    pub fn new(source: &SourceContext<'a>) -> Self {
        Self {
            patterns: source.patterns,
            current: ScanContext {
                tournament: source.tournament.clone(),
                round: source.round.clone(),
                date: None,
            },
        }
    }

    pub fn current(&self) -> &ScanContext {
        &self.current
    }

    /// Feeds one header-shaped token. Returns whether the context moved.
    pub fn observe(&mut self, text: &str) -> bool {
        let mut changed = false;

        if let Some(round) = self.patterns.round_from_header(text) {
            if self.current.round.as_deref() != Some(round.as_str()) {
                debug!("Round header: {}", round);
                self.current.round = Some(round);
                changed = true;
            }
        }
        if let Some(caps) = DATE_HEADER.captures(text) {
            let date = caps[1].to_string();
            if self.current.date.as_deref() != Some(date.as_str()) {
                self.current.date = Some(date);
                changed = true;
            }
        }

        changed
    }

    /// Folds over `lines` in order: every line is observed first, then
    /// `emit` sees it together with the context in force at that point.
    pub fn scan<I, T, F>(&mut self, lines: I, mut emit: F) -> Vec<T>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        F: FnMut(&ScanContext, &str) -> Option<T>,
    {
        let mut out = Vec::new();
        for line in lines {
            let line = line.as_ref();
            self.observe(line);
            if let Some(item) = emit(&self.current, line) {
                out.push(item);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConventions;

    #[test]
    fn test_round_header_applies_until_next_header() {
        let patterns = SourcePatterns::new(&SourceConventions::default()).unwrap();
        let source = SourceContext {
            url: "",
            tournament: "paulistaa126".to_string(),
            round: Some("Jornada 1".to_string()),
            patterns: &patterns,
        };
        let mut tracker = ContextTracker::new(&source);

        let lines = [
            "Corinthians x Palmeiras",
            "RODADA 2",
            "Santos x Mirassol",
            "Sábado, 05/04/2026",
            "Novorizontino x Guarani",
            "Rodada 3",
            "Bragantino x Ponte Preta",
        ];
        let seen = tracker.scan(lines, |ctx, line| {
            line.contains(" x ")
                .then(|| (line.to_string(), ctx.round.clone(), ctx.date.clone()))
        });

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].1.as_deref(), Some("Jornada 1"));
        assert_eq!(seen[1].1.as_deref(), Some("Rodada 2"));
        assert_eq!(seen[1].2, None);
        assert_eq!(seen[2].1.as_deref(), Some("Rodada 2"));
        assert_eq!(seen[2].2.as_deref(), Some("05/04/2026"));
        assert_eq!(seen[3].1.as_deref(), Some("Rodada 3"));
        assert_eq!(tracker.current().tournament, "paulistaa126");
    }

    #[test]
    fn test_observe_reports_changes() {
        let patterns = SourcePatterns::new(&SourceConventions::default()).unwrap();
        let source = SourceContext {
            url: "",
            tournament: "t".to_string(),
            round: None,
            patterns: &patterns,
        };
        let mut tracker = ContextTracker::new(&source);
        assert!(tracker.observe("Jornada 4"));
        assert!(!tracker.observe("Jornada 4"));
        assert!(!tracker.observe("Corinthians x Palmeiras"));
    }
}
