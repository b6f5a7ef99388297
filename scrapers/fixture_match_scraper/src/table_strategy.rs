use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::context::ContextTracker;
use crate::strategy::{Candidate, ExtractionStrategy, SourceContext, SourceDocument, StrategyKind};
use crate::utils::{collapse_whitespace, find_stadium_text, parse_score};

static SCAN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, caption, tr").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img[alt]").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());

/// `<day> <month-abbrev> <yy> <HH:MM>`, adjacent.
static ROW_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2}\s+\p{L}{3,4}\.?\s+[0-9]{2})\s+([0-9]{1,2}:[0-9]{2})").unwrap()
});
static KICKOFF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,2}:[0-9]{2}$").unwrap());

/// Rows with two or more distinct team links are fixtures; every other
/// header or row feeds the round context.
pub struct TableStrategy;

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn team_label(link: &ElementRef, href: &str) -> String {
    let text = element_text(link);
    if !text.is_empty() {
        return text;
    }
    if let Some(title) = link.value().attr("title") {
        return title.trim().to_string();
    }
    if let Some(alt) = link
        .select(&IMG_SELECTOR)
        .next()
        .and_then(|img| img.value().attr("alt"))
    {
        return alt.trim().to_string();
    }
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

impl TableStrategy {
    fn parse_row(
        &self,
        row: &ElementRef,
        index: usize,
        source: &SourceContext<'_>,
        round: Option<&String>,
    ) -> Option<Candidate> {
        let mut team_links: Vec<(String, String)> = Vec::new();
        let mut fixture_link: Option<(String, String)> = None;

        for link in row.select(&LINK_SELECTOR) {
            let href = link.value().attr("href").unwrap_or_default();
            if source.patterns.is_fixture_href(href) {
                if fixture_link.is_none() {
                    fixture_link = Some((href.to_string(), element_text(&link)));
                }
            } else if source.patterns.is_team_href(href)
                && !team_links.iter().any(|(seen, _)| seen == href)
            {
                team_links.push((href.to_string(), team_label(&link, href)));
            }
        }

        if team_links.len() < 2 {
            return None;
        }

        let row_text = element_text(row);
        let mut candidate =
            Candidate::new(StrategyKind::Tabular).with_teams(&team_links[0].1, &team_links[1].1);

        if let Some(caps) = ROW_DATETIME.captures(&row_text) {
            candidate.date_text = Some(caps[1].to_string());
            candidate.time_text = Some(caps[2].to_string());
        }

        if let Some((href, text)) = fixture_link {
            // Unplayed fixtures show the kick-off time where the score goes.
            if !KICKOFF.is_match(&text) {
                candidate = candidate.with_score(parse_score(&text).ok());
            }
            candidate.match_url = Some(href);
        }

        candidate.status_text = Some(row_text.clone());
        candidate.venue_text = row
            .select(&CELL_SELECTOR)
            .find_map(|cell| find_stadium_text(&element_text(&cell)));
        candidate.round = round.cloned();
        candidate.source_path = Some(format!("tr[{}]", index));
        Some(candidate)
    }
}

impl ExtractionStrategy for TableStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Tabular
    }

    fn extract(&self, document: SourceDocument<'_>, source: &SourceContext<'_>) -> Vec<Candidate> {
        let SourceDocument::Html(html) = document else {
            return Vec::new();
        };

        let mut tracker = ContextTracker::new(source);
        let mut candidates = Vec::new();

        for (index, element) in html.select(&SCAN_SELECTOR).enumerate() {
            let is_row = element.value().name() == "tr";
            let parsed = if is_row {
                self.parse_row(&element, index, source, tracker.current().round.as_ref())
            } else {
                None
            };

            match parsed {
                Some(candidate) => candidates.push(candidate),
                None => {
                    tracker.observe(&element_text(&element));
                }
            }
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConventions;
    use crate::utils::SourcePatterns;
    use pretty_assertions::assert_eq;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
        <h2>Jornada 5</h2>
        <table>
          <tr><th>Fecha</th><th>Local</th><th></th><th>Visitante</th></tr>
          <tr>
            <td>05 abr 26 16:00</td>
            <td><a href="/equipo/corinthians">Corinthians</a></td>
            <td><a href="/partido/corinthians/palmeiras/2026123">16:00</a></td>
            <td><a href="/equipo/palmeiras">Palmeiras</a></td>
            <td>Estádio Neo Química Arena</td>
            <td>Sin comenzar</td>
          </tr>
          <tr>
            <td>04 abr 26 18:30</td>
            <td><a href="/equipo/santos-fc" title="Santos"><img alt="Santos"></a></td>
            <td><a href="/partido/santos-fc/mirassol/2026122">2 - 1</a></td>
            <td><a href="/equipo/mirassol">Mirassol</a></td>
            <td>Finalizado</td>
          </tr>
          <tr><td><a href="/equipo/guarani">Guarani</a></td><td><a href="/equipo/guarani">Guarani</a></td></tr>
        </table>
        <h2>Jornada 6</h2>
        <table>
          <tr>
            <td>12 abr 26 16:00</td>
            <td><a href="/equipo/ponte-preta">Ponte Preta</a></td>
            <td><a href="/equipo/guarani">Guarani</a></td>
          </tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_extract_rows_with_round_headers() {
        let patterns = SourcePatterns::new(&SourceConventions::default()).unwrap();
        let source = SourceContext {
            url: "",
            tournament: "paulistaa126".to_string(),
            round: Some("Jornada 1".to_string()),
            patterns: &patterns,
        };
        let html = Html::parse_document(PAGE);

        let candidates = TableStrategy.extract(SourceDocument::Html(&html), &source);
        assert_eq!(candidates.len(), 3);

        let first = &candidates[0];
        assert_eq!(first.home_team.as_deref(), Some("Corinthians"));
        assert_eq!(first.away_team.as_deref(), Some("Palmeiras"));
        assert_eq!(first.date_text.as_deref(), Some("05 abr 26"));
        assert_eq!(first.time_text.as_deref(), Some("16:00"));
        assert_eq!(first.home_score, None);
        assert_eq!(first.round.as_deref(), Some("Jornada 5"));
        assert_eq!(first.venue_text.as_deref(), Some("Estádio Neo Química Arena"));
        assert_eq!(
            first.match_url.as_deref(),
            Some("/partido/corinthians/palmeiras/2026123")
        );

        let second = &candidates[1];
        assert_eq!(second.home_team.as_deref(), Some("Santos"));
        assert_eq!((second.home_score, second.away_score), (Some(2), Some(1)));

        assert_eq!(candidates[2].round.as_deref(), Some("Jornada 6"));
        assert_eq!(candidates[2].match_url, None);
    }

    #[test]
    fn test_ignores_non_html_sources() {
        let patterns = SourcePatterns::new(&SourceConventions::default()).unwrap();
        let source = SourceContext {
            url: "",
            tournament: "t".to_string(),
            round: None,
            patterns: &patterns,
        };
        assert!(TableStrategy
            .extract(SourceDocument::Text("| 05 abr 26 16:00 |"), &source)
            .is_empty());
    }
}
