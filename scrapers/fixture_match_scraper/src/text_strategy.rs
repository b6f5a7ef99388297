use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;

use crate::context::{ContextTracker, ScanContext};
use crate::strategy::{Candidate, ExtractionStrategy, SourceContext, SourceDocument, StrategyKind};
use crate::utils::{collapse_whitespace, find_stadium_text};

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "li", "tr", "br", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "table", "ul", "ol",
];

static SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+(?:x|X|vs\.?|VS|Vs\.?)\s+|\s*✕\s*").unwrap());
static LEADING_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:([0-9]{1,2}/[0-9]{1,2}/[0-9]{4})[\s,-]*)?(?:([0-9]{1,2}[:hH][0-9]{2})\s*)?(?:[-–|•·]\s*)?",
    )
    .unwrap()
});
static TRAILING_GOALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([0-9]{1,2})$").unwrap());
static LEADING_GOALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2})\s+").unwrap());
static TRAILING_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-–|•·]\s+|\s*\(").unwrap());
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());

const MAX_TEAM_NAME_LEN: usize = 48;

/// Line-oriented fallback for pages with no usable structure.
pub struct TextStrategy;

fn push_visible_text(element: ElementRef<'_>, buf: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            buf.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }
            // Inline elements and table cells stay on their parent's line.
            let boundary = if BLOCK_TAGS.contains(&name) { '\n' } else { ' ' };
            buf.push(boundary);
            push_visible_text(child_element, buf);
            buf.push(boundary);
        }
    }
}

/// Rendered text of a page, one non-empty line per block element.
pub fn visible_lines(html: &scraper::Html) -> Vec<String> {
    let mut buf = String::new();
    push_visible_text(html.root_element(), &mut buf);
    buf.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect()
}

fn clean_team_name(raw: &str) -> Option<String> {
    let name = raw.trim_matches(|c: char| !c.is_alphanumeric());
    let has_letter = name.chars().any(char::is_alphabetic);
    (has_letter && name.chars().count() <= MAX_TEAM_NAME_LEN).then(|| name.to_string())
}

fn parse_fixture_line(line: &str, context: &ScanContext, index: usize) -> Option<Candidate> {
    let separator = SEPARATOR.find(line)?;
    let (left, right) = (&line[..separator.start()], &line[separator.end()..]);

    let lead = LEADING_DATETIME.captures(left)?;
    let date_text = lead.get(1).map(|m| m.as_str().to_string());
    let time_text = lead.get(2).map(|m| m.as_str().to_string());
    let mut home = &left[lead.get(0).map_or(0, |m| m.end())..];

    let mut home_score = None;
    if let Some(caps) = TRAILING_GOALS.captures(home) {
        home_score = caps[1].parse::<u32>().ok();
        home = &home[..caps.get(0).map_or(home.len(), |m| m.start())];
    }

    let mut away = right;
    let mut away_score = None;
    if let Some(caps) = LEADING_GOALS.captures(away) {
        away_score = caps[1].parse::<u32>().ok();
        away = &away[caps.get(0).map_or(0, |m| m.end())..];
    }
    if let Some(noise) = TRAILING_NOISE.find(away) {
        away = &away[..noise.start()];
    }

    let home = clean_team_name(home)?;
    let away = clean_team_name(away)?;

    let mut candidate = Candidate::new(StrategyKind::GenericText).with_teams(home, away);
    candidate.home_score = home_score;
    candidate.away_score = away_score;
    candidate.date_text = date_text.or_else(|| context.date.clone());
    candidate.time_text = time_text;
    candidate.status_text = Some(line.to_string());
    candidate.venue_text = find_stadium_text(line);
    candidate.round = context.round.clone();
    candidate.source_path = Some(format!("line[{}]", index));
    Some(candidate)
}

impl ExtractionStrategy for TextStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::GenericText
    }

    fn extract(&self, document: SourceDocument<'_>, source: &SourceContext<'_>) -> Vec<Candidate> {
        let lines: Vec<String> = match document {
            SourceDocument::Html(html) => visible_lines(html),
            SourceDocument::Text(text) => html_escape::decode_html_entities(text)
                .lines()
                .map(|line| collapse_whitespace(&MARKDOWN_LINK.replace_all(line, "$1")))
                .filter(|line| !line.is_empty())
                .collect(),
            SourceDocument::Json(_) => return Vec::new(),
        };

        let mut tracker = ContextTracker::new(source);
        let mut index = 0;
        tracker.scan(&lines, |context, line| {
            index += 1;
            parse_fixture_line(line, context, index - 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConventions;
    use crate::utils::SourcePatterns;
    use pretty_assertions::assert_eq;
    use scraper::Html;

    fn context() -> ScanContext {
        ScanContext {
            tournament: "t".to_string(),
            round: Some("Rodada 2".to_string()),
            date: Some("05/04/2026".to_string()),
        }
    }

    #[test]
    fn test_parse_fixture_line_shapes() {
        let c = parse_fixture_line("16:00 Corinthians x Palmeiras", &context(), 0).unwrap();
        assert_eq!(c.home_team.as_deref(), Some("Corinthians"));
        assert_eq!(c.away_team.as_deref(), Some("Palmeiras"));
        assert_eq!(c.time_text.as_deref(), Some("16:00"));
        assert_eq!(c.date_text.as_deref(), Some("05/04/2026"));
        assert_eq!(c.round.as_deref(), Some("Rodada 2"));

        let line = "São Paulo 2 x 1 Santos - Estádio do Morumbi";
        let c = parse_fixture_line(line, &context(), 1).unwrap();
        assert_eq!(c.home_team.as_deref(), Some("São Paulo"));
        assert_eq!(c.away_team.as_deref(), Some("Santos"));
        assert_eq!((c.home_score, c.away_score), (Some(2), Some(1)));
        assert_eq!(c.venue_text.as_deref(), Some("Estádio do Morumbi"));

        let c = parse_fixture_line("12/04/2026 18h30 Botafogo ✕ Vasco", &context(), 2).unwrap();
        assert_eq!(c.date_text.as_deref(), Some("12/04/2026"));
        assert_eq!(c.time_text.as_deref(), Some("18h30"));
        assert_eq!(c.away_team.as_deref(), Some("Vasco"));

        let c = parse_fixture_line("Flamengo vs. Fluminense (Maracanã)", &context(), 3).unwrap();
        assert_eq!(c.away_team.as_deref(), Some("Fluminense"));

        assert!(parse_fixture_line("Sem jogos hoje", &context(), 4).is_none());
        assert!(parse_fixture_line("10 x 20", &context(), 5).is_none());
    }

    #[test]
    fn test_extract_from_rendered_page() {
        let html = Html::parse_document(
            r#"<html><head><script>var x = "A x B";</script></head><body>
               <h3>RODADA 7</h3>
               <div><span>Sábado, 05/04/2026</span></div>
               <p>16:00 Corinthians x Palmeiras</p>
               <p>Notícias do dia</p>
               <h3>RODADA 8</h3>
               <p>Santos <b>x</b> Mirassol</p>
               </body></html>"#,
        );
        let patterns = SourcePatterns::new(&SourceConventions::default()).unwrap();
        let source = SourceContext {
            url: "",
            tournament: "paulistaa126".to_string(),
            round: None,
            patterns: &patterns,
        };

        let candidates = TextStrategy.extract(SourceDocument::Html(&html), &source);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].round.as_deref(), Some("Rodada 7"));
        assert_eq!(candidates[0].date_text.as_deref(), Some("05/04/2026"));
        assert_eq!(candidates[1].home_team.as_deref(), Some("Santos"));
        assert_eq!(candidates[1].round.as_deref(), Some("Rodada 8"));
    }
    #[test]
    fn test_extract_from_span_cards() {
        let html = Html::parse_document(
            r#"<html><body>
               <h2>Rodada 3</h2>
               <div class="jogo"><span>Corinthians</span> <span>✕</span> <span>Palmeiras</span></div>
               <div class="jogo"><span class="hora">18h30</span><span>Santos</span><span>✕</span><span>Mirassol</span></div>
               <table><tr><td>Botafogo</td><td>x</td><td>Vasco</td></tr></table>
               </body></html>"#,
        );
        let patterns = SourcePatterns::new(&SourceConventions::default()).unwrap();
        let source = SourceContext {
            url: "",
            tournament: "carioca26".to_string(),
            round: None,
            patterns: &patterns,
        };

        let candidates = TextStrategy.extract(SourceDocument::Html(&html), &source);
        let pairs: Vec<(&str, &str)> = candidates
            .iter()
            .map(|c| (c.home_team.as_deref().unwrap(), c.away_team.as_deref().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![("Corinthians", "Palmeiras"), ("Santos", "Mirassol"), ("Botafogo", "Vasco")]
        );
        assert_eq!(candidates[1].time_text.as_deref(), Some("18h30"));
        assert_eq!(candidates[0].round.as_deref(), Some("Rodada 3"));
    }
}
