use once_cell::sync::Lazy;
use scraper::Selector;
use serde_json::{Map, Value};
use tracing::debug;

use crate::strategy::{Candidate, ExtractionStrategy, SourceContext, SourceDocument, StrategyKind};
use crate::utils::parse_score;

static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"script#__NEXT_DATA__, script[type="application/json"], script[type="application/ld+json"]"#,
    )
    .unwrap()
});

/// A key containing any of these marks its value as match payload.
const PAYLOAD_KEYWORDS: &[&str] = &[
    "match", "game", "jogo", "partida", "partido", "fixture", "rodada", "jornada", "round",
];

const HOME_KEYS: &[&str] = &["homeTeam", "home", "mandante", "local", "equipoLocal", "timeCasa"];
const AWAY_KEYS: &[&str] = &[
    "awayTeam",
    "away",
    "visitante",
    "visitor",
    "equipoVisitante",
    "timeFora",
];
const NAME_KEYS: &[&str] = &["name", "shortName", "longName", "nome", "nombre", "slug"];
const DATE_KEYS: &[&str] = &[
    "matchDate", "startDate", "utcTime", "date", "data", "fecha", "kickoff",
];
const TIME_KEYS: &[&str] = &["time", "hora", "horario"];
const URL_KEYS: &[&str] = &["matchURL", "matchUrl", "pageUrl", "url", "link"];
const VENUE_KEYS: &[&str] = &["venue", "stadium", "estadio", "location"];
const ROUND_KEYS: &[&str] = &["round", "roundName", "rodada", "jornada"];

/// Walks a JSON tree for football-shaped payloads, either given directly
/// or embedded in the `<script>` blocks of an HTML page.
pub struct JsonStrategy;

fn is_payload_key(key: &str) -> bool {
    let key = key.to_lowercase();
    PAYLOAD_KEYWORDS.iter().any(|kw| key.contains(kw))
}

fn is_sports_event(map: &Map<String, Value>) -> bool {
    map.get("@type")
        .and_then(Value::as_str)
        .map_or(false, |t| t.ends_with("Event"))
}

fn first<'v>(map: &'v Map<String, Value>, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().find_map(|k| map.get(*k)).filter(|v| !v.is_null())
}

fn first_str(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first(map, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_goals(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn team_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => first_str(map, NAME_KEYS),
        _ => None,
    }
}

fn team_goals(value: &Value) -> Option<u32> {
    value.as_object()?.get("score").and_then(as_goals)
}

fn round_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            let s = s.trim();
            Some(match s.parse::<u32>() {
                Ok(n) => format!("Jornada {}", n),
                Err(_) => s.to_string(),
            })
        }
        Value::Number(n) => n.as_u64().map(|n| format!("Jornada {}", n)),
        _ => None,
    }
}

/// Feed records carry `status` as an object of flags; flat ones as a word.
fn status_text(status: &Value) -> Option<String> {
    match status {
        Value::String(s) => Some(s.clone()),
        Value::Object(flags) => {
            let flag = |k: &str| flags.get(k).and_then(Value::as_bool).unwrap_or(false);
            let text = if flag("cancelled") {
                "postponed"
            } else if flag("finished") {
                "finished"
            } else if flag("ongoing") || flag("started") {
                "live"
            } else {
                "scheduled"
            };
            Some(text.to_string())
        }
        _ => None,
    }
}

fn score_of(map: &Map<String, Value>, home: &Value, away: &Value) -> (Option<u32>, Option<u32>) {
    match map.get("score") {
        Some(Value::Object(score)) => {
            return (
                score.get("home").and_then(as_goals),
                score.get("away").and_then(as_goals),
            )
        }
        Some(Value::String(text)) => {
            if let Ok((h, a)) = parse_score(text) {
                return (Some(h), Some(a));
            }
        }
        _ => {}
    }

    let nested = (team_goals(home), team_goals(away));
    if nested.0.is_some() || nested.1.is_some() {
        return nested;
    }

    let flat = (
        first(map, &["homeScore", "golsMandante", "golesLocal"]).and_then(as_goals),
        first(map, &["awayScore", "golsVisitante", "golesVisitante"]).and_then(as_goals),
    );
    if flat.0.is_some() || flat.1.is_some() {
        return flat;
    }

    map.get("status")
        .and_then(|s| s.get("scoreStr"))
        .and_then(Value::as_str)
        .and_then(|s| parse_score(s).ok())
        .map_or((None, None), |(h, a)| (Some(h), Some(a)))
}

fn record_candidate(
    map: &Map<String, Value>,
    path: &str,
    inherited_round: Option<&String>,
) -> Option<Candidate> {
    let home = first(map, HOME_KEYS)?;
    let away = first(map, AWAY_KEYS)?;
    let (home_name, away_name) = (team_name(home)?, team_name(away)?);

    let mut candidate = Candidate::new(StrategyKind::EmbeddedData).with_teams(home_name, away_name);
    let (home_score, away_score) = score_of(map, home, away);
    candidate.home_score = home_score;
    candidate.away_score = away_score;

    candidate.date_text = first_str(map, DATE_KEYS).or_else(|| {
        map.get("status")
            .and_then(|s| s.get("utcTime"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    candidate.time_text = first_str(map, TIME_KEYS);
    candidate.status_text = map.get("status").and_then(status_text);
    candidate.match_url = first_str(map, URL_KEYS);
    candidate.venue_text = first(map, VENUE_KEYS).and_then(team_name);
    candidate.round = first(map, ROUND_KEYS)
        .and_then(round_label)
        .or_else(|| inherited_round.cloned());
    candidate.source_path = Some(path.to_string());
    Some(candidate)
}

fn walk(
    value: &Value,
    path: &str,
    in_payload: bool,
    round: Option<&String>,
    out: &mut Vec<Candidate>,
) {
    match value {
        Value::Object(map) => {
            if in_payload || is_sports_event(map) {
                if let Some(candidate) = record_candidate(map, path, round) {
                    out.push(candidate);
                    return;
                }
            }

            let local_round = first(map, ROUND_KEYS).and_then(round_label);
            let round = local_round.as_ref().or(round);
            for (key, child) in map {
                if child.is_object() || child.is_array() {
                    let child_path = format!("{}.{}", path, key);
                    walk(child, &child_path, in_payload || is_payload_key(key), round, out);
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{}[{}]", path, i), in_payload, round, out);
            }
        }
        _ => {}
    }
}

/// Every payload record under `root`, in document order.
pub fn candidates_from_value(
    root: &Value,
    root_path: &str,
    round: Option<&String>,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    walk(root, root_path, false, round, &mut out);
    out
}

impl ExtractionStrategy for JsonStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EmbeddedData
    }

    fn extract(&self, document: SourceDocument<'_>, source: &SourceContext<'_>) -> Vec<Candidate> {
        let round = source.round.as_ref();
        match document {
            SourceDocument::Json(value) => candidates_from_value(value, "$", round),
            SourceDocument::Html(html) => {
                let mut out = Vec::new();
                for (i, script) in html.select(&SCRIPT_SELECTOR).enumerate() {
                    let body = script.text().collect::<String>();
                    match serde_json::from_str::<Value>(&body) {
                        Ok(value) => {
                            let path = format!("script[{}]", i);
                            out.extend(candidates_from_value(&value, &path, round))
                        }
                        Err(e) => debug!("Skipping unparseable script block {}: {}", i, e),
                    }
                }
                out
            }
            SourceDocument::Text(_) => Vec::new(),
        }
    }
}
