use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::config::{ParsingOptions, SourceConventions};
use crate::types::{MatchStatus, Venue};

static WS_OR_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());
static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static MULTI_HYPHEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());
static SCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+)\s*[-:–]\s*([0-9]+)").unwrap());
static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2})/([0-9]{1,2})/([0-9]{4})$").unwrap());
static CLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,2})[:hH]([0-9]{2})$").unwrap());
static STADIUM_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Est[aá]dio[^|<\n\[\]]+").unwrap());

/// Ordered keyword groups; the first group with a hit decides the status.
static STATUS_GROUPS: Lazy<Vec<(MatchStatus, Regex)>> = Lazy::new(|| {
    vec![
        (
            MatchStatus::Finished,
            Regex::new(r"(?i)\b(finalizado|finalizada|fin|terminado|encerrado|finished|ft)\b")
                .unwrap(),
        ),
        (
            MatchStatus::Scheduled,
            Regex::new(r"(?i)\b(sin comenzar|próximo|proximo|programado|agendado|scheduled)\b")
                .unwrap(),
        ),
        (
            MatchStatus::Live,
            Regex::new(r"(?i)\b(en juego|en vivo|ao vivo|live)\b").unwrap(),
        ),
        (
            MatchStatus::Postponed,
            Regex::new(r"(?i)\b(aplazado|adiado|postponed)\b").unwrap(),
        ),
        (
            MatchStatus::Suspended,
            Regex::new(r"(?i)\b(suspendido|suspenso|suspended)\b").unwrap(),
        ),
    ]
});

/// Spanish, Portuguese and English month abbreviations. No abbreviation
/// means different months in different languages.
const MONTHS: &[(&str, u32)] = &[
    ("ene", 1),
    ("jan", 1),
    ("feb", 2),
    ("fev", 2),
    ("mar", 3),
    ("abr", 4),
    ("apr", 4),
    ("may", 5),
    ("mai", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("aug", 8),
    ("sep", 9),
    ("set", 9),
    ("oct", 10),
    ("out", 10),
    ("nov", 11),
    ("dic", 12),
    ("dez", 12),
    ("dec", 12),
];

/// Stadium name fragment -> (city, state).
const STADIUMS: &[(&str, &str, &str)] = &[
    ("morumbi", "São Paulo", "SP"),
    ("cícero pompeu de toledo", "São Paulo", "SP"),
    ("pacaembu", "São Paulo", "SP"),
    ("allianz parque", "São Paulo", "SP"),
    ("neo química arena", "São Paulo", "SP"),
    ("canindé", "São Paulo", "SP"),
    ("vila belmiro", "Santos", "SP"),
    ("urbano caldeira", "Santos", "SP"),
    ("moisés lucarelli", "Campinas", "SP"),
    ("brinco de ouro", "Campinas", "SP"),
    ("nabi abi chedid", "Bragança Paulista", "SP"),
    ("jorge ismael de biase", "Novo Horizonte", "SP"),
    ("alfredo de castilho", "Bauru", "SP"),
    ("benito agnelo castellano", "Rio Claro", "SP"),
    ("santa cruz", "Ribeirão Preto", "SP"),
    ("josé maria de campos maia", "Mirassol", "SP"),
    ("walter ribeiro", "Sorocaba", "SP"),
    ("primeiro de maio", "São Bernardo do Campo", "SP"),
    ("maracanã", "Rio de Janeiro", "RJ"),
    ("são januário", "Rio de Janeiro", "RJ"),
    ("nilton santos", "Rio de Janeiro", "RJ"),
    ("moça bonita", "Rio de Janeiro", "RJ"),
    ("raulino de oliveira", "Volta Redonda", "RJ"),
];

/// Lowercase ASCII without diacritics; the base for every slug form.
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// URL-safe team slug: `"Corinthians São Paulo"` -> `"corinthians-sao-paulo"`.
///
/// Idempotent: the output only holds `[a-z0-9-]` with no leading, trailing or
/// repeated hyphen, which every step leaves unchanged.
pub fn normalize_team_slug(name: &str) -> String {
    let folded = fold_diacritics(name);
    let hyphenated = WS_OR_UNDERSCORE.replace_all(folded.trim(), "-");
    let cleaned = NON_SLUG.replace_all(&hyphenated, "");
    let collapsed = MULTI_HYPHEN.replace_all(&cleaned, "-");
    collapsed.trim_matches('-').to_string()
}

/// Hyphen-free slug form used by the authoritative store (`"saopaulo"`).
pub fn compact_slug(name: &str) -> String {
    normalize_team_slug(name).replace('-', "")
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse_score(score: &str) -> Result<(u32, u32)> {
    let caps = SCORE
        .captures(score)
        .with_context(|| format!("Invalid score format: {}", score))?;
    let home_score = caps[1]
        .parse::<u32>()
        .with_context(|| format!("Invalid home score: {}", &caps[1]))?;
    let away_score = caps[2]
        .parse::<u32>()
        .with_context(|| format!("Invalid away score: {}", &caps[2]))?;
    Ok((home_score, away_score))
}

pub fn month_number(abbrev: &str) -> Option<u32> {
    let key: String = fold_diacritics(abbrev.trim_end_matches('.'))
        .chars()
        .take(3)
        .collect();
    MONTHS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, number)| *number)
}

fn source_offset(options: &ParsingOptions) -> Option<FixedOffset> {
    FixedOffset::east_opt(options.utc_offset_hours * 3600)
}

fn parse_clock(time_str: &str) -> Option<NaiveTime> {
    let caps = CLOCK.captures(time_str.trim())?;
    NaiveTime::from_hms_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, 0)
}

fn localize(
    date: NaiveDate,
    time: NaiveTime,
    options: &ParsingOptions,
) -> Option<DateTime<FixedOffset>> {
    source_offset(options)?
        .from_local_datetime(&date.and_time(time))
        .single()
}

/// `"05 abr 26"` + `"16:00"` -> `2026-04-05T16:00:00-03:00`.
///
/// Two-digit years are read as `20xx`. An unknown month falls back to
/// January with a warning unless `strict_months` is set.
pub fn parse_locale_date(
    date_str: &str,
    time_str: &str,
    options: &ParsingOptions,
) -> Option<DateTime<FixedOffset>> {
    let parts: Vec<&str> = date_str.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let day = parts[0].parse::<u32>().ok()?;
    let month = match month_number(parts[1]) {
        Some(month) => month,
        None if options.strict_months => {
            warn!("Unknown month abbreviation '{}', dropping date", parts[1]);
            return None;
        }
        None => {
            warn!("Unknown month abbreviation '{}', assuming January", parts[1]);
            1
        }
    };
    let year = match parts[2].len() {
        2 => 2000 + parts[2].parse::<i32>().ok()?,
        4 => parts[2].parse::<i32>().ok()?,
        _ => return None,
    };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    localize(date, parse_clock(time_str)?, options)
}

/// `"05/04/2026"` (+ optional `"16:00"`, midnight otherwise).
pub fn parse_numeric_date(
    date_str: &str,
    time_str: Option<&str>,
    options: &ParsingOptions,
) -> Option<DateTime<FixedOffset>> {
    let caps = NUMERIC_DATE.captures(date_str.trim())?;
    let date = NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        caps[2].parse().ok()?,
        caps[1].parse().ok()?,
    )?;
    let time = match time_str {
        Some(t) => parse_clock(t)?,
        None => NaiveTime::MIN,
    };
    localize(date, time, options)
}

/// Tries every date shape a strategy may hand over: RFC 3339 instants,
/// numeric `DD/MM/YYYY`, then `<day> <month-abbrev> <year>`. Every result is
/// expressed in the source offset.
pub fn parse_match_date(
    date_str: Option<&str>,
    time_str: Option<&str>,
    options: &ParsingOptions,
) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str?.trim();
    if date_str.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(date_str) {
        // Feeds send UTC; ids use the calendar day at the source.
        return Some(match source_offset(options) {
            Some(offset) => instant.with_timezone(&offset),
            None => instant,
        });
    }
    if NUMERIC_DATE.is_match(date_str) {
        return parse_numeric_date(date_str, time_str, options);
    }
    parse_locale_date(date_str, time_str?, options)
}

/// `DD-MM-YYYY` segment of a match id.
pub fn date_for_id(date: Option<&DateTime<FixedOffset>>) -> String {
    match date {
        Some(d) => format!("{:02}-{:02}-{:04}", d.day(), d.month(), d.year()),
        None => "unknown".to_string(),
    }
}

pub fn build_match_id(
    tournament: &str,
    home_slug: &str,
    away_slug: &str,
    date: Option<&DateTime<FixedOffset>>,
) -> String {
    format!(
        "{}-{}-vs-{}-{}",
        tournament,
        home_slug,
        away_slug,
        date_for_id(date)
    )
}

/// First status keyword group that hits, if any.
pub fn status_from_keywords(text: &str) -> Option<MatchStatus> {
    STATUS_GROUPS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(status, _)| *status)
}

pub fn determine_status(text: &str, has_score: bool) -> MatchStatus {
    status_from_keywords(text).unwrap_or(if has_score {
        MatchStatus::Finished
    } else {
        MatchStatus::Scheduled
    })
}

/// The `Estádio ...` run inside a row or block, if there is one.
pub fn find_stadium_text(text: &str) -> Option<String> {
    STADIUM_TEXT
        .find(text)
        .map(|m| collapse_whitespace(m.as_str()))
        .filter(|s| !s.is_empty())
}

/// Resolves a stadium name to its city through the static lookup.
/// Unknown stadiums keep their raw name with no city.
pub fn extract_stadium_info(stadium_name: &str, default_state: Option<&str>) -> Option<Venue> {
    let name = collapse_whitespace(stadium_name);
    if name.is_empty() {
        return None;
    }

    let folded = fold_diacritics(&name);
    let known = STADIUMS
        .iter()
        .find(|(key, _, _)| folded.contains(&fold_diacritics(key)));

    Some(match known {
        Some((_, city, state)) => Venue {
            name: Some(name),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
        },
        None => Venue {
            name: Some(name),
            city: None,
            state: default_state.map(str::to_string),
        },
    })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    }
}

fn alternation(segments: &[String]) -> String {
    segments
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join("|")
}

/// URL patterns of one source family, compiled once from its conventions.
#[derive(Debug, Clone)]
pub struct SourcePatterns {
    fixture_url: Regex,
    fixture_href: Regex,
    team_href: Regex,
    competition: Regex,
    round_segment: Regex,
    round_header: Regex,
    markdown_team: Regex,
}

impl SourcePatterns {
    pub fn new(conventions: &SourceConventions) -> Result<Self> {
        let fixtures = alternation(&conventions.fixture_segments);
        let teams = alternation(&conventions.team_segments);
        let competitions = alternation(&conventions.competition_segments);
        let rounds = alternation(&conventions.round_keywords);

        Ok(Self {
            fixture_url: Regex::new(&format!(
                r"(?i)/(?:{})/([^/?#\s)\]]+)/([^/?#\s)\]]+)/[0-9]+",
                fixtures
            ))
            .context("Invalid fixture permalink pattern")?,
            fixture_href: Regex::new(&format!(r"(?i)/(?:{})/", fixtures))
                .context("Invalid fixture link pattern")?,
            team_href: Regex::new(&format!(r"(?i)/(?:{})/", teams))
                .context("Invalid team link pattern")?,
            competition: Regex::new(&format!(r"(?i)/(?:{})/([^/?#]+)/([0-9]{{4}})", competitions))
                .context("Invalid competition pattern")?,
            round_segment: Regex::new(&format!(r"(?i)/({})[-_]?([0-9]+)(?:[/?#]|$)", rounds))
                .context("Invalid round segment pattern")?,
            round_header: Regex::new(&format!(r"(?i)\b({})\s*([0-9]+)\b", rounds))
                .context("Invalid round header pattern")?,
            markdown_team: Regex::new(&format!(r"(?i)\[([^\]]+)\]\([^)\s]*/(?:{})/", teams))
                .context("Invalid markdown team link pattern")?,
        })
    }

    pub fn is_team_href(&self, href: &str) -> bool {
        self.team_href.is_match(href)
    }

    pub fn is_fixture_href(&self, href: &str) -> bool {
        self.fixture_href.is_match(href)
    }

    /// `/partido/<home>/<away>/<sequence>` -> decoded `(home, away)` slugs.
    pub fn teams_from_match_url(&self, match_url: &str) -> Option<(String, String)> {
        let caps = self.fixture_url.captures(match_url)?;
        let decode = |raw: &str| {
            urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string())
                .to_lowercase()
        };
        Some((decode(&caps[1]), decode(&caps[2])))
    }

    /// Fixture permalink path inside arbitrary text, e.g. a markdown link target.
    pub fn find_fixture_path<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.fixture_url.find(text).map(|m| m.as_str())
    }

    /// `/competicion/paulistaa1/2026/...` -> `paulistaa126`.
    pub fn tournament_from_url(&self, url: &str) -> Option<String> {
        let caps = self.competition.captures(url)?;
        Some(format!("{}{}", caps[1].to_lowercase(), &caps[2][2..]))
    }

    /// `.../jornada5` -> `Jornada 5`.
    pub fn round_from_url(&self, url: &str) -> Option<String> {
        let caps = self.round_segment.captures(url)?;
        Some(format!("{} {}", capitalize(&caps[1]), &caps[2]))
    }

    /// Labels of markdown links to team pages, in order: `[Santos](/equipo/santos-fc)`.
    pub fn markdown_team_labels(&self, text: &str) -> Vec<String> {
        self.markdown_team
            .captures_iter(text)
            .map(|caps| caps[1].trim().to_string())
            .collect()
    }

    /// `RODADA 5` / `Jornada 5` anywhere in a header-shaped line.
    pub fn round_from_header(&self, text: &str) -> Option<String> {
        let caps = self.round_header.captures(text)?;
        Some(format!("{} {}", capitalize(&caps[1]), &caps[2]))
    }
}
