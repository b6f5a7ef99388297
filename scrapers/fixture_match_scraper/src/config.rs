use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Path conventions of one source family. Every list is matched
/// case-insensitively against a single URL path segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConventions {
    pub team_segments: Vec<String>,
    pub fixture_segments: Vec<String>,
    pub competition_segments: Vec<String>,
    pub round_keywords: Vec<String>,
}

impl Default for SourceConventions {
    fn default() -> Self {
        Self {
            team_segments: vec!["equipo".to_string(), "team".to_string()],
            fixture_segments: vec!["partido".to_string(), "fixture".to_string()],
            competition_segments: vec!["competicion".to_string(), "competition".to_string()],
            round_keywords: vec![
                "jornada".to_string(),
                "round".to_string(),
                "rodada".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Defaults {
    pub round: String,
    pub tournament: String,
    pub venue_state: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            round: "Jornada 1".to_string(),
            tournament: "unknown".to_string(),
            venue_state: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsingOptions {
    /// Unknown month abbreviations make the date unresolvable instead of
    /// falling back to January.
    pub strict_months: bool,
    pub utc_offset_hours: i32,
}

impl Default for ParsingOptions {
    fn default() -> Self {
        Self {
            strict_months: false,
            utc_offset_hours: -3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_second: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; FixtureMatchScraper/0.1)".to_string(),
            request_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathsConfig {
    pub matches_file: PathBuf,
    pub results_dir: PathBuf,
    pub alias_table: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            matches_file: PathBuf::from("data/matches.json"),
            results_dir: PathBuf::from("resultados"),
            alias_table: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScraperConfig {
    pub source: SourceConventions,
    pub defaults: Defaults,
    pub parsing: ParsingOptions,
    pub rate_limits: RateLimits,
    pub scraping: ScrapingConfig,
    pub paths: PathsConfig,
}

impl ScraperConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user_agent) = env::var("SCRAPER_USER_AGENT") {
            config.scraping.user_agent = user_agent;
        }
        if let Some(timeout) = parse_var::<u64>("SCRAPER_TIMEOUT_SECS") {
            config.scraping.request_timeout_secs = timeout;
        }
        if let Some(retries) = parse_var::<u32>("SCRAPER_MAX_RETRIES") {
            config.scraping.max_retries = retries;
        }
        if let Some(rps) = parse_var::<u32>("RATE_LIMIT_RPS") {
            config.rate_limits.requests_per_second = rps;
        }
        if let Ok(path) = env::var("MATCHES_FILE") {
            config.paths.matches_file = PathBuf::from(path);
        }
        if let Ok(path) = env::var("RESULTS_DIR") {
            config.paths.results_dir = PathBuf::from(path);
        }
        if let Ok(path) = env::var("ALIAS_TABLE_PATH") {
            config.paths.alias_table = Some(PathBuf::from(path));
        }
        if let Some(strict) = parse_var::<bool>("STRICT_MONTHS") {
            config.parsing.strict_months = strict;
        }
        if let Ok(round) = env::var("DEFAULT_ROUND") {
            config.defaults.round = round;
        }
        if let Ok(state) = env::var("VENUE_STATE") {
            config.defaults.venue_state = Some(state);
        }

        config
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        env::set_var("RATE_LIMIT_RPS", "5");
        env::set_var("STRICT_MONTHS", "true");
        env::set_var("DEFAULT_ROUND", "Rodada 1");
        env::set_var("SCRAPER_TIMEOUT_SECS", "not-a-number");

        let config = ScraperConfig::from_env();
        assert_eq!(config.rate_limits.requests_per_second, 5);
        assert!(config.parsing.strict_months);
        assert_eq!(config.defaults.round, "Rodada 1");
        assert_eq!(config.scraping.request_timeout_secs, 30);

        env::remove_var("RATE_LIMIT_RPS");
        env::remove_var("STRICT_MONTHS");
        env::remove_var("DEFAULT_ROUND");
        env::remove_var("SCRAPER_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        let config = ScraperConfig::from_env();
        assert_eq!(config.parsing.utc_offset_hours, -3);
        assert!(!config.parsing.strict_months);
        assert_eq!(config.defaults.round, "Jornada 1");
        assert_eq!(config.paths.matches_file, PathBuf::from("data/matches.json"));
    }
}
