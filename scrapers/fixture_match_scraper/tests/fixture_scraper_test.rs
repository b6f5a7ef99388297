use fixture_match_scraper::alias::AliasMap;
use fixture_match_scraper::error::DiscardReason;
use fixture_match_scraper::{FixtureScraper, Match, MatchStatus, Score, ScraperConfig, SourceFormat};
use pretty_assertions::assert_eq;
use test_log::test;

const ROUND_URL: &str =
    "https://www.resultados-futbol.com/competicion/paulistaa1/2026/grupo1/jornada5";
const FEED_URL: &str = "https://www.fotmob.com/competition/carioca/2026/round3";

fn scraper() -> FixtureScraper {
    FixtureScraper::with_aliases(&ScraperConfig::default(), AliasMap::builtin()).unwrap()
}

fn ids(matches: &[Match]) -> Vec<&str> {
    matches.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn test_round_page_html() {
    let outcome = scraper().parse_html(include_str!("fixtures/paulista_jornada5.html"), ROUND_URL);

    assert_eq!(
        ids(&outcome.matches),
        vec![
            "paulistaa126-corinthians-vs-palmeiras-05-04-2026",
            "paulistaa126-santos-vs-mirassol-04-04-2026",
            "paulistaa126-saopaulo-vs-pontepreta-04-04-2026",
            "paulistaa126-bragantino-vs-novorizontino-06-04-2026",
        ]
    );

    let derby = &outcome.matches[0];
    assert_eq!(derby.tournament, "paulistaa126");
    assert_eq!(derby.round, "Jornada 5");
    assert_eq!(derby.status, MatchStatus::Scheduled);
    assert_eq!(derby.score, Score::unknown());
    assert_eq!(
        derby.match_date.map(|d| d.to_rfc3339()).as_deref(),
        Some("2026-04-05T16:00:00-03:00")
    );
    assert_eq!(
        derby.match_url.as_deref(),
        Some("/partido/corinthians-sao-paulo/palmeiras/2026123")
    );
    let venue = derby.venue.as_ref().unwrap();
    assert_eq!(venue.name.as_deref(), Some("Estádio Neo Química Arena"));
    assert_eq!(venue.city.as_deref(), Some("São Paulo"));

    let santos = &outcome.matches[1];
    assert_eq!(santos.status, MatchStatus::Finished);
    assert_eq!(santos.score, Score::new(2, 1));
    assert_eq!(
        santos.venue.as_ref().and_then(|v| v.city.as_deref()),
        Some("Santos")
    );

    assert_eq!(outcome.matches[2].score, Score::new(0, 0));

    let embedded = &outcome.matches[3];
    assert_eq!(embedded.status, MatchStatus::Scheduled);
    assert_eq!(embedded.round, "Jornada 5");
    assert_eq!(
        embedded.venue.as_ref().and_then(|v| v.city.as_deref()),
        Some("Bragança Paulista")
    );

    // The embedded copy of the derby and the headline line lose to the table row.
    assert_eq!(outcome.report.count(DiscardReason::Duplicate), 2);
    assert_eq!(outcome.report.assembled, 4);
}

#[test]
fn test_markdown_dump_matches_html_ids() {
    let scraper = scraper();
    let html = scraper.parse_html(include_str!("fixtures/paulista_jornada5.html"), ROUND_URL);
    let text = scraper.parse_text(include_str!("fixtures/paulista_jornada5.md"), ROUND_URL);

    assert_eq!(
        ids(&text.matches),
        vec![
            "paulistaa126-corinthians-vs-palmeiras-05-04-2026",
            "paulistaa126-santos-vs-mirassol-04-04-2026",
            "paulistaa126-saopaulo-vs-pontepreta-04-04-2026",
            "paulistaa126-palmeiras-vs-santos-12-04-2026",
        ]
    );
    assert_eq!(&ids(&html.matches)[..3], &ids(&text.matches)[..3]);

    let next_round = &text.matches[3];
    assert_eq!(next_round.round, "Jornada 6");
    assert_eq!(next_round.venue, None);
    assert_eq!(text.report.count(DiscardReason::Duplicate), 1);
}

#[test]
fn test_feed_json() {
    let outcome = scraper()
        .parse_source(include_str!("fixtures/carioca_feed.json"), FEED_URL, SourceFormat::Auto)
        .unwrap();

    assert_eq!(
        ids(&outcome.matches),
        vec![
            "carioca26-flamengo-vs-fluminense-01-02-2026",
            "carioca26-botafogo-vs-vasco-01-02-2026",
            "carioca26-madureira-vs-novaiguacu-02-02-2026",
        ]
    );

    let classic = &outcome.matches[0];
    assert_eq!(classic.status, MatchStatus::Finished);
    assert_eq!(classic.score, Score::new(2, 1));
    assert_eq!(classic.round, "Jornada 3");
    assert_eq!(
        classic.match_date.map(|d| d.to_rfc3339()).as_deref(),
        Some("2026-02-01T18:00:00-03:00")
    );

    assert_eq!(outcome.matches[1].status, MatchStatus::Postponed);
    assert_eq!(outcome.matches[1].score, Score::unknown());
    assert_eq!(outcome.matches[2].status, MatchStatus::Scheduled);
}

#[test]
fn test_results_serialize_with_store_field_names() {
    let outcome = scraper().parse_html(include_str!("fixtures/paulista_jornada5.html"), ROUND_URL);
    let json = serde_json::to_value(&outcome.matches[1]).unwrap();

    assert_eq!(json["homeTeam"], "santos");
    assert_eq!(json["awayTeam"], "mirassol");
    assert_eq!(json["matchDate"], "2026-04-04T18:30:00-03:00");
    assert_eq!(json["status"], "finished");
    assert_eq!(json["score"]["home"], 2);
    assert_eq!(json["venue"]["state"], "SP");
    assert_eq!(json["matchURL"], "/partido/santos-fc/mirassol/2026122");
    assert_eq!(json["broadcasting"], serde_json::json!([]));
}
