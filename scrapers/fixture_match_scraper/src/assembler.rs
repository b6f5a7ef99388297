use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::alias::AliasMap;
use crate::config::{Defaults, ParsingOptions};
use crate::error::DiscardReason;
use crate::strategy::{Candidate, SourceContext};
use crate::types::{Match, MatchStatus, Score};
use crate::utils::{
    build_match_id, collapse_whitespace, determine_status, extract_stadium_info,
    normalize_team_slug, parse_match_date, SourcePatterns,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub candidates: usize,
    pub assembled: usize,
    pub discarded: BTreeMap<DiscardReason, usize>,
}

impl AssemblyReport {
    pub fn discarded_total(&self) -> usize {
        self.discarded.values().sum()
    }

    pub fn count(&self, reason: DiscardReason) -> usize {
        self.discarded.get(&reason).copied().unwrap_or(0)
    }

    pub fn merge(&mut self, other: &AssemblyReport) {
        self.candidates += other.candidates;
        self.assembled += other.assembled;
        for (reason, n) in &other.discarded {
            *self.discarded.entry(*reason).or_insert(0) += n;
        }
    }

    pub fn log_summary(&self, source: &str) {
        info!(
            "Assembled {} of {} candidates from {} ({} discarded)",
            self.assembled,
            self.candidates,
            source,
            self.discarded_total()
        );
        for (reason, n) in &self.discarded {
            info!("  {:>4} x {}", n, reason);
        }
    }
}

/// Turns candidates of one source into validated, deduplicated matches.
///
/// The seen-set lives as long as the assembler, so one assembler should
/// serve exactly one extraction run.
pub struct MatchAssembler<'a> {
    patterns: &'a SourcePatterns,
    options: &'a ParsingOptions,
    defaults: &'a Defaults,
    aliases: Option<&'a AliasMap>,
    seen: HashSet<(String, String)>,
    report: AssemblyReport,
}

impl<'a> MatchAssembler<'a> {
    pub fn new(
        patterns: &'a SourcePatterns,
        options: &'a ParsingOptions,
        defaults: &'a Defaults,
    ) -> Self {
        Self {
            patterns,
            options,
            defaults,
            aliases: None,
            seen: HashSet::new(),
            report: AssemblyReport::default(),
        }
    }

    /// Rewrites known foreign slugs to their store form while assembling.
    pub fn with_aliases(mut self, aliases: &'a AliasMap) -> Self {
        self.aliases = Some(aliases);
        self
    }

    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    pub fn into_report(self) -> AssemblyReport {
        self.report
    }

    /// Assembles `candidates` in strategy priority order, then by position.
    /// The output keeps order of first appearance.
    pub fn assemble(
        &mut self,
        mut candidates: Vec<Candidate>,
        source: &SourceContext<'_>,
    ) -> Vec<Match> {
        candidates.sort_by_key(|c| c.strategy.priority());

        let mut matches = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            self.report.candidates += 1;
            match self.assemble_one(&candidate, source) {
                Ok(m) => {
                    self.report.assembled += 1;
                    matches.push(m);
                }
                Err(reason) => {
                    debug!(
                        "Discarding {} candidate {:?} vs {:?} at {}: {}",
                        candidate.strategy,
                        candidate.home_team,
                        candidate.away_team,
                        candidate.source_path.as_deref().unwrap_or("?"),
                        reason
                    );
                    *self.report.discarded.entry(reason).or_insert(0) += 1;
                }
            }
        }
        matches
    }

    fn slug(&self, raw: &str) -> String {
        let slug = normalize_team_slug(raw);
        match self.aliases {
            Some(aliases) => aliases.canonical(&slug),
            None => slug,
        }
    }

    fn assemble_one(
        &mut self,
        candidate: &Candidate,
        source: &SourceContext<'_>,
    ) -> Result<Match, DiscardReason> {
        let permalink_teams = candidate
            .match_url
            .as_deref()
            .and_then(|url| self.patterns.teams_from_match_url(url));
        let text_teams = candidate
            .has_text_teams()
            .then(|| {
                Some((
                    collapse_whitespace(candidate.home_team.as_deref()?),
                    collapse_whitespace(candidate.away_team.as_deref()?),
                ))
            })
            .flatten();

        let match_date = parse_match_date(
            candidate.date_text.as_deref(),
            candidate.time_text.as_deref(),
            self.options,
        );

        let dedup_key = match (&text_teams, &permalink_teams) {
            (Some(pair), _) | (None, Some(pair)) => pair.clone(),
            (None, None) if match_date.is_none() => return Err(DiscardReason::Unparseable),
            (None, None) => return Err(DiscardReason::MissingTeams),
        };
        if !self.seen.insert(dedup_key.clone()) {
            return Err(DiscardReason::Duplicate);
        }

        let (home_raw, away_raw) = permalink_teams.unwrap_or(dedup_key);
        let home_team = self.slug(&home_raw);
        let away_team = self.slug(&away_raw);
        if home_team.is_empty() || away_team.is_empty() {
            return Err(DiscardReason::MissingTeams);
        }
        if home_team == away_team {
            return Err(DiscardReason::SameTeam);
        }

        let mut score = Score {
            home: candidate.home_score,
            away: candidate.away_score,
        };
        if !score.is_consistent() {
            return Err(DiscardReason::HalfScore);
        }
        let status = determine_status(
            candidate.status_text.as_deref().unwrap_or_default(),
            score.is_complete(),
        );
        if status == MatchStatus::Scheduled {
            score = Score::unknown();
        }

        let round = candidate
            .round
            .clone()
            .or_else(|| source.round.clone())
            .unwrap_or_else(|| self.defaults.round.clone());
        let venue = candidate
            .venue_text
            .as_deref()
            .and_then(|v| extract_stadium_info(v, self.defaults.venue_state.as_deref()));

        Ok(Match {
            id: build_match_id(&source.tournament, &home_team, &away_team, match_date.as_ref()),
            tournament: source.tournament.clone(),
            home_team,
            away_team,
            match_date,
            round,
            status,
            score,
            venue,
            broadcasting: Vec::new(),
            match_url: candidate.match_url.clone(),
            extra: Default::default(),
        })
    }
}
