use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Live,
    Finished,
    Postponed,
    Suspended,
}

impl MatchStatus {
    /// Whether the reconciler may move a store entry from `self` to `next`.
    ///
    /// `Finished -> Finished` is allowed so a finished entry with no score yet
    /// can receive one; the terminal check on complete scores happens in
    /// [`Match::is_terminal`].
    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        use MatchStatus::*;
        matches!(
            (self, next),
            (Scheduled, Finished)
                | (Scheduled, Postponed)
                | (Scheduled, Suspended)
                | (Live, Finished)
                | (Postponed, Finished)
                | (Suspended, Finished)
                | (Finished, Finished)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
            MatchStatus::Postponed => "postponed",
            MatchStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Home/away goals. Both sides are set or neither is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Score {
    pub home: Option<u32>,
    pub away: Option<u32>,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self {
            home: Some(home),
            away: Some(away),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn from_pair(pair: Option<(u32, u32)>) -> Self {
        match pair {
            Some((home, away)) => Self::new(home, away),
            None => Self::unknown(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.home.is_some() && self.away.is_some()
    }

    pub fn is_consistent(&self) -> bool {
        self.home.is_some() == self.away.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Venue {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub tournament: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub match_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub round: String,
    #[serde(default)]
    pub status: MatchStatus,
    #[serde(default)]
    pub score: Score,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub broadcasting: Vec<String>,
    #[serde(rename = "matchURL", default)]
    pub match_url: Option<String>,
    /// Store-side fields this crate does not model; carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Match {
    /// A finished match with both goals recorded is never rewritten.
    pub fn is_terminal(&self) -> bool {
        self.status == MatchStatus::Finished && self.score.is_complete()
    }

    /// Field merge used by store ingestion: present values replace, absent
    /// ones keep what the store already had.
    pub fn merge_from(&mut self, incoming: &Match) {
        self.tournament = incoming.tournament.clone();
        self.home_team = incoming.home_team.clone();
        self.away_team = incoming.away_team.clone();
        self.round = incoming.round.clone();
        if incoming.match_date.is_some() {
            self.match_date = incoming.match_date;
        }
        if !self.is_terminal() {
            self.status = incoming.status;
            if incoming.score.is_complete() {
                self.score = incoming.score;
            }
        }
        if incoming.venue.is_some() {
            self.venue = incoming.venue.clone();
        }
        if !incoming.broadcasting.is_empty() {
            self.broadcasting = incoming.broadcasting.clone();
        }
        if incoming.match_url.is_some() {
            self.match_url = incoming.match_url.clone();
        }
    }
}

/// Envelope used by both the result files and the authoritative store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchFile {
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
