use thiserror::Error;

/// Why a candidate never became a [`Match`](crate::types::Match).
///
/// None of these are fatal; they key the diagnostic counters of an
/// assembly run.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiscardReason {
    #[error("no team pair and no resolvable date")]
    Unparseable,
    #[error("team pair missing")]
    MissingTeams,
    #[error("team pair already seen in this run")]
    Duplicate,
    #[error("home and away resolve to the same team")]
    SameTeam,
    #[error("only one side of the score is known")]
    HalfScore,
}

/// Transport failure from the fetch collaborator. Fails the whole batch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Transport errors, throttling and server errors are worth another try;
    /// other HTTP statuses are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::RetriesExhausted { .. } => false,
        }
    }
}
