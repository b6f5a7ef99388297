use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::alias::AliasMap;
use crate::types::{Match, MatchStatus, Score};

/// Partial store update: only these two fields are ever written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreUpdate {
    pub id: String,
    pub score: Score,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub considered: usize,
    pub ignored: usize,
    pub updated: usize,
    pub unmatched: usize,
    pub terminal_skipped: usize,
    pub rejected_transitions: usize,
    pub collisions: usize,
    pub duplicate_targets: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub updates: Vec<ScoreUpdate>,
    pub report: ReconciliationReport,
}

/// Merges freshly scraped results into the authoritative store by team
/// identity, never creating store entries.
pub struct ScoreReconciler<'a> {
    aliases: &'a AliasMap,
}

/// Incoming records that can move a store entry forward.
fn target_of(incoming: &Match) -> Option<(MatchStatus, Score)> {
    match incoming.status {
        MatchStatus::Finished if incoming.score.is_complete() => {
            Some((MatchStatus::Finished, incoming.score))
        }
        MatchStatus::Postponed | MatchStatus::Suspended => {
            Some((incoming.status, Score::unknown()))
        }
        _ => None,
    }
}

impl<'a> ScoreReconciler<'a> {
    pub fn new(aliases: &'a AliasMap) -> Self {
        Self { aliases }
    }

    /// Batches are read in order, records within a batch in order. Updates
    /// aimed at the same store entry are applied to a working copy one after
    /// the other, so a later batch can only move an entry further along.
    pub fn reconcile(&self, store: &[Match], batches: &[Vec<Match>]) -> Reconciliation {
        let start = Instant::now();
        let mut report = ReconciliationReport::default();

        let identities: Vec<(String, String)> = store
            .iter()
            .map(|m| self.aliases.identity(&m.home_team, &m.away_team))
            .collect();

        let mut updates: Vec<ScoreUpdate> = Vec::new();
        let mut pending: HashMap<usize, usize> = HashMap::new();

        for incoming in batches.iter().flatten() {
            report.considered += 1;
            let Some((status, score)) = target_of(incoming) else {
                report.ignored += 1;
                continue;
            };

            let identity = self.aliases.identity(&incoming.home_team, &incoming.away_team);
            let mut hits = identities
                .iter()
                .enumerate()
                .filter(|(_, id)| **id == identity)
                .map(|(i, _)| i);

            let Some(index) = hits.next() else {
                debug!(
                    "No store entry for {} vs {} ({} vs {})",
                    incoming.home_team, incoming.away_team, identity.0, identity.1
                );
                report.unmatched += 1;
                continue;
            };
            let others: Vec<&str> = hits.map(|i| store[i].id.as_str()).collect();
            if !others.is_empty() {
                warn!(
                    "Identity {}/{} matches several store entries; updating only {} (also {:?})",
                    identity.0, identity.1, store[index].id, others
                );
                report.collisions += 1;
            }

            let entry = &store[index];
            let (current_status, current_score) = match pending.get(&index) {
                Some(&pos) => (updates[pos].status, updates[pos].score),
                None => (entry.status, entry.score),
            };

            if current_status == MatchStatus::Finished && current_score.is_complete() {
                if pending.contains_key(&index) {
                    report.duplicate_targets += 1;
                } else {
                    report.terminal_skipped += 1;
                }
                continue;
            }
            if !current_status.can_transition_to(status) {
                debug!("Refusing {} -> {} for {}", current_status, status, entry.id);
                report.rejected_transitions += 1;
                continue;
            }

            let score = if status == MatchStatus::Finished {
                score
            } else {
                current_score
            };
            let update = ScoreUpdate {
                id: entry.id.clone(),
                score,
                status,
            };
            info!(
                "Updated: {} vs {} -> {} {:?}-{:?}",
                entry.home_team, entry.away_team, status, score.home, score.away
            );

            match pending.get(&index) {
                Some(&pos) => {
                    report.duplicate_targets += 1;
                    updates[pos] = update;
                }
                None => {
                    pending.insert(index, updates.len());
                    updates.push(update);
                    report.updated += 1;
                }
            }
        }

        info!("Metrics Summary:");
        info!("  Reconcile time        : {} ms", start.elapsed().as_millis());
        info!(
            "  Incoming records      : {} ({} not final)",
            report.considered, report.ignored
        );
        info!(
            "  Store entries updated : {} ({} unmatched, {} already final, {} refused)",
            report.updated, report.unmatched, report.terminal_skipped, report.rejected_transitions
        );
        info!(
            "  Collisions            : {} ({} repeated targets)",
            report.collisions, report.duplicate_targets
        );

        Reconciliation { updates, report }
    }
}

/// Writes `updates` into `store`, touching only `score` and `status`.
/// Returns how many entries changed.
pub fn apply_updates(store: &mut [Match], updates: &[ScoreUpdate]) -> usize {
    let mut applied = 0;
    for update in updates {
        match store.iter_mut().find(|m| m.id == update.id) {
            Some(entry) if !entry.is_terminal() => {
                entry.score = update.score;
                entry.status = update.status;
                applied += 1;
            }
            Some(entry) => debug!("Skipping final entry {}", entry.id),
            None => warn!("Update for unknown id {}", update.id),
        }
    }
    applied
}
