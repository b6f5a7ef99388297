use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::score_reconciler::{self, ScoreUpdate};
use crate::types::{Match, MatchFile};

const RESULTS_SUFFIX: &str = "_resultados.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub merged: usize,
}

/// The authoritative match store, persisted as one JSON document.
#[derive(Debug)]
pub struct JsonMatchStore {
    path: PathBuf,
    file: MatchFile,
}

impl JsonMatchStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read match store {}", path.display()))?;
        let file: MatchFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid match store {}", path.display()))?;
        info!("Loaded {} matches from {}", file.matches.len(), path.display());
        Ok(Self { path, file })
    }

    /// Like [`load`](Self::load), but a missing file is an empty store.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No match store at {}, starting empty", path.display());
            Ok(Self {
                path: path.to_path_buf(),
                file: MatchFile::default(),
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn matches(&self) -> &[Match] {
        &self.file.matches
    }

    pub fn get(&self, id: &str) -> Option<&Match> {
        self.file.matches.iter().find(|m| m.id == id)
    }

    pub fn apply_updates(&mut self, updates: &[ScoreUpdate]) -> usize {
        score_reconciler::apply_updates(&mut self.file.matches, updates)
    }

    /// Explicit ingestion: new ids are appended, known ids merged field by field.
    pub fn upsert(&mut self, incoming: &[Match]) -> UpsertStats {
        let mut stats = UpsertStats::default();
        for m in incoming {
            match self.file.matches.iter_mut().find(|existing| existing.id == m.id) {
                Some(existing) => {
                    existing.merge_from(m);
                    stats.merged += 1;
                }
                None => {
                    self.file.matches.push(m.clone());
                    stats.inserted += 1;
                }
            }
        }
        info!(
            "Ingested {} matches ({} new, {} merged)",
            incoming.len(),
            stats.inserted,
            stats.merged
        );
        stats
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        info!("Saved {} matches to {}", self.file.matches.len(), self.path.display());
        Ok(())
    }
}

pub fn results_file_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("{}{}", at.format("%d%m%Y-%H%M%S"), RESULTS_SUFFIX)
}

/// Writes one scrape run as `<dir>/<ddmmYYYY-HHMMSS>_resultados.json`.
pub fn write_results_file<Tz: TimeZone>(
    dir: &Path,
    matches: &[Match],
    at: &DateTime<Tz>,
) -> Result<PathBuf>
where
    Tz::Offset: Display,
{
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(results_file_name(at));
    let file = MatchFile {
        matches: matches.to_vec(),
        extra: Default::default(),
    };
    fs::write(&path, serde_json::to_string_pretty(&file)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved {} matches to {}", matches.len(), path.display());
    Ok(path)
}

/// Every `*_resultados.json` under `dir`, one batch per file, in file-name
/// order. Unreadable files are logged and skipped.
pub fn load_result_batches(dir: &Path) -> Result<Vec<(PathBuf, Vec<Match>)>> {
    if !dir.exists() {
        warn!("Results directory not found: {}", dir.display());
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.ends_with(RESULTS_SUFFIX))
        })
        .collect();
    paths.sort();

    let mut batches = Vec::with_capacity(paths.len());
    for path in paths {
        let parsed = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str::<MatchFile>(&raw).map_err(anyhow::Error::from));
        match parsed {
            Ok(file) => {
                debug!("Loaded {} matches from {}", file.matches.len(), path.display());
                batches.push((path, file.matches));
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchStatus, Score};
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const STORE: &str = r#"{
  "updatedAt": "2026-04-01",
  "matches": [
    {
      "id": "paulistaa126-corinthians-vs-palmeiras-05-04-2026",
      "tournament": "paulistaa126",
      "homeTeam": "corinthians",
      "awayTeam": "palmeiras",
      "matchDate": "2026-04-05T16:00:00-03:00",
      "round": "Jornada 5",
      "status": "scheduled",
      "score": {"home": null, "away": null},
      "venue": {"name": "Neo Química Arena", "city": "São Paulo", "state": "SP"},
      "broadcasting": ["premiere"],
      "matchURL": null,
      "featured": true
    }
  ]
}"#;

    fn update(id: &str) -> ScoreUpdate {
        ScoreUpdate {
            id: id.to_string(),
            score: Score::new(2, 1),
            status: MatchStatus::Finished,
        }
    }

    #[test]
    fn test_load_update_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data/matches.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, STORE).unwrap();

        let mut store = JsonMatchStore::load(&path).unwrap();
        assert_eq!(
            store.apply_updates(&[update("paulistaa126-corinthians-vs-palmeiras-05-04-2026")]),
            1
        );
        store.save().unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["updatedAt"], "2026-04-01");
        assert_eq!(saved["matches"][0]["featured"], true);
        assert_eq!(saved["matches"][0]["status"], "finished");
        assert_eq!(saved["matches"][0]["score"]["home"], 2);
        assert_eq!(saved["matches"][0]["broadcasting"][0], "premiere");
    }

    #[test]
    fn test_upsert_merges_by_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matches.json");
        fs::write(&path, STORE).unwrap();
        let mut store = JsonMatchStore::load(&path).unwrap();

        let mut known = store.matches()[0].clone();
        known.venue = None;
        known.round = "Jornada 6".to_string();
        let mut fresh = known.clone();
        fresh.id = "paulistaa126-santos-vs-mirassol-unknown".to_string();

        let stats = store.upsert(&[known, fresh]);
        assert_eq!(stats, UpsertStats { inserted: 1, merged: 1 });

        let merged = store.get("paulistaa126-corinthians-vs-palmeiras-05-04-2026").unwrap();
        assert_eq!(merged.round, "Jornada 6");
        assert!(merged.venue.is_some());
        assert_eq!(merged.extra.get("featured"), Some(&serde_json::Value::Bool(true)));
        assert_eq!(store.matches().len(), 2);
    }

    #[test]
    fn test_open_or_create_missing_store() {
        let dir = tempdir().unwrap();
        let store = JsonMatchStore::open_or_create(dir.path().join("nope/matches.json")).unwrap();
        assert!(store.matches().is_empty());
        assert!(JsonMatchStore::load(dir.path().join("nope/matches.json")).is_err());
    }

    #[test]
    fn test_result_files_round_trip_in_name_order() {
        let dir = tempdir().unwrap();
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let early = offset.with_ymd_and_hms(2026, 4, 1, 5, 0, 0).unwrap();
        let late = offset.with_ymd_and_hms(2026, 4, 2, 5, 0, 0).unwrap();

        let store = {
            let path = dir.path().join("matches.json");
            fs::write(&path, STORE).unwrap();
            JsonMatchStore::load(&path).unwrap()
        };

        let results = dir.path().join("resultados");
        let late_path = write_results_file(&results, store.matches(), &late).unwrap();
        write_results_file(&results, &[], &early).unwrap();
        fs::write(results.join("notes.json"), "{}").unwrap();
        fs::write(results.join("03042026-050000_resultados.json"), "not json").unwrap();

        assert_eq!(
            late_path.file_name().unwrap().to_str().unwrap(),
            "02042026-050000_resultados.json"
        );

        let batches = load_result_batches(&results).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches[0].0.ends_with("01042026-050000_resultados.json"));
        assert!(batches[0].1.is_empty());
        assert_eq!(batches[1].1.len(), 1);
    }

    #[test]
    fn test_missing_results_dir_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_result_batches(&dir.path().join("missing")).unwrap().is_empty());
    }
}
