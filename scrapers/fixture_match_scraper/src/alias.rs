use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::utils::{compact_slug, normalize_team_slug};

/// Foreign slug -> store slug for the Paulista and Carioca sources.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("botafogo-sp", "botafogorp"),
    ("primavera-sp", "esporteclubeprimavera"),
    ("noroeste", "esporteclubenoroeste"),
    ("ponte-preta", "pontepreta"),
    ("sao-bernardo-fc", "saobernardofc"),
    ("santos-fc", "santos"),
    ("corinthians-sao-paulo", "corinthians"),
    ("sao-paulo-fc", "saopaulo"),
    ("a-portuguesa-d", "portuguesa"),
    ("velo-clube", "veloclube"),
    ("guarani-campinas", "guarani"),
    ("mirassol", "mirassol"),
    ("bragantino", "bragantino"),
    ("novorizontino", "novorizontino"),
    ("palmeiras", "palmeiras"),
    ("palmeiras-sp", "palmeiras"),
    ("capivariano", "capivariano"),
    ("flamengo-rio-janeiro", "flamengo"),
    ("fluminense-rio-janeiro", "fluminense"),
    ("botafogo-rio-janeiro", "botafogo"),
    ("vasco-da-gama", "vasco"),
    ("cfrj-marica", "marica"),
    ("volta-redonda", "voltaredonda"),
    ("madureira-rj", "madureira"),
    ("sampaio-correa-rj", "sampaiocorrea"),
    ("boavista-br", "boavista"),
    ("nova-iguacu", "novaiguacu"),
];

/// On-disk alias table: `{"version": 3, "aliases": {"santos-fc": "santos"}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasTable {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Read-only slug aliasing between source conventions.
#[derive(Debug, Clone)]
pub struct AliasMap {
    version: u32,
    aliases: HashMap<String, String>,
}

impl Default for AliasMap {
    fn default() -> Self {
        Self::builtin()
    }
}

impl AliasMap {
    pub fn builtin() -> Self {
        Self::from_pairs(
            0,
            BUILTIN_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string())),
        )
    }

    pub fn from_table(table: AliasTable) -> Self {
        Self::from_pairs(table.version, table.aliases)
    }

    fn from_pairs(version: u32, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let aliases = pairs
            .into_iter()
            .map(|(from, to)| (normalize_team_slug(&from), to))
            .collect();
        Self { version, aliases }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias table {}", path.display()))?;
        let table: AliasTable = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid alias table {}", path.display()))?;
        Ok(Self::from_table(table))
    }

    /// The configured table file, or the built-in table when none is set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let map = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::builtin(),
        };
        info!("Loaded alias table v{} with {} entries", map.version, map.len());
        Ok(map)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn get(&self, slug: &str) -> Option<&str> {
        self.aliases
            .get(slug)
            .or_else(|| self.aliases.get(&normalize_team_slug(slug)))
            .map(String::as_str)
    }

    /// Store slug for `slug` when aliased, otherwise `slug` itself.
    pub fn canonical(&self, slug: &str) -> String {
        self.get(slug).unwrap_or(slug).to_string()
    }

    /// Comparison key: aliased, then compacted. Exact matches only.
    pub fn identity_slug(&self, slug: &str) -> String {
        compact_slug(&self.canonical(slug))
    }

    pub fn identity(&self, home: &str, away: &str) -> (String, String) {
        (self.identity_slug(home), self.identity_slug(away))
    }
}
