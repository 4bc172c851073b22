use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::errors::ModelError;

/// Minimum similarity for a fuzzy name match. Set high on purpose: a wrong
/// cross-team match silently corrupts every downstream stat lookup, while a
/// missed match just skips one game.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.98;

/// The three naming universes a team name can come from. Order here is the
/// fixed priority order `normalize` uses to detect which system an unknown
/// name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingSystem {
    TeamRankings,
    Sportsbook,
    KenPom,
}

impl std::fmt::Display for NamingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NamingSystem::TeamRankings => "teamrankings",
            NamingSystem::Sportsbook => "sportsbook",
            NamingSystem::KenPom => "kenpom",
        };
        f.write_str(s)
    }
}

/// Immutable registry of team names across the three naming systems, loaded
/// once at startup from static JSON files.
///
/// The sportsbook system is the hub: direct maps exist sportsbook<->kenpom
/// and sportsbook<->teamrankings. Kenpom<->teamrankings translation is an
/// explicit two-step composition through the hub, never a graph search, so a
/// failed translation always names the hop that broke.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    teamrankings: HashSet<String>,
    sportsbook: HashSet<String>,
    kenpom: HashSet<String>,
    sportsbook_to_kenpom: HashMap<String, String>,
    kenpom_to_sportsbook: HashMap<String, String>,
    sportsbook_to_teamrankings: HashMap<String, String>,
    teamrankings_to_sportsbook: HashMap<String, String>,
}

impl TeamDirectory {
    /// Load every name list and cross-site map from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        Ok(Self {
            teamrankings: read_json_file(&dir.join("teamrankings.json"))?,
            sportsbook: read_json_file(&dir.join("sportsbook.json"))?,
            kenpom: read_json_file(&dir.join("kenpom.json"))?,
            sportsbook_to_kenpom: read_json_file(&dir.join("sportsbook2kenpom.json"))?,
            kenpom_to_sportsbook: read_json_file(&dir.join("kenpom2sportsbook.json"))?,
            sportsbook_to_teamrankings: read_json_file(&dir.join("sportsbook2teamrankings.json"))?,
            teamrankings_to_sportsbook: read_json_file(&dir.join("teamrankings2sportsbook.json"))?,
        })
    }

    /// Build a directory from in-memory parts. Mostly for tests.
    pub fn from_parts(
        teamrankings: Vec<String>,
        sportsbook: Vec<String>,
        kenpom: Vec<String>,
        sportsbook_to_kenpom: HashMap<String, String>,
        kenpom_to_sportsbook: HashMap<String, String>,
        sportsbook_to_teamrankings: HashMap<String, String>,
        teamrankings_to_sportsbook: HashMap<String, String>,
    ) -> Self {
        Self {
            teamrankings: teamrankings.into_iter().collect(),
            sportsbook: sportsbook.into_iter().collect(),
            kenpom: kenpom.into_iter().collect(),
            sportsbook_to_kenpom,
            kenpom_to_sportsbook,
            sportsbook_to_teamrankings,
            teamrankings_to_sportsbook,
        }
    }

    /// Exact membership test for `name` in one naming system.
    pub fn is_member(&self, name: &str, system: NamingSystem) -> bool {
        self.members(system).contains(name)
    }

    fn members(&self, system: NamingSystem) -> &HashSet<String> {
        match system {
            NamingSystem::TeamRankings => &self.teamrankings,
            NamingSystem::Sportsbook => &self.sportsbook,
            NamingSystem::KenPom => &self.kenpom,
        }
    }

    /// Translate `name` from one naming system to another.
    pub fn translate(
        &self,
        name: &str,
        from: NamingSystem,
        to: NamingSystem,
    ) -> Result<String, ModelError> {
        use NamingSystem::*;
        match (from, to) {
            (a, b) if a == b => {
                if self.is_member(name, a) {
                    Ok(name.to_string())
                } else {
                    Err(not_found(name))
                }
            }
            (Sportsbook, KenPom) => lookup(&self.sportsbook_to_kenpom, name),
            (KenPom, Sportsbook) => lookup(&self.kenpom_to_sportsbook, name),
            (Sportsbook, TeamRankings) => lookup(&self.sportsbook_to_teamrankings, name),
            (TeamRankings, Sportsbook) => lookup(&self.teamrankings_to_sportsbook, name),
            // No direct kenpom<->teamrankings maps exist; hop through the
            // sportsbook names explicitly.
            (KenPom, TeamRankings) => {
                let hub = lookup(&self.kenpom_to_sportsbook, name)?;
                lookup(&self.sportsbook_to_teamrankings, &hub)
            }
            (TeamRankings, KenPom) => {
                let hub = lookup(&self.teamrankings_to_sportsbook, name)?;
                lookup(&self.sportsbook_to_kenpom, &hub)
            }
            _ => unreachable!(),
        }
    }

    /// Whatever system `name` came from, produce its spelling in `to`.
    /// Detection tries the systems in declaration order, so a name valid in
    /// several systems resolves through the first one that claims it.
    pub fn normalize(&self, name: &str, to: NamingSystem) -> Result<String, ModelError> {
        for system in [
            NamingSystem::TeamRankings,
            NamingSystem::Sportsbook,
            NamingSystem::KenPom,
        ] {
            if self.is_member(name, system) {
                return self.translate(name, system, to);
            }
        }
        Err(not_found(name))
    }
}

fn not_found(name: &str) -> ModelError {
    ModelError::TeamNotFound {
        name: name.to_string(),
    }
}

/// Look up a key in a cross-site name map:
/// 1. exact match
/// 2. case-insensitive match
/// 3. fuzzy partial-ratio match, best score wins, ties broken by
///    lexicographically smallest key, accepted only above the threshold
fn lookup(map: &HashMap<String, String>, name: &str) -> Result<String, ModelError> {
    if let Some(v) = map.get(name) {
        return Ok(v.clone());
    }

    let lower = name.to_lowercase();
    for (k, v) in map {
        if k.to_lowercase() == lower {
            return Ok(v.clone());
        }
    }

    let mut best: Option<(f64, &String, &String)> = None;
    for (k, v) in map {
        let score = partial_ratio(&k.to_lowercase(), &lower);
        let better = match best {
            None => true,
            Some((best_score, best_key, _)) => {
                score > best_score || (score == best_score && k < best_key)
            }
        };
        if better {
            best = Some((score, k, v));
        }
    }

    match best {
        Some((score, _, v)) if score > FUZZY_MATCH_THRESHOLD => Ok(v.clone()),
        _ => Err(not_found(name)),
    }
}

/// Best normalized-Levenshtein similarity of the shorter string against every
/// equal-length window of the longer one. 1.0 means the shorter string
/// appears verbatim inside the longer.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (needle, hay) = if a_chars.len() <= b_chars.len() {
        (a_chars, b_chars)
    } else {
        (b_chars, a_chars)
    };

    if needle.is_empty() {
        return if hay.is_empty() { 1.0 } else { 0.0 };
    }

    let n = needle.len();
    let needle: String = needle.into_iter().collect();
    let mut best = 0.0_f64;
    for start in 0..=(hay.len() - n) {
        let window: String = hay[start..start + n].iter().collect();
        let score = strsim::normalized_levenshtein(&needle, &window);
        if score > best {
            best = score;
        }
    }
    best
}

fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ModelError::Configuration {
        reason: format!("cannot read team data file {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&raw).map_err(|e| ModelError::Configuration {
        reason: format!("cannot parse team data file {}: {}", path.display(), e),
    })
}
