use std::env;
use std::path::PathBuf;

use crate::history::AverageBasis;

const APP_DIR: &str = "coach_insights";
const DB_FILE: &str = "insights.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsConfig {
    pub db_path: Option<PathBuf>,
    pub average_basis: AverageBasis,
    pub snapshot_cache: bool,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            db_path: app_cache_dir().map(|dir| dir.join(DB_FILE)),
            average_basis: AverageBasis::SelectedGames,
            snapshot_cache: true,
        }
    }
}

impl InsightsConfig {
    /// Reads `COACH_INSIGHTS_*` variables; anything unset or unparsable keeps
    /// its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(path) = lookup("COACH_INSIGHTS_DB")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            cfg.db_path = Some(PathBuf::from(path));
        }
        if let Some(basis) = lookup("COACH_INSIGHTS_AVERAGE_BASIS").and_then(|s| s.parse().ok()) {
            cfg.average_basis = basis;
        }
        if let Some(raw) = lookup("COACH_INSIGHTS_SNAPSHOT_CACHE") {
            cfg.snapshot_cache = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        cfg
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    // Prefer XDG cache.
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(APP_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cfg_from(pairs: &[(&str, &str)]) -> InsightsConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        InsightsConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn overrides_apply() {
        let cfg = cfg_from(&[
            ("COACH_INSIGHTS_DB", " /tmp/x.sqlite "),
            ("COACH_INSIGHTS_AVERAGE_BASIS", "recorded"),
            ("COACH_INSIGHTS_SNAPSHOT_CACHE", "off"),
        ]);
        assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/x.sqlite")));
        assert_eq!(cfg.average_basis, AverageBasis::RecordedGames);
        assert!(!cfg.snapshot_cache);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let cfg = cfg_from(&[
            ("COACH_INSIGHTS_AVERAGE_BASIS", "median"),
            ("COACH_INSIGHTS_SNAPSHOT_CACHE", "yes"),
        ]);
        assert_eq!(cfg.average_basis, AverageBasis::SelectedGames);
        assert!(cfg.snapshot_cache);
    }
}
