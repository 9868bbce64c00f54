use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::app_cache_dir;
use crate::model::PlayerId;
use crate::payload::PlayerHistory;

const CACHE_FILE: &str = "history_snapshots.json";
const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    players: HashMap<PlayerId, CachedHistory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedHistory {
    saved_at: String,
    history: PlayerHistory,
}

/// Last-known-good history snapshots, one per player.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Option<Self> {
        app_cache_dir().map(|dir| Self::new(dir.join(CACHE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, corrupt or older-version files read as "no snapshot".
    pub fn load(&self, player_id: PlayerId) -> Option<PlayerHistory> {
        let mut cache = load_cache_file(&self.path)?;
        cache.players.remove(&player_id).map(|c| c.history)
    }

    pub fn store(&self, player_id: PlayerId, history: &PlayerHistory) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let mut cache = load_cache_file(&self.path).unwrap_or_else(|| CacheFile {
            version: CACHE_VERSION,
            players: HashMap::new(),
        });
        cache.version = CACHE_VERSION;
        cache.players.insert(
            player_id,
            CachedHistory {
                saved_at: Utc::now().to_rfc3339(),
                history: history.clone(),
            },
        );

        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string(&cache).context("serialize history snapshots")?;
        fs::write(&tmp, json).context("write history snapshots")?;
        fs::rename(&tmp, &self.path).context("swap history snapshots")?;
        Ok(())
    }
}

fn load_cache_file(path: &Path) -> Option<CacheFile> {
    let raw = fs::read_to_string(path).ok()?;
    let cache = serde_json::from_str::<CacheFile>(&raw).ok()?;
    if cache.version != CACHE_VERSION {
        return None;
    }
    Some(cache)
}
