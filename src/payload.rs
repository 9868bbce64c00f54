use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::history::GameStats;
use crate::model::{GameId, GameRecord, NoteEntry, Player};
use crate::stat_record::{MetricValue, StatMap, merge};
use crate::stat_schema::{Position, StatSchema, Unit};
use crate::timeline::{FlatNote, GameNotes, group_flat_notes};

/// Columns that ride along with a stats row but are not metrics.
const BOOKKEEPING_COLUMNS: &[&str] = &[
    "id",
    "player_id",
    "playerId",
    "game_id",
    "gameId",
    "created_at",
    "updated_at",
];

/// Snapshot of one player's history as delivered by the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerHistory {
    pub games: Vec<GameRecord>,
    pub stats_by_game: Vec<GameStats>,
    pub notes: Vec<GameNotes>,
}

impl PlayerHistory {
    pub fn game_ids(&self) -> Vec<GameId> {
        self.games.iter().map(|g| g.id).collect()
    }

    /// The game's StatRecord, with duplicate rows for the same game summed
    /// the way aggregation counts them.
    pub fn stats_for(&self, game_id: GameId) -> Option<StatMap> {
        let mut rows = self.stats_by_game.iter().filter(|g| g.game_id == game_id);
        let mut out = rows.next()?.stats.clone();
        for row in rows {
            for (metric, value) in &row.stats {
                let slot = out.entry(metric.clone()).or_insert(0);
                *slot = slot.saturating_add(*value);
            }
        }
        Some(out)
    }
}

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    games: Vec<GameRecord>,
    #[serde(default, alias = "statsByGame")]
    stats_by_game: Vec<Map<String, Value>>,
    #[serde(default)]
    notes: Vec<FlatNote>,
}

pub fn parse_player_history_json(raw: &str) -> Result<PlayerHistory> {
    let parsed = serde_json::from_str::<Option<RawHistory>>(raw.trim())
        .context("invalid player history json")?;
    let Some(parsed) = parsed else {
        return Ok(PlayerHistory::default());
    };

    let mut stats_by_game = Vec::with_capacity(parsed.stats_by_game.len());
    for row in &parsed.stats_by_game {
        match decode_stats_row(row) {
            Some(entry) => stats_by_game.push(entry),
            None => warn!("dropping stats row without a usable game id"),
        }
    }

    Ok(PlayerHistory {
        games: parsed.games,
        stats_by_game,
        notes: group_flat_notes(&parsed.notes),
    })
}

/// Accepts both the flat column layout (`{game_id, passing_yards, ...}`) and
/// the nested one (`{gameId, stats: {...}}`). Null columns are treated as
/// absent rather than as zero.
fn decode_stats_row(row: &Map<String, Value>) -> Option<GameStats> {
    let game_id = row
        .get("game_id")
        .or_else(|| row.get("gameId"))
        .and_then(as_i64_any)?;

    let source = match row.get("stats") {
        Some(Value::Object(nested)) => nested,
        _ => row,
    };

    let stats = source
        .iter()
        .filter(|(key, _)| !BOOKKEEPING_COLUMNS.contains(&key.as_str()))
        .filter(|(_, value)| !value.is_null() && !value.is_object())
        .map(|(key, value)| (key.clone(), value.zero_default()))
        .collect();

    Some(GameStats { game_id, stats })
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

/// Per-game stats and notes for the edit panel.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameInsights {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stats: HashMap<String, Value>,
    #[serde(default)]
    pub notes: Vec<NoteEntry>,
}

fn null_as_empty<'de, D>(d: D) -> std::result::Result<HashMap<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<HashMap<String, Value>>::deserialize(d)?.unwrap_or_default())
}

pub fn parse_game_insights_json(raw: &str) -> Result<GameInsights> {
    let parsed = serde_json::from_str::<Option<GameInsights>>(raw.trim())
        .context("invalid game insights json")?;
    let mut insights = parsed.unwrap_or_default();
    insights
        .stats
        .retain(|key, _| !BOOKKEEPING_COLUMNS.contains(&key.as_str()));
    Ok(insights)
}

/// Body of the replace-all insights write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsUpdate {
    pub stats: StatMap,
    pub notes: Vec<NoteEntry>,
}

/// Merge the draft stats against the schema and drop blank note rows.
pub fn build_insights_update(
    schema: &StatSchema,
    stats: &StatMap,
    notes: &[NoteEntry],
) -> InsightsUpdate {
    InsightsUpdate {
        stats: merge(schema, stats),
        notes: notes.iter().filter(|n| !n.is_blank()).cloned().collect(),
    }
}

/// Body of the player write used for position changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub unit: Unit,
    pub position: Position,
}

impl PlayerUpdate {
    pub fn for_player(player: &Player) -> Self {
        Self {
            unit: player.unit,
            position: player.position,
        }
    }
}

pub fn parse_player_json(raw: &str) -> Result<Player> {
    serde_json::from_str::<Player>(raw.trim()).context("invalid player json")
}
