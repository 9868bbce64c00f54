use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{GameId, NoteEntry, default_note_category};

/// All notes one player has for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameNotes {
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub opponent: String,
    pub notes: Vec<NoteEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub opponent: String,
    pub category: String,
    pub text: String,
    pub time: Option<String>,
}

/// Flatten the selected games' notes oldest game first. Blank rows are
/// dropped; repeated text across games is kept.
pub fn timeline(notes_by_game: &[GameNotes], selected: &HashSet<GameId>) -> Vec<TimelineEntry> {
    let mut out: Vec<TimelineEntry> = notes_by_game
        .iter()
        .filter(|g| selected.contains(&g.game_id))
        .flat_map(|g| {
            g.notes
                .iter()
                .filter(|n| !n.is_blank())
                .map(move |n| TimelineEntry {
                    game_id: g.game_id,
                    game_date: g.game_date,
                    opponent: g.opponent.clone(),
                    category: n.category.clone(),
                    text: n.text.clone(),
                    time: n.time.clone(),
                })
        })
        .collect();
    // Stable: ties keep game-list order, then insertion order.
    out.sort_by_key(|e| e.game_date);
    out
}

/// One row of the flat notes list in the history payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNote {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(alias = "gameId")]
    pub game_id: GameId,
    #[serde(alias = "gameDate")]
    pub game_date: NaiveDate,
    #[serde(default)]
    pub opponent: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(alias = "text")]
    pub note: String,
    #[serde(default)]
    pub time: Option<String>,
}

/// Group flat rows by game, keeping first-appearance order of games and
/// the row order within each game.
pub fn group_flat_notes(rows: &[FlatNote]) -> Vec<GameNotes> {
    let mut index: HashMap<GameId, usize> = HashMap::new();
    let mut out: Vec<GameNotes> = Vec::new();
    for row in rows {
        let slot = *index.entry(row.game_id).or_insert_with(|| {
            out.push(GameNotes {
                game_id: row.game_id,
                game_date: row.game_date,
                opponent: row.opponent.clone(),
                notes: Vec::new(),
            });
            out.len() - 1
        });
        out[slot].notes.push(NoteEntry {
            id: row.id,
            category: row
                .category
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(default_note_category),
            text: row.note.clone(),
            time: row.time.clone(),
        });
    }
    out
}
