use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::history::{
    AverageBasis, GameBreakdown, HistorySummary, aggregate_with_basis, per_game_breakdown,
};
use crate::model::{GameId, NoteEntry, default_note_category};
use crate::payload::{InsightsUpdate, PlayerHistory, build_insights_update};
use crate::stat_record::{StatMap, VisibleStat, merge, visible_stats};
use crate::stat_schema::StatSchema;
use crate::timeline::{TimelineEntry, timeline};

/// State behind the history panel: the latest snapshot, the schema of the
/// player's current position, and which games are selected. Every read
/// re-derives from the snapshot.
#[derive(Debug, Clone)]
pub struct HistoryView {
    schema: StatSchema,
    snapshot: PlayerHistory,
    selected: HashSet<GameId>,
    basis: AverageBasis,
}

impl HistoryView {
    /// Opens with every game selected.
    pub fn open(schema: StatSchema, snapshot: PlayerHistory, basis: AverageBasis) -> Self {
        let selected = snapshot.game_ids().into_iter().collect();
        Self {
            schema,
            snapshot,
            selected,
            basis,
        }
    }

    pub fn schema(&self) -> &StatSchema {
        &self.schema
    }

    pub fn snapshot(&self) -> &PlayerHistory {
        &self.snapshot
    }

    pub fn selected(&self) -> &HashSet<GameId> {
        &self.selected
    }

    pub fn is_selected(&self, game_id: GameId) -> bool {
        self.selected.contains(&game_id)
    }

    /// Ids outside the snapshot's game list are ignored.
    pub fn toggle_game(&mut self, game_id: GameId) {
        if !self.snapshot.games.iter().any(|g| g.id == game_id) {
            return;
        }
        if !self.selected.remove(&game_id) {
            self.selected.insert(game_id);
        }
    }

    pub fn select_only<I: IntoIterator<Item = GameId>>(&mut self, ids: I) {
        let known: HashSet<GameId> = self.snapshot.game_ids().into_iter().collect();
        self.selected = ids.into_iter().filter(|id| known.contains(id)).collect();
    }

    pub fn select_all(&mut self) {
        self.selected = self.snapshot.game_ids().into_iter().collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Swap in a fresher snapshot; the selection keeps only games that still exist.
    pub fn replace_snapshot(&mut self, snapshot: PlayerHistory) {
        let known: HashSet<GameId> = snapshot.game_ids().into_iter().collect();
        self.selected.retain(|id| known.contains(id));
        self.snapshot = snapshot;
    }

    /// Re-render under another schema after a confirmed position change.
    pub fn set_schema(&mut self, schema: StatSchema) {
        self.schema = schema;
    }

    pub fn summary(&self) -> HistorySummary {
        aggregate_with_basis(
            &self.schema,
            &self.snapshot.stats_by_game,
            &self.selected,
            self.basis,
        )
    }

    pub fn breakdown(&self) -> Vec<GameBreakdown> {
        per_game_breakdown(
            &self.schema,
            &self.snapshot.stats_by_game,
            &self.selected,
            &self.snapshot.games,
        )
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        timeline(&self.snapshot.notes, &self.selected)
    }
}

/// Local edit state for one player's stats and notes in one game. Dropping
/// it discards the edits.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightsDraft {
    schema: StatSchema,
    stats: StatMap,
    notes: Vec<NoteEntry>,
    next_local_id: i64,
}

impl InsightsDraft {
    pub fn open(schema: StatSchema, persisted: &HashMap<String, Value>, notes: Vec<NoteEntry>) -> Self {
        let next_local_id = notes.iter().filter_map(|n| n.id).max().unwrap_or(0) + 1;
        Self {
            schema,
            stats: merge(&schema, persisted),
            notes,
            next_local_id,
        }
    }

    pub fn stats(&self) -> &StatMap {
        &self.stats
    }

    pub fn notes(&self) -> &[NoteEntry] {
        &self.notes
    }

    pub fn visible(&self) -> Vec<VisibleStat> {
        visible_stats(&self.schema, &self.stats)
    }

    pub fn set_stat(&mut self, metric: &str, value: u32) {
        self.stats.insert(metric.to_string(), value);
    }

    /// Appends a blank row and returns its id.
    pub fn add_note_row(&mut self) -> i64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        self.notes.push(NoteEntry {
            id: Some(id),
            category: default_note_category(),
            text: String::new(),
            time: Some(String::new()),
        });
        id
    }

    pub fn update_note(&mut self, id: i64, category: Option<&str>, text: Option<&str>, time: Option<&str>) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| n.id == Some(id)) else {
            return false;
        };
        if let Some(category) = category {
            note.category = category.to_string();
        }
        if let Some(text) = text {
            note.text = text.to_string();
        }
        if let Some(time) = time {
            note.time = Some(time.to_string());
        }
        true
    }

    pub fn delete_note_row(&mut self, id: i64) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != Some(id));
        self.notes.len() != before
    }

    pub fn into_update(self) -> InsightsUpdate {
        build_insights_update(&self.schema, &self.stats, &self.notes)
    }
}
