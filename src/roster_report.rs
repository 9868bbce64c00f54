use std::collections::{BTreeSet, HashSet};

use rayon::prelude::*;
use serde::Serialize;

use crate::history::{AverageBasis, HistorySummary, aggregate_with_basis};
use crate::model::{GameId, Player, PlayerId};
use crate::payload::PlayerHistory;
use crate::stat_schema::{Position, Unit, schema_for};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterRow {
    pub player_id: PlayerId,
    pub name: String,
    pub jersey_number: u32,
    pub unit: Unit,
    pub position: Position,
    pub games_selected: usize,
    pub games_recorded: usize,
    pub summary: HistorySummary,
    /// Recorded keys the current position does not display.
    pub hidden_metrics: Vec<String>,
}

/// Aggregate every player's full history under their own current schema.
pub fn summarize_roster(entries: &[(Player, PlayerHistory)], basis: AverageBasis) -> Vec<RosterRow> {
    let mut rows: Vec<RosterRow> = entries
        .par_iter()
        .map(|(player, history)| summarize_player(player, history, basis))
        .collect();
    rows.sort_by(|a, b| {
        unit_rank(a.unit)
            .cmp(&unit_rank(b.unit))
            .then(a.jersey_number.cmp(&b.jersey_number))
            .then(a.player_id.cmp(&b.player_id))
    });
    rows
}

pub fn summarize_player(player: &Player, history: &PlayerHistory, basis: AverageBasis) -> RosterRow {
    let schema = schema_for(player.position);
    let selected: HashSet<GameId> = history.game_ids().into_iter().collect();
    let summary = aggregate_with_basis(&schema, &history.stats_by_game, &selected, basis);
    let games_recorded = history
        .stats_by_game
        .iter()
        .filter(|g| selected.contains(&g.game_id))
        .map(|g| g.game_id)
        .collect::<HashSet<_>>()
        .len();
    let hidden: BTreeSet<&str> = history
        .stats_by_game
        .iter()
        .flat_map(|g| g.stats.keys().map(String::as_str))
        .filter(|k| !schema.contains(k))
        .collect();

    RosterRow {
        player_id: player.id,
        name: player.name.clone(),
        jersey_number: player.jersey_number,
        unit: player.unit,
        position: player.position,
        games_selected: selected.len(),
        games_recorded,
        summary,
        hidden_metrics: hidden.into_iter().map(str::to_string).collect(),
    }
}

fn unit_rank(unit: Unit) -> u8 {
    match unit {
        Unit::Offense => 0,
        Unit::Defense => 1,
        Unit::SpecialTeams => 2,
    }
}
