//! Position changes never migrate or delete stat history. The schema used for
//! display and aggregation simply switches, and metrics the new position does
//! not track become hidden until the player moves back.

use std::collections::BTreeSet;

use tracing::info;

use crate::history::GameStats;
use crate::model::Player;
use crate::stat_record::StatMap;
use crate::stat_schema::{Position, Unit, schema_for};

/// Recorded keys that `new`'s schema will not show, old-schema order first,
/// then any other recorded keys sorted.
pub fn will_hide_metrics(old: Position, new: Position, record: &StatMap) -> Vec<String> {
    hidden_keys(old, new, record.keys().map(String::as_str))
}

pub fn will_hide_metrics_across(old: Position, new: Position, records: &[GameStats]) -> Vec<String> {
    hidden_keys(
        old,
        new,
        records.iter().flat_map(|r| r.stats.keys().map(String::as_str)),
    )
}

fn hidden_keys<'a, I>(old: Position, new: Position, recorded: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let old_schema = schema_for(old);
    let new_schema = schema_for(new);
    let present: BTreeSet<&str> = recorded
        .into_iter()
        .filter(|k| !new_schema.contains(k))
        .collect();

    let mut out: Vec<String> = old_schema
        .metric_names()
        .filter(|m| present.contains(m))
        .map(str::to_string)
        .collect();
    // BTreeSet iteration is already sorted.
    out.extend(
        present
            .iter()
            .filter(|k| !old_schema.contains(k))
            .map(|k| k.to_string()),
    );
    out
}

/// A pending, unconfirmed position change for one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionChangeProposal {
    player: Player,
    pub from: (Unit, Position),
    pub to: (Unit, Position),
    pub hidden_metrics: Vec<String>,
}

impl PositionChangeProposal {
    pub fn new(player: &Player, new_position: Position, history: &[GameStats]) -> Self {
        let hidden_metrics = if player.position == new_position {
            Vec::new()
        } else {
            will_hide_metrics_across(player.position, new_position, history)
        };
        Self {
            player: player.clone(),
            from: (player.unit, player.position),
            to: (new_position.unit(), new_position),
            hidden_metrics,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Copy for the confirmation prompt; `None` when nothing changes.
    pub fn warning(&self) -> Option<String> {
        if self.is_noop() {
            return None;
        }
        let (_, from) = self.from;
        let (_, to) = self.to;
        let mut msg = format!(
            "Change {} from {} to {}?",
            self.player.name,
            from.label(),
            to.label()
        );
        if !self.hidden_metrics.is_empty() {
            let shown: Vec<&str> = self.hidden_metrics.iter().take(6).map(String::as_str).collect();
            let more = self.hidden_metrics.len().saturating_sub(shown.len());
            msg.push_str(&format!(
                " {} recorded metric(s) will be hidden: {}",
                self.hidden_metrics.len(),
                shown.join(", ")
            ));
            if more > 0 {
                msg.push_str(&format!(" and {more} more"));
            }
            msg.push('.');
        }
        msg.push_str(" Stat history is kept and reappears if the position is changed back.");
        Some(msg)
    }

    /// The player with the new position. Unit always follows the position.
    pub fn confirm(self) -> Player {
        let (unit, position) = self.to;
        if !self.is_noop() {
            info!(
                player_id = self.player.id,
                from = %self.from.1,
                to = %position,
                hidden = self.hidden_metrics.len(),
                "position change confirmed"
            );
        }
        Player {
            unit,
            position,
            ..self.player
        }
    }

    pub fn cancel(self) -> Player {
        self.player
    }
}
