use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::stat_schema::{Position, Unit};

pub type PlayerId = i64;
pub type GameId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub team_id: Option<i64>,
    #[serde(rename = "player_name", alias = "name")]
    pub name: String,
    pub jersey_number: u32,
    pub unit: Unit,
    pub position: Position,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Player {
    /// Unit and position disagree only if a caller built the struct by hand.
    pub fn unit_matches_position(&self) -> bool {
        self.position.unit() == self.unit
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    #[serde(default)]
    pub name: Option<String>,
    pub opponent: String,
    pub game_date: NaiveDate,
    #[serde(default)]
    pub team_score: Option<i32>,
    #[serde(default)]
    pub opponent_score: Option<i32>,
}

impl GameRecord {
    pub fn score_line(&self) -> Option<String> {
        let (Some(us), Some(them)) = (self.team_score, self.opponent_score) else {
            return None;
        };
        Some(format!("{us}-{them}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(
        default = "default_note_category",
        deserialize_with = "category_or_default"
    )]
    pub category: String,
    #[serde(rename = "note", alias = "text")]
    pub text: String,
    #[serde(default)]
    pub time: Option<String>,
}

impl NoteEntry {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub const DEFAULT_NOTE_CATEGORY: &str = "General";

pub fn default_note_category() -> String {
    DEFAULT_NOTE_CATEGORY.to_string()
}

fn category_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(default_note_category))
}
