use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use tracing::{info, warn};

use crate::history::GameStats;
use crate::model::{GameId, GameRecord, NoteEntry, Player, PlayerId};
use crate::payload::{GameInsights, InsightsUpdate, PlayerHistory};
use crate::stat_record::{MetricValue, StatMap};
use crate::stat_schema::{Position, Unit, is_known_metric};
use crate::timeline::{FlatNote, group_flat_notes};

const DATE_FMT: &str = "%Y-%m-%d";

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        CREATE TABLE IF NOT EXISTS players (
            id INTEGER PRIMARY KEY,
            team_id INTEGER NULL,
            player_name TEXT NOT NULL,
            jersey_number INTEGER NOT NULL,
            unit TEXT NOT NULL,
            position TEXT NOT NULL,
            notes TEXT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS games (
            id INTEGER PRIMARY KEY,
            team_id INTEGER NULL,
            name TEXT NULL,
            opponent TEXT NOT NULL,
            game_date TEXT NOT NULL,
            team_score INTEGER NULL,
            opponent_score INTEGER NULL
        );
        CREATE INDEX IF NOT EXISTS idx_games_team ON games(team_id);

        CREATE TABLE IF NOT EXISTS stat_records (
            player_id INTEGER NOT NULL REFERENCES players(id),
            game_id INTEGER NOT NULL REFERENCES games(id),
            saved_at TEXT NOT NULL,
            PRIMARY KEY (player_id, game_id)
        );
        CREATE TABLE IF NOT EXISTS player_stats (
            player_id INTEGER NOT NULL,
            game_id INTEGER NOT NULL,
            metric TEXT NOT NULL,
            value INTEGER NOT NULL,
            PRIMARY KEY (player_id, game_id, metric),
            FOREIGN KEY (player_id, game_id) REFERENCES stat_records(player_id, game_id)
        );
        CREATE TABLE IF NOT EXISTS player_notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL REFERENCES players(id),
            game_id INTEGER NOT NULL REFERENCES games(id),
            category TEXT NOT NULL,
            note TEXT NOT NULL,
            time TEXT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notes_player_game ON player_notes(player_id, game_id);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn upsert_player(conn: &Connection, player: &Player) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO players (id, team_id, player_name, jersey_number, unit, position, notes, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(id) DO UPDATE SET
            team_id = excluded.team_id,
            player_name = excluded.player_name,
            jersey_number = excluded.jersey_number,
            unit = excluded.unit,
            position = excluded.position,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        "#,
        params![
            player.id,
            player.team_id,
            player.name,
            player.jersey_number,
            player.unit.code(),
            player.position.code(),
            player.notes,
            Utc::now().to_rfc3339(),
        ],
    )
    .context("upsert player")?;
    Ok(())
}

pub fn upsert_game(conn: &Connection, team_id: Option<i64>, game: &GameRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO games (id, team_id, name, opponent, game_date, team_score, opponent_score)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(id) DO UPDATE SET
            team_id = excluded.team_id,
            name = excluded.name,
            opponent = excluded.opponent,
            game_date = excluded.game_date,
            team_score = excluded.team_score,
            opponent_score = excluded.opponent_score
        "#,
        params![
            game.id,
            team_id,
            game.name,
            game.opponent,
            game.game_date.format(DATE_FMT).to_string(),
            game.team_score,
            game.opponent_score,
        ],
    )
    .context("upsert game")?;
    Ok(())
}

struct PlayerRow {
    id: PlayerId,
    team_id: Option<i64>,
    name: String,
    jersey_number: u32,
    unit: String,
    position: String,
    notes: Option<String>,
}

pub fn load_player(conn: &Connection, player_id: PlayerId) -> Result<Player> {
    let row = conn
        .query_row(
            "SELECT id, team_id, player_name, jersey_number, unit, position, notes
             FROM players WHERE id = ?1",
            params![player_id],
            |row| {
                Ok(PlayerRow {
                    id: row.get(0)?,
                    team_id: row.get(1)?,
                    name: row.get(2)?,
                    jersey_number: row.get(3)?,
                    unit: row.get(4)?,
                    position: row.get(5)?,
                    notes: row.get(6)?,
                })
            },
        )
        .optional()
        .context("query player")?
        .ok_or_else(|| anyhow!("player {player_id} not found"))?;

    let position = Position::from_code(&row.position)
        .ok_or_else(|| anyhow!("player {} has unknown position {:?}", row.id, row.position))?;
    let unit = Unit::from_code(&row.unit).unwrap_or_else(|| position.unit());
    Ok(Player {
        id: row.id,
        team_id: row.team_id,
        name: row.name,
        jersey_number: row.jersey_number,
        unit,
        position,
        notes: row.notes,
    })
}

pub fn list_players(conn: &Connection) -> Result<Vec<Player>> {
    let mut stmt = conn
        .prepare("SELECT id FROM players ORDER BY jersey_number ASC, id ASC")
        .context("prepare list players query")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, PlayerId>(0))
        .context("query list players")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("decode player id")?;
    ids.into_iter().map(|id| load_player(conn, id)).collect()
}

/// Games for the player's team (newest first), every StatRecord, and the
/// notes grouped by game.
pub fn load_player_history(conn: &Connection, player_id: PlayerId) -> Result<PlayerHistory> {
    let player = load_player(conn, player_id)?;

    let mut stmt = conn
        .prepare(
            "SELECT id, name, opponent, game_date, team_score, opponent_score
             FROM games WHERE team_id IS ?1
             ORDER BY game_date DESC, id ASC",
        )
        .context("prepare games query")?;
    let raw_games = stmt
        .query_map(params![player.team_id], |row| {
            Ok((
                row.get::<_, GameId>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i32>>(4)?,
                row.get::<_, Option<i32>>(5)?,
            ))
        })
        .context("query games")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("decode game row")?;
    let mut games = Vec::with_capacity(raw_games.len());
    for (id, name, opponent, date, team_score, opponent_score) in raw_games {
        games.push(GameRecord {
            id,
            name,
            opponent,
            game_date: parse_date(&date)?,
            team_score,
            opponent_score,
        });
    }

    let stats_by_game = load_stat_records(conn, player_id)?;

    let mut stmt = conn
        .prepare(
            "SELECT n.id, n.game_id, g.game_date, g.opponent, n.category, n.note, n.time
             FROM player_notes n JOIN games g ON n.game_id = g.id
             WHERE n.player_id = ?1
             ORDER BY g.game_date DESC, n.id ASC",
        )
        .context("prepare notes query")?;
    let raw_notes = stmt
        .query_map(params![player_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, GameId>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })
        .context("query notes")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("decode note row")?;
    let mut flat = Vec::with_capacity(raw_notes.len());
    for (id, game_id, date, opponent, category, note, time) in raw_notes {
        flat.push(FlatNote {
            id: Some(id),
            game_id,
            game_date: parse_date(&date)?,
            opponent,
            category: Some(category),
            note,
            time,
        });
    }

    Ok(PlayerHistory {
        games,
        stats_by_game,
        notes: group_flat_notes(&flat),
    })
}

fn load_stat_records(conn: &Connection, player_id: PlayerId) -> Result<Vec<GameStats>> {
    let mut stmt = conn
        .prepare(
            "SELECT r.game_id, s.metric, s.value
             FROM stat_records r
             LEFT JOIN player_stats s ON s.player_id = r.player_id AND s.game_id = r.game_id
             WHERE r.player_id = ?1
             ORDER BY r.game_id ASC, s.metric ASC",
        )
        .context("prepare stats query")?;
    let rows = stmt
        .query_map(params![player_id], |row| {
            Ok((
                row.get::<_, GameId>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })
        .context("query stats")?;

    let mut out: Vec<GameStats> = Vec::new();
    for row in rows {
        let (game_id, metric, value) = row.context("decode stats row")?;
        if out.last().is_none_or(|g| g.game_id != game_id) {
            out.push(GameStats {
                game_id,
                stats: StatMap::new(),
            });
        }
        if let (Some(metric), Some(slot)) = (metric, out.last_mut()) {
            slot.stats.insert(metric, value.zero_default());
        }
    }
    Ok(out)
}

pub fn load_game_insights(conn: &Connection, player_id: PlayerId, game_id: GameId) -> Result<GameInsights> {
    ensure_player_and_game(conn, player_id, game_id)?;

    let mut stmt = conn
        .prepare("SELECT metric, value FROM player_stats WHERE player_id = ?1 AND game_id = ?2")
        .context("prepare game stats query")?;
    let stats = stmt
        .query_map(params![player_id, game_id], |row| {
            Ok((row.get::<_, String>(0)?, Value::from(row.get::<_, i64>(1)?)))
        })
        .context("query game stats")?
        .collect::<rusqlite::Result<HashMap<_, _>>>()
        .context("decode game stats row")?;

    let mut stmt = conn
        .prepare(
            "SELECT id, category, note, time FROM player_notes
             WHERE player_id = ?1 AND game_id = ?2 ORDER BY id ASC",
        )
        .context("prepare game notes query")?;
    let notes = stmt
        .query_map(params![player_id, game_id], |row| {
            Ok(NoteEntry {
                id: Some(row.get(0)?),
                category: row.get(1)?,
                text: row.get(2)?,
                time: row.get(3)?,
            })
        })
        .context("query game notes")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("decode game note row")?;

    Ok(GameInsights { stats, notes })
}

/// Replace one player's StatRecord and notes for one game. All or nothing.
pub fn save_game_insights(
    conn: &mut Connection,
    player_id: PlayerId,
    game_id: GameId,
    update: &InsightsUpdate,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin insights transaction")?;
    let kept = write_game_insights(&tx, player_id, game_id, update, &now)?;
    tx.commit().context("commit insights transaction")?;

    info!(
        player_id,
        game_id,
        metrics = update.stats.len(),
        notes = kept,
        "saved game insights"
    );
    Ok(())
}

/// An empty stats map removes the StatRecord instead of leaving an empty one.
fn write_game_insights(
    conn: &Connection,
    player_id: PlayerId,
    game_id: GameId,
    update: &InsightsUpdate,
    now: &str,
) -> Result<usize> {
    ensure_player_and_game(conn, player_id, game_id)?;

    let mut unknown: Vec<&str> = update
        .stats
        .keys()
        .map(String::as_str)
        .filter(|k| !is_known_metric(k))
        .collect();
    if !unknown.is_empty() {
        unknown.sort_unstable();
        // Stored as given.
        warn!(player_id, game_id, keys = ?unknown, "saving metrics outside the catalog");
    }

    conn.execute(
        "DELETE FROM player_stats WHERE player_id = ?1 AND game_id = ?2",
        params![player_id, game_id],
    )
    .context("clear player stats")?;
    if update.stats.is_empty() {
        conn.execute(
            "DELETE FROM stat_records WHERE player_id = ?1 AND game_id = ?2",
            params![player_id, game_id],
        )
        .context("clear stat record")?;
    } else {
        conn.execute(
            "INSERT INTO stat_records (player_id, game_id, saved_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(player_id, game_id) DO UPDATE SET saved_at = excluded.saved_at",
            params![player_id, game_id, now],
        )
        .context("upsert stat record")?;
        for (metric, value) in &update.stats {
            conn.execute(
                "INSERT INTO player_stats (player_id, game_id, metric, value) VALUES (?1, ?2, ?3, ?4)",
                params![player_id, game_id, metric, value],
            )
            .with_context(|| format!("insert stat {metric}"))?;
        }
    }

    conn.execute(
        "DELETE FROM player_notes WHERE player_id = ?1 AND game_id = ?2",
        params![player_id, game_id],
    )
    .context("clear player notes")?;
    let mut kept = 0usize;
    for note in update.notes.iter().filter(|n| !n.is_blank()) {
        conn.execute(
            "INSERT INTO player_notes (player_id, game_id, category, note, time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![player_id, game_id, note.category, note.text, note.time, now],
        )
        .context("insert player note")?;
        kept += 1;
    }
    Ok(kept)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub games: usize,
    pub insight_records: usize,
}

/// Load a whole player-history payload in one transaction. Stats or notes
/// that point at a game missing from `history.games` reject the import
/// before anything is written.
pub fn import_player_history(
    conn: &mut Connection,
    player: &Player,
    history: &PlayerHistory,
) -> Result<ImportSummary> {
    let known: HashSet<GameId> = history.game_ids().into_iter().collect();
    let mut game_ids: Vec<GameId> = history.stats_by_game.iter().map(|g| g.game_id).collect();
    game_ids.extend(history.notes.iter().map(|g| g.game_id));
    let mut seen = HashSet::new();
    game_ids.retain(|id| seen.insert(*id));

    let orphans: BTreeSet<GameId> = game_ids
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect();
    if !orphans.is_empty() {
        bail!("import references games not in its game list: {orphans:?}");
    }

    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction().context("begin import transaction")?;
    upsert_player(&tx, player)?;
    for game in &history.games {
        upsert_game(&tx, player.team_id, game)?;
    }
    for game_id in &game_ids {
        let update = InsightsUpdate {
            stats: history.stats_for(*game_id).unwrap_or_default(),
            notes: history
                .notes
                .iter()
                .filter(|g| g.game_id == *game_id)
                .flat_map(|g| g.notes.iter().cloned())
                .collect(),
        };
        write_game_insights(&tx, player.id, *game_id, &update, &now)?;
    }
    tx.commit().context("commit import transaction")?;

    info!(
        player_id = player.id,
        games = history.games.len(),
        records = game_ids.len(),
        "imported player history"
    );
    Ok(ImportSummary {
        games: history.games.len(),
        insight_records: game_ids.len(),
    })
}

/// Touches only the player row. Stat and note rows are left as they are.
pub fn update_player_position(
    conn: &mut Connection,
    player_id: PlayerId,
    position: Position,
) -> Result<Player> {
    let tx = conn.transaction().context("begin position transaction")?;
    let changed = tx
        .execute(
            "UPDATE players SET position = ?1, unit = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                position.code(),
                position.unit().code(),
                Utc::now().to_rfc3339(),
                player_id
            ],
        )
        .context("update player position")?;
    if changed != 1 {
        bail!("player {player_id} not found");
    }
    tx.commit().context("commit position transaction")?;
    info!(player_id, position = %position, "updated player position");
    load_player(conn, player_id)
}

fn ensure_player_and_game(conn: &Connection, player_id: PlayerId, game_id: GameId) -> Result<()> {
    let player_team = conn
        .query_row(
            "SELECT team_id FROM players WHERE id = ?1",
            params![player_id],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()
        .context("query player team")?
        .ok_or_else(|| anyhow!("player {player_id} not found"))?;
    let game_team = conn
        .query_row(
            "SELECT team_id FROM games WHERE id = ?1",
            params![game_id],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()
        .context("query game team")?
        .ok_or_else(|| anyhow!("game {game_id} not found"))?;
    if player_team != game_team {
        bail!("game {game_id} does not belong to player {player_id}'s team");
    }
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, DATE_FMT).with_context(|| format!("invalid game date {raw:?}"))
}
