use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::Connection;
use serde_json::Value;
use tracing::warn;

use coach_insights::config::InsightsConfig;
use coach_insights::history_view::HistoryView;
use coach_insights::insights_store;
use coach_insights::logging;
use coach_insights::model::{GameId, Player, PlayerId};
use coach_insights::payload::{PlayerHistory, parse_player_history_json, parse_player_json};
use coach_insights::position_change::PositionChangeProposal;
use coach_insights::roster_report::summarize_roster;
use coach_insights::snapshot_cache::SnapshotCache;
use coach_insights::stat_schema::{Position, metric_label, schema_for};

const USAGE: &str = "usage: coach_insights <history|set-position|import|roster> [--db PATH] \
[--player ID] [--games 1,2] [--position CODE] [--yes] [--file PATH]";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(command) = args.first().cloned() else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    let cfg = InsightsConfig::from_env();
    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| cfg.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let mut conn = insights_store::open_db(&db_path)?;

    match command.as_str() {
        "history" => run_history(&conn, &cfg, &args),
        "set-position" => run_set_position(&mut conn, &args),
        "import" => run_import(&mut conn, &args),
        "roster" => run_roster(&conn, &cfg),
        other => {
            eprintln!("{USAGE}");
            Err(anyhow!("unknown command {other:?}"))
        }
    }
}

fn run_history(conn: &Connection, cfg: &InsightsConfig, args: &[String]) -> Result<()> {
    let player_id = required_player_id(args)?;
    let player = insights_store::load_player(conn, player_id)?;
    let history = load_history_with_fallback(conn, cfg, player_id)?;

    let mut view = HistoryView::open(schema_for(player.position), history, cfg.average_basis);
    if let Some(raw) = arg_value(args, "--games") {
        view.select_only(parse_ids(&raw));
    }

    println!(
        "#{} {} ({})",
        player.jersey_number,
        player.name,
        player.position.label()
    );
    let summary = view.summary();
    println!("Games: {}", summary.games_counted);

    let mut last_category = "";
    for (category, metric) in view.schema().categorized() {
        if category != last_category {
            println!("{category}");
            last_category = category;
        }
        println!(
            "  {:<24} total {:>6}  avg {:>8.2}",
            metric_label(metric),
            summary.total(metric),
            summary.average(metric)
        );
    }

    let notes = view.timeline();
    if !notes.is_empty() {
        println!("Notes");
        for entry in notes {
            println!(
                "  {} vs {} [{}] {}{}",
                entry.game_date,
                entry.opponent,
                entry.category,
                entry.time.as_deref().map(|t| format!("{t} ")).unwrap_or_default(),
                entry.text
            );
        }
    }
    Ok(())
}

/// Serve the last-known-good snapshot when the store read fails.
fn load_history_with_fallback(
    conn: &Connection,
    cfg: &InsightsConfig,
    player_id: PlayerId,
) -> Result<PlayerHistory> {
    let cache = cfg
        .snapshot_cache
        .then(SnapshotCache::default_location)
        .flatten();
    match insights_store::load_player_history(conn, player_id) {
        Ok(history) => {
            if let Some(cache) = &cache
                && let Err(err) = cache.store(player_id, &history)
            {
                warn!(error = %err, "could not write history snapshot");
            }
            Ok(history)
        }
        Err(err) => {
            let Some(snapshot) = cache.as_ref().and_then(|c| c.load(player_id)) else {
                return Err(err);
            };
            warn!(error = %err, "history load failed, using cached snapshot");
            Ok(snapshot)
        }
    }
}

fn run_set_position(conn: &mut Connection, args: &[String]) -> Result<()> {
    let player_id = required_player_id(args)?;
    let raw = arg_value(args, "--position").context("--position is required")?;
    let position =
        Position::from_code(&raw).ok_or_else(|| anyhow!("unknown position code {raw:?}"))?;

    let player = insights_store::load_player(conn, player_id)?;
    let history = insights_store::load_player_history(conn, player_id)?;
    let proposal = PositionChangeProposal::new(&player, position, &history.stats_by_game);

    let Some(warning) = proposal.warning() else {
        println!("{} is already {}.", player.name, position.label());
        return Ok(());
    };
    println!("{warning}");
    if !has_flag(args, "--yes") {
        let unchanged = proposal.cancel();
        println!(
            "Not changed; {} stays {}. Re-run with --yes to confirm.",
            unchanged.name,
            unchanged.position.label()
        );
        return Ok(());
    }

    let updated = proposal.confirm();
    let stored = insights_store::update_player_position(conn, updated.id, updated.position)?;
    println!("{} is now {}.", stored.name, stored.position.label());
    Ok(())
}

/// Load a player-history JSON file (`{"player": {...}, "games": [...], ...}`)
/// into the local store.
fn run_import(conn: &mut Connection, args: &[String]) -> Result<()> {
    let path = arg_value(args, "--file").context("--file is required")?;
    let raw = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
    let value: Value = serde_json::from_str(&raw).context("invalid import json")?;
    let player_raw = value
        .get("player")
        .map(Value::to_string)
        .context("import file has no player")?;
    let player: Player = parse_player_json(&player_raw)?;
    let history = parse_player_history_json(&raw)?;

    let summary = insights_store::import_player_history(conn, &player, &history)?;
    println!(
        "Imported {} with {} game(s), {} insight record(s).",
        player.name, summary.games, summary.insight_records
    );
    Ok(())
}

fn run_roster(conn: &Connection, cfg: &InsightsConfig) -> Result<()> {
    let players = insights_store::list_players(conn)?;
    let mut entries = Vec::with_capacity(players.len());
    for player in players {
        let history = insights_store::load_player_history(conn, player.id)?;
        entries.push((player, history));
    }
    for row in summarize_roster(&entries, cfg.average_basis) {
        let headline = row
            .summary
            .rows
            .iter()
            .skip(coach_insights::stat_schema::UNIVERSAL_METRICS.len())
            .take(3)
            .map(|r| format!("{} {}", metric_label(&r.metric), r.total))
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "#{:<3} {:<24} {:<4} games {}/{}  {}",
            row.jersey_number,
            row.name,
            row.position.code(),
            row.games_recorded,
            row.games_selected,
            headline
        );
        if !row.hidden_metrics.is_empty() {
            println!("      hidden: {}", row.hidden_metrics.join(", "));
        }
    }
    Ok(())
}

fn required_player_id(args: &[String]) -> Result<PlayerId> {
    let raw = arg_value(args, "--player").context("--player is required")?;
    let id = raw
        .trim()
        .parse::<PlayerId>()
        .with_context(|| format!("invalid player id {raw:?}"))?;
    if id <= 0 {
        bail!("invalid player id {id}");
    }
    Ok(id)
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_ids(raw: &str) -> Vec<GameId> {
    let mut seen = HashSet::new();
    raw.split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<GameId>().ok())
        .filter(|id| seen.insert(*id))
        .collect()
}
