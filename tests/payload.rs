use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use coach_insights::history::AverageBasis;
use coach_insights::history_view::HistoryView;
use coach_insights::model::NoteEntry;
use coach_insights::payload::{
    PlayerUpdate, build_insights_update, parse_player_history_json, parse_player_json,
};
use coach_insights::stat_record::StatMap;
use coach_insights::stat_schema::{Position, Unit, schema_for};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_player_history_fixture() {
    let history = parse_player_history_json(&read_fixture("player_history_qb.json"))
        .expect("fixture should parse");
    assert_eq!(history.games.len(), 3);
    // The row without a game id is dropped.
    assert_eq!(history.stats_by_game.len(), 2);

    let g1 = history.stats_for(1).expect("game 1 stats");
    assert_eq!(g1.get("pass_attempts"), Some(&20));
    assert!(!g1.contains_key("sacks"));
    assert!(!g1.contains_key("player_id"));
    assert!(!g1.contains_key("created_at"));

    let g2 = history.stats_for(2).expect("game 2 stats");
    assert_eq!(g2.get("touchdowns"), Some(&2));

    assert_eq!(history.notes.len(), 2);
    assert_eq!(history.notes[0].game_id, 2);
    assert_eq!(history.notes[0].notes[1].category, "General");
}

#[test]
fn parses_player_from_fixture() {
    let raw = read_fixture("player_history_qb.json");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let player = parse_player_json(&value["player"].to_string()).expect("player should parse");
    assert_eq!(player.position, Position::Quarterback);
    assert_eq!(player.unit, Unit::Offense);
    assert_eq!(player.name, "Sam Rivers");
    assert!(player.unit_matches_position());
}

#[test]
fn player_history_null_is_empty() {
    let history = parse_player_history_json("null").expect("null should parse");
    assert!(history.games.is_empty());
    assert!(history.stats_by_game.is_empty());
    assert!(history.notes.is_empty());
}

#[test]
fn camel_case_stats_key_is_accepted() {
    let raw = r#"{"games": [], "statsByGame": [{"gameId": 5, "stats": {"punts": 3}}], "notes": []}"#;
    let history = parse_player_history_json(raw).expect("camelCase should parse");
    assert_eq!(history.stats_for(5).and_then(|s| s.get("punts").copied()), Some(3));
}

#[test]
fn history_view_over_fixture() {
    let history = parse_player_history_json(&read_fixture("player_history_qb.json")).unwrap();
    let mut view = HistoryView::open(
        schema_for(Position::Quarterback),
        history,
        AverageBasis::SelectedGames,
    );
    assert_eq!(view.selected().len(), 3);

    let summary = view.summary();
    assert_eq!(summary.total("pass_attempts"), 50);
    assert_eq!(summary.games_counted, 3);
    assert_eq!(summary.average("pass_attempts"), 16.67);

    let timeline = view.timeline();
    assert_eq!(timeline.len(), 3);
    assert_eq!(timeline[0].text, "Footwork drifted under pressure");
    assert_eq!(timeline[1].text, "Quick release on third down");
    assert_eq!(timeline[1].game_id, 1);
    assert_eq!(timeline[2].game_id, 2);

    view.toggle_game(3);
    view.toggle_game(999);
    assert_eq!(view.selected(), &HashSet::from([1, 2]));
    let summary = view.summary();
    assert_eq!(summary.average("pass_attempts"), 25.0);
    assert_eq!(summary.average("snaps_played"), 58.0);

    let breakdown = view.breakdown();
    assert_eq!(breakdown.iter().map(|b| b.game_id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(breakdown.iter().all(|b| b.has_record));

    view.clear_selection();
    assert_eq!(view.summary().total("pass_attempts"), 0);
    assert!(view.timeline().is_empty());
}

#[test]
fn insights_update_drops_blank_notes_and_fills_schema() {
    let schema = schema_for(Position::Kicker);
    let stats = StatMap::from([
        ("field_goals_made".to_string(), 2),
        ("rushing_yards".to_string(), 12),
    ]);
    let notes = vec![
        NoteEntry {
            id: Some(1),
            category: "General".into(),
            text: "good leg".into(),
            time: None,
        },
        NoteEntry {
            id: Some(2),
            category: "General".into(),
            text: "  ".into(),
            time: Some(String::new()),
        },
    ];
    let update = build_insights_update(&schema, &stats, &notes);
    assert_eq!(update.notes.len(), 1);
    assert_eq!(update.stats.len(), schema.len() + 1);
    assert_eq!(update.stats["rushing_yards"], 12);

    let body = serde_json::to_value(&update).unwrap();
    assert_eq!(body["notes"][0]["note"], "good leg");
}

#[test]
fn player_update_body_uses_wire_codes() {
    let body = serde_json::to_value(PlayerUpdate {
        unit: Unit::SpecialTeams,
        position: Position::LongSnapper,
    })
    .unwrap();
    assert_eq!(body["unit"], "special");
    assert_eq!(body["position"], "LS");
}
