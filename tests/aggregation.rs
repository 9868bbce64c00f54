use std::collections::HashSet;

use proptest::prelude::*;

use coach_insights::history::{
    AverageBasis, GameStats, aggregate, aggregate_with_basis, per_game_average,
};
use coach_insights::model::GameId;
use coach_insights::stat_record::StatMap;
use coach_insights::stat_schema::{Position, schema_for};

fn game(id: GameId, stats: &[(&str, u32)]) -> GameStats {
    GameStats {
        game_id: id,
        stats: stats.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    }
}

fn qb_games() -> Vec<GameStats> {
    vec![
        game(1, &[("pass_attempts", 20), ("passing_yards", 180)]),
        game(2, &[("pass_attempts", 30), ("passing_yards", 300)]),
    ]
}

#[test]
fn two_game_quarterback_summary() {
    let summary = aggregate(&schema_for(Position::Quarterback), &qb_games(), &HashSet::from([1, 2]));
    assert_eq!(summary.total("pass_attempts"), 50);
    assert_eq!(summary.total("passing_yards"), 480);
    assert_eq!(summary.average("pass_attempts"), 25.0);
    assert_eq!(summary.average("passing_yards"), 240.0);
    assert_eq!(summary.total("rush_attempts"), 0);
    assert!(summary.row("rush_attempts").is_some());
    assert_eq!(summary.games_counted, 2);
}

#[test]
fn single_game_selection() {
    let summary = aggregate(&schema_for(Position::Quarterback), &qb_games(), &HashSet::from([1]));
    assert_eq!(summary.total("pass_attempts"), 20);
    assert_eq!(summary.average("pass_attempts"), 20.0);
}

#[test]
fn empty_selection_is_all_zero() {
    let schema = schema_for(Position::Quarterback);
    let summary = aggregate(&schema, &qb_games(), &HashSet::new());
    assert_eq!(summary.rows.len(), schema.len());
    assert!(summary.rows.iter().all(|r| r.total == 0 && r.average == 0.0));
    assert_eq!(summary.games_counted, 0);
}

#[test]
fn rows_follow_schema_order_and_skip_stale_keys() {
    let schema = schema_for(Position::Cornerback);
    let games = vec![game(1, &[("pass_attempts", 20), ("interceptions", 1)])];
    let summary = aggregate(&schema, &games, &HashSet::from([1]));
    let order: Vec<&str> = summary.rows.iter().map(|r| r.metric.as_str()).collect();
    assert_eq!(order, schema.metric_names().collect::<Vec<_>>());
    assert!(summary.row("pass_attempts").is_none());
    assert_eq!(summary.total("interceptions"), 1);
}

#[test]
fn games_without_records_still_divide_by_default() {
    let schema = schema_for(Position::Quarterback);
    let selected = HashSet::from([1, 2, 3]);
    let summary = aggregate(&schema, &qb_games(), &selected);
    assert_eq!(summary.average("pass_attempts"), 16.67);

    let recorded = aggregate_with_basis(&schema, &qb_games(), &selected, AverageBasis::RecordedGames);
    assert_eq!(recorded.games_counted, 2);
    assert_eq!(recorded.average("pass_attempts"), 25.0);
}

#[test]
fn totals_and_averages_maps() {
    let summary = aggregate(&schema_for(Position::Quarterback), &qb_games(), &HashSet::from([1, 2]));
    let totals = summary.totals();
    let averages = summary.averages();
    assert_eq!(totals["passing_yards"], 480);
    assert_eq!(averages["passing_yards"], 240.0);
    assert_eq!(totals.len(), averages.len());
}

fn game_list() -> impl Strategy<Value = Vec<GameStats>> {
    prop::collection::vec(
        prop::collection::hash_map(
            prop::sample::select(vec!["pass_attempts", "passing_yards", "snaps_played", "sacks"])
                .prop_map(str::to_string),
            0u32..1_000,
            0..4,
        ),
        0..8,
    )
    .prop_map(|maps: Vec<StatMap>| {
        maps.into_iter()
            .enumerate()
            .map(|(i, stats)| GameStats {
                game_id: i as GameId + 1,
                stats,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn totals_add_over_disjoint_selections(games in game_list(), mask in prop::collection::vec(0u8..3, 8)) {
        let schema = schema_for(Position::Quarterback);
        let mut s1 = HashSet::new();
        let mut s2 = HashSet::new();
        for (i, bucket) in mask.iter().enumerate() {
            let id = i as GameId + 1;
            match bucket {
                0 => { s1.insert(id); }
                1 => { s2.insert(id); }
                _ => {}
            }
        }
        let union: HashSet<GameId> = s1.union(&s2).copied().collect();
        let a = aggregate(&schema, &games, &s1);
        let b = aggregate(&schema, &games, &s2);
        let both = aggregate(&schema, &games, &union);
        for metric in schema.metric_names() {
            prop_assert_eq!(both.total(metric), a.total(metric) + b.total(metric));
        }
    }

    #[test]
    fn averages_match_totals_over_selection(games in game_list(), picks in prop::collection::hash_set(1i64..10, 0..6)) {
        let schema = schema_for(Position::Quarterback);
        let summary = aggregate(&schema, &games, &picks);
        for metric in schema.metric_names() {
            let total = summary.total(metric);
            let average = summary.average(metric);
            if picks.is_empty() {
                prop_assert_eq!(average, 0.0);
            } else {
                let exact = total as f64 / picks.len() as f64;
                prop_assert!((average - exact).abs() <= 0.005 + 1e-9);
                prop_assert_eq!(average, per_game_average(total, picks.len()));
            }
        }
    }
}
