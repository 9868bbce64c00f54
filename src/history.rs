use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{GameId, GameRecord};
use crate::stat_record::{StatMap, zero_default};
use crate::stat_schema::StatSchema;

/// One persisted StatRecord keyed by its game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    pub game_id: GameId,
    pub stats: StatMap,
}

/// Divisor used for per-game averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AverageBasis {
    /// Every selected game counts, whether or not a record exists.
    #[default]
    SelectedGames,
    /// Only selected games that have a StatRecord count.
    RecordedGames,
}

impl FromStr for AverageBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "selected" | "selected_games" => Ok(AverageBasis::SelectedGames),
            "recorded" | "recorded_games" => Ok(AverageBasis::RecordedGames),
            other => Err(format!("unknown average basis {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: String,
    pub total: u64,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistorySummary {
    /// Universal metrics first, then position groups, catalog order.
    pub rows: Vec<MetricSummary>,
    pub games_counted: usize,
}

impl HistorySummary {
    pub fn total(&self, metric: &str) -> u64 {
        self.row(metric).map(|r| r.total).unwrap_or(0)
    }

    pub fn average(&self, metric: &str) -> f64 {
        self.row(metric).map(|r| r.average).unwrap_or(0.0)
    }

    pub fn row(&self, metric: &str) -> Option<&MetricSummary> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    pub fn totals(&self) -> HashMap<String, u64> {
        self.rows.iter().map(|r| (r.metric.clone(), r.total)).collect()
    }

    pub fn averages(&self) -> HashMap<String, f64> {
        self.rows
            .iter()
            .map(|r| (r.metric.clone(), r.average))
            .collect()
    }
}

pub fn aggregate(
    schema: &StatSchema,
    stats_by_game: &[GameStats],
    selected: &HashSet<GameId>,
) -> HistorySummary {
    aggregate_with_basis(schema, stats_by_game, selected, AverageBasis::default())
}

pub fn aggregate_with_basis(
    schema: &StatSchema,
    stats_by_game: &[GameStats],
    selected: &HashSet<GameId>,
    basis: AverageBasis,
) -> HistorySummary {
    let filtered: Vec<&GameStats> = stats_by_game
        .iter()
        .filter(|g| selected.contains(&g.game_id))
        .collect();

    let n = match basis {
        AverageBasis::SelectedGames => selected.len(),
        AverageBasis::RecordedGames => filtered
            .iter()
            .map(|g| g.game_id)
            .collect::<HashSet<_>>()
            .len(),
    };

    let rows = schema
        .metric_names()
        .map(|metric| {
            let total: u64 = filtered
                .iter()
                .map(|g| u64::from(zero_default(g.stats.get(metric))))
                .sum();
            MetricSummary {
                metric: metric.to_string(),
                total,
                average: per_game_average(total, n),
            }
        })
        .collect();

    debug!(
        selected = selected.len(),
        records = filtered.len(),
        divisor = n,
        "aggregated player history"
    );

    HistorySummary {
        rows,
        games_counted: n,
    }
}

/// Mean rounded half-up to two places; zero games yields zero.
pub fn per_game_average(total: u64, games: usize) -> f64 {
    if games == 0 {
        return 0.0;
    }
    let n = games as u128;
    let hundredths = (u128::from(total) * 200 + n) / (2 * n);
    hundredths as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameBreakdown {
    pub game_id: GameId,
    pub game_date: NaiveDate,
    pub opponent: String,
    pub has_record: bool,
    pub values: Vec<(&'static str, u32)>,
}

/// Per-game schema values for the selected games, oldest first.
pub fn per_game_breakdown(
    schema: &StatSchema,
    stats_by_game: &[GameStats],
    selected: &HashSet<GameId>,
    games: &[GameRecord],
) -> Vec<GameBreakdown> {
    let by_game: HashMap<GameId, &StatMap> =
        stats_by_game.iter().map(|g| (g.game_id, &g.stats)).collect();

    let mut chosen: Vec<&GameRecord> = games.iter().filter(|g| selected.contains(&g.id)).collect();
    chosen.sort_by_key(|g| g.game_date);

    chosen
        .into_iter()
        .map(|game| {
            let record = by_game.get(&game.id).copied();
            GameBreakdown {
                game_id: game.id,
                game_date: game.game_date,
                opponent: game.opponent.clone(),
                has_record: record.is_some(),
                values: schema
                    .metric_names()
                    .map(|m| (m, zero_default(record.and_then(|r| r.get(m)))))
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rounds_half_up() {
        assert_eq!(per_game_average(10, 4), 2.5);
        assert_eq!(per_game_average(1, 3), 0.33);
        assert_eq!(per_game_average(2, 3), 0.67);
        assert_eq!(per_game_average(1, 8), 0.13);
        assert_eq!(per_game_average(5, 0), 0.0);
    }

    #[test]
    fn basis_parses() {
        assert_eq!("recorded".parse::<AverageBasis>(), Ok(AverageBasis::RecordedGames));
        assert_eq!(" Selected ".parse::<AverageBasis>(), Ok(AverageBasis::SelectedGames));
        assert!("mean".parse::<AverageBasis>().is_err());
    }
}
