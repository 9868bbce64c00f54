use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Metrics tracked for every player regardless of position.
pub const UNIVERSAL_METRICS: &[&str] = &["snaps_played", "penalties", "turnovers", "touchdowns"];

/// Display label of the universal block.
pub const UNIVERSAL_CATEGORY: &str = "General";

pub type StatGroups = &'static [(&'static str, &'static [&'static str])];

const QB_GROUPS: StatGroups = &[
    (
        "Passing",
        &[
            "pass_attempts",
            "pass_completions",
            "passing_yards",
            "passing_tds",
            "interceptions_thrown",
        ],
    ),
    ("Rushing", &["rush_attempts", "rushing_yards", "rushing_tds"]),
];
const RB_GROUPS: StatGroups = &[
    ("Rushing", &["rush_attempts", "rushing_yards", "rushing_tds"]),
    (
        "Receiving",
        &["targets", "receptions", "receiving_yards", "receiving_tds"],
    ),
];
const FB_GROUPS: StatGroups = &[
    ("Rushing", &["rush_attempts", "rushing_yards"]),
    ("Blocking", &["lead_blocks"]),
];
const WR_GROUPS: StatGroups = &[(
    "Receiving",
    &["targets", "receptions", "receiving_yards", "receiving_tds", "drops"],
)];
const TE_GROUPS: StatGroups = &[
    (
        "Receiving",
        &["targets", "receptions", "receiving_yards", "receiving_tds"],
    ),
    ("Blocking", &["run_block_snaps", "pass_block_snaps"]),
];
// Tackles and guards share one block.
const LINE_GROUPS: StatGroups = &[(
    "Blocking",
    &["pass_block_snaps", "run_block_snaps", "sacks_allowed"],
)];
const C_GROUPS: StatGroups = &[
    ("Blocking", &["pass_block_snaps", "run_block_snaps"]),
    ("Snapping", &["bad_snaps"]),
];
const DE_GROUPS: StatGroups = &[(
    "Defense",
    &["tackles", "tackles_for_loss", "sacks", "forced_fumbles"],
)];
const DT_GROUPS: StatGroups = &[("Defense", &["tackles", "tackles_for_loss", "sacks"])];
const NT_GROUPS: StatGroups = &[("Defense", &["tackles", "tackles_for_loss"])];
const LB_GROUPS: StatGroups = &[(
    "Defense",
    &["tackles", "sacks", "interceptions", "passes_defended"],
)];
const CB_GROUPS: StatGroups = &[(
    "Coverage",
    &[
        "targets_allowed",
        "completions_allowed",
        "interceptions",
        "passes_defended",
    ],
)];
const SAFETY_GROUPS: StatGroups = &[("Coverage", &["interceptions", "passes_defended", "tackles"])];
const K_GROUPS: StatGroups = &[(
    "Kicking",
    &["field_goals_made", "field_goals_attempted", "extra_points_made"],
)];
const P_GROUPS: StatGroups = &[("Punting", &["punts", "punt_yards", "punts_inside_20"])];
const KR_GROUPS: StatGroups = &[(
    "Returns",
    &["kick_returns", "kick_return_yards", "kick_return_tds"],
)];
const PR_GROUPS: StatGroups = &[(
    "Returns",
    &["punt_returns", "punt_return_yards", "punt_return_tds"],
)];
const LS_GROUPS: StatGroups = &[("Snapping", &["total_snaps", "bad_snaps"])];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "offense")]
    Offense,
    #[serde(rename = "defense")]
    Defense,
    #[serde(rename = "special", alias = "special_teams")]
    SpecialTeams,
}

impl Unit {
    pub fn code(self) -> &'static str {
        match self {
            Unit::Offense => "offense",
            Unit::Defense => "defense",
            Unit::SpecialTeams => "special",
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "offense" => Some(Unit::Offense),
            "defense" => Some(Unit::Defense),
            "special" | "special_teams" | "special-teams" => Some(Unit::SpecialTeams),
            _ => None,
        }
    }

    pub fn positions(self) -> impl Iterator<Item = Position> {
        Position::ALL.into_iter().filter(move |p| p.unit() == self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Position {
    Quarterback,
    RunningBack,
    Fullback,
    WideReceiver,
    TightEnd,
    LeftTackle,
    LeftGuard,
    Center,
    RightGuard,
    RightTackle,
    DefensiveEnd,
    DefensiveTackle,
    NoseTackle,
    OutsideLinebacker,
    InsideLinebacker,
    MiddleLinebacker,
    Cornerback,
    FreeSafety,
    StrongSafety,
    Kicker,
    Punter,
    KickReturner,
    PuntReturner,
    LongSnapper,
}

impl Position {
    pub const ALL: [Position; 24] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::Fullback,
        Position::WideReceiver,
        Position::TightEnd,
        Position::LeftTackle,
        Position::LeftGuard,
        Position::Center,
        Position::RightGuard,
        Position::RightTackle,
        Position::DefensiveEnd,
        Position::DefensiveTackle,
        Position::NoseTackle,
        Position::OutsideLinebacker,
        Position::InsideLinebacker,
        Position::MiddleLinebacker,
        Position::Cornerback,
        Position::FreeSafety,
        Position::StrongSafety,
        Position::Kicker,
        Position::Punter,
        Position::KickReturner,
        Position::PuntReturner,
        Position::LongSnapper,
    ];

    /// Short roster code (`QB`, `CB`, ...).
    pub fn code(self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::Fullback => "FB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::LeftTackle => "LT",
            Position::LeftGuard => "LG",
            Position::Center => "C",
            Position::RightGuard => "RG",
            Position::RightTackle => "RT",
            Position::DefensiveEnd => "DE",
            Position::DefensiveTackle => "DT",
            Position::NoseTackle => "NT",
            Position::OutsideLinebacker => "OLB",
            Position::InsideLinebacker => "ILB",
            Position::MiddleLinebacker => "MLB",
            Position::Cornerback => "CB",
            Position::FreeSafety => "FS",
            Position::StrongSafety => "SS",
            Position::Kicker => "K",
            Position::Punter => "P",
            Position::KickReturner => "KR",
            Position::PuntReturner => "PR",
            Position::LongSnapper => "LS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Quarterback => "Quarterback",
            Position::RunningBack => "Running Back",
            Position::Fullback => "Fullback",
            Position::WideReceiver => "Wide Receiver",
            Position::TightEnd => "Tight End",
            Position::LeftTackle => "Left Tackle",
            Position::LeftGuard => "Left Guard",
            Position::Center => "Center",
            Position::RightGuard => "Right Guard",
            Position::RightTackle => "Right Tackle",
            Position::DefensiveEnd => "Defensive End",
            Position::DefensiveTackle => "Defensive Tackle",
            Position::NoseTackle => "Nose Tackle",
            Position::OutsideLinebacker => "Outside Linebacker",
            Position::InsideLinebacker => "Inside Linebacker",
            Position::MiddleLinebacker => "Middle Linebacker",
            Position::Cornerback => "Cornerback",
            Position::FreeSafety => "Free Safety",
            Position::StrongSafety => "Strong Safety",
            Position::Kicker => "Kicker",
            Position::Punter => "Punter",
            Position::KickReturner => "Kick Returner",
            Position::PuntReturner => "Punt Returner",
            Position::LongSnapper => "Long Snapper",
        }
    }

    pub fn from_code(raw: &str) -> Option<Self> {
        let code = raw.trim().to_ascii_uppercase();
        Position::ALL.into_iter().find(|p| p.code() == code)
    }

    pub fn unit(self) -> Unit {
        match self {
            Position::Quarterback
            | Position::RunningBack
            | Position::Fullback
            | Position::WideReceiver
            | Position::TightEnd
            | Position::LeftTackle
            | Position::LeftGuard
            | Position::Center
            | Position::RightGuard
            | Position::RightTackle => Unit::Offense,
            Position::DefensiveEnd
            | Position::DefensiveTackle
            | Position::NoseTackle
            | Position::OutsideLinebacker
            | Position::InsideLinebacker
            | Position::MiddleLinebacker
            | Position::Cornerback
            | Position::FreeSafety
            | Position::StrongSafety => Unit::Defense,
            Position::Kicker
            | Position::Punter
            | Position::KickReturner
            | Position::PuntReturner
            | Position::LongSnapper => Unit::SpecialTeams,
        }
    }

    fn stat_groups(self) -> StatGroups {
        match self {
            Position::Quarterback => QB_GROUPS,
            Position::RunningBack => RB_GROUPS,
            Position::Fullback => FB_GROUPS,
            Position::WideReceiver => WR_GROUPS,
            Position::TightEnd => TE_GROUPS,
            Position::LeftTackle
            | Position::LeftGuard
            | Position::RightGuard
            | Position::RightTackle => LINE_GROUPS,
            Position::Center => C_GROUPS,
            Position::DefensiveEnd => DE_GROUPS,
            Position::DefensiveTackle => DT_GROUPS,
            Position::NoseTackle => NT_GROUPS,
            Position::OutsideLinebacker
            | Position::InsideLinebacker
            | Position::MiddleLinebacker => LB_GROUPS,
            Position::Cornerback => CB_GROUPS,
            Position::FreeSafety | Position::StrongSafety => SAFETY_GROUPS,
            Position::Kicker => K_GROUPS,
            Position::Punter => P_GROUPS,
            Position::KickReturner => KR_GROUPS,
            Position::PuntReturner => PR_GROUPS,
            Position::LongSnapper => LS_GROUPS,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<Position> for &'static str {
    fn from(value: Position) -> Self {
        value.code()
    }
}

impl TryFrom<String> for Position {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Position::from_code(&value).ok_or_else(|| format!("unknown position code {value:?}"))
    }
}

/// The metrics that are meaningful for one position: the universal block
/// followed by the position's categories, both in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSchema {
    pub position: Option<Position>,
    pub universal: &'static [&'static str],
    pub groups: StatGroups,
}

impl StatSchema {
    pub fn universal_only() -> Self {
        Self {
            position: None,
            universal: UNIVERSAL_METRICS,
            groups: &[],
        }
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.universal
            .iter()
            .copied()
            .chain(self.groups.iter().flat_map(|(_, metrics)| metrics.iter().copied()))
    }

    /// Metrics paired with their display category.
    pub fn categorized(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.universal
            .iter()
            .map(|m| (UNIVERSAL_CATEGORY, *m))
            .chain(
                self.groups
                    .iter()
                    .flat_map(|(category, metrics)| metrics.iter().map(move |m| (*category, *m))),
            )
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.metric_names().any(|m| m == metric)
    }

    pub fn len(&self) -> usize {
        self.universal.len() + self.groups.iter().map(|(_, m)| m.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn schema_for(position: Position) -> StatSchema {
    StatSchema {
        position: Some(position),
        universal: UNIVERSAL_METRICS,
        groups: position.stat_groups(),
    }
}

/// Resolve a raw roster code. Unknown codes degrade to the universal-only
/// schema so views keep rendering for positions added elsewhere first.
pub fn schema_for_code(raw: &str) -> StatSchema {
    match Position::from_code(raw) {
        Some(position) => schema_for(position),
        None => {
            warn!(code = raw, "unknown position code, using universal metrics only");
            StatSchema::universal_only()
        }
    }
}

static ALL_METRICS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for metric in UNIVERSAL_METRICS.iter().copied().chain(
        Position::ALL
            .iter()
            .flat_map(|p| p.stat_groups().iter().flat_map(|(_, m)| m.iter().copied())),
    ) {
        if seen.insert(metric) {
            out.push(metric);
        }
    }
    out
});

/// Every metric in the static catalog, first-seen order.
pub fn all_metric_names() -> &'static [&'static str] {
    &ALL_METRICS
}

pub fn is_known_metric(name: &str) -> bool {
    ALL_METRICS.iter().any(|m| *m == name)
}

/// `passing_yards` -> `Passing Yards`.
pub fn metric_label(metric: &str) -> String {
    metric
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_codes_round_trip() {
        for p in Position::ALL {
            assert_eq!(Position::from_code(p.code()), Some(p));
        }
        assert_eq!(Position::from_code(" qb "), Some(Position::Quarterback));
        assert_eq!(Position::from_code("OL"), None);
    }

    #[test]
    fn units_partition_positions() {
        let offense = Unit::Offense.positions().count();
        let defense = Unit::Defense.positions().count();
        let special = Unit::SpecialTeams.positions().count();
        assert_eq!((offense, defense, special), (10, 9, 5));
        assert_eq!(Unit::from_code("special_teams"), Some(Unit::SpecialTeams));
    }

    #[test]
    fn qb_schema_is_ordered() {
        let names: Vec<_> = schema_for(Position::Quarterback).metric_names().collect();
        assert_eq!(&names[..5], &["snaps_played", "penalties", "turnovers", "touchdowns", "pass_attempts"]);
        assert_eq!(names.last(), Some(&"rushing_tds"));
    }

    #[test]
    fn unknown_code_degrades_to_universal() {
        let schema = schema_for_code("XX");
        assert!(schema.groups.is_empty());
        assert_eq!(schema.len(), UNIVERSAL_METRICS.len());
    }

    #[test]
    fn labels_title_case() {
        assert_eq!(metric_label("passing_yards"), "Passing Yards");
        assert_eq!(metric_label("punts_inside_20"), "Punts Inside 20");
    }

    #[test]
    fn catalog_has_no_duplicates() {
        let all = all_metric_names();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert!(is_known_metric("lead_blocks"));
        assert!(!is_known_metric("player_id"));
    }
}
