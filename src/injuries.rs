use std::collections::BTreeMap;

use crate::asof::TeamWeekKeyed;
use crate::config::{InjuryMode, InjuryWeights};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionGroup {
    Ol,
    Wr,
    Te,
    Rb,
    Dl,
    Lb,
    Db,
}

pub const INJURY_GROUPS: [PositionGroup; 7] = [
    PositionGroup::Ol,
    PositionGroup::Wr,
    PositionGroup::Te,
    PositionGroup::Rb,
    PositionGroup::Dl,
    PositionGroup::Lb,
    PositionGroup::Db,
];

impl PositionGroup {
    pub fn from_position(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OL" | "T" | "OT" | "LT" | "RT" | "G" | "OG" | "LG" | "RG" | "C" => {
                Some(PositionGroup::Ol)
            }
            "WR" => Some(PositionGroup::Wr),
            "TE" => Some(PositionGroup::Te),
            "RB" | "HB" | "FB" => Some(PositionGroup::Rb),
            "DL" | "DE" | "DT" | "NT" | "EDGE" => Some(PositionGroup::Dl),
            "LB" | "ILB" | "OLB" | "MLB" => Some(PositionGroup::Lb),
            "DB" | "CB" | "S" | "SS" | "FS" | "SAF" => Some(PositionGroup::Db),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            PositionGroup::Ol => "ol",
            PositionGroup::Wr => "wr",
            PositionGroup::Te => "te",
            PositionGroup::Rb => "rb",
            PositionGroup::Dl => "dl",
            PositionGroup::Lb => "lb",
            PositionGroup::Db => "db",
        }
    }

    fn slot(&self) -> usize {
        match self {
            PositionGroup::Ol => 0,
            PositionGroup::Wr => 1,
            PositionGroup::Te => 2,
            PositionGroup::Rb => 3,
            PositionGroup::Dl => 4,
            PositionGroup::Lb => 5,
            PositionGroup::Db => 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
}

impl InjuryStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "out" | "ir" | "injured reserve" | "pup" => Some(InjuryStatus::Out),
            "doubtful" => Some(InjuryStatus::Doubtful),
            "questionable" => Some(InjuryStatus::Questionable),
            _ => None,
        }
    }

    fn weight(&self, weights: &InjuryWeights) -> f64 {
        match self {
            InjuryStatus::Out => weights.out,
            InjuryStatus::Doubtful => weights.doubtful,
            InjuryStatus::Questionable => weights.questionable,
        }
    }
}

/// One row of a weekly injury report, either per player or pre-aggregated per group.
#[derive(Debug, Clone)]
pub struct InjuryRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    /// A roster position or a group key such as `OL`.
    pub position: String,
    pub status: Option<String>,
    /// Players the row stands for; per-player reports leave it empty.
    pub count: Option<f64>,
}

/// Injury burden of one team-week, per coarse position group.
#[derive(Debug, Clone, PartialEq)]
pub struct InjuryIndex {
    pub season: i32,
    pub week: u32,
    pub team: String,
    groups: [f64; 7],
}

impl InjuryIndex {
    pub fn group(&self, group: PositionGroup) -> f64 {
        self.groups[group.slot()]
    }

    pub fn total(&self) -> f64 {
        self.groups.iter().sum()
    }
}

impl TeamWeekKeyed for InjuryIndex {
    fn season(&self) -> i32 {
        self.season
    }
    fn week(&self) -> u32 {
        self.week
    }
    fn team(&self) -> &str {
        &self.team
    }
}

pub fn build_injury_index(
    records: &[InjuryRecord],
    mode: InjuryMode,
    weights: &InjuryWeights,
) -> Vec<InjuryIndex> {
    let mut acc: BTreeMap<(i32, u32, &str), [f64; 7]> = BTreeMap::new();
    for r in records {
        let Some(group) = PositionGroup::from_position(&r.position) else {
            continue;
        };
        let status = match r.status.as_deref() {
            Some(raw) => match InjuryStatus::parse(raw) {
                Some(status) => Some(status),
                None => continue,
            },
            None => None,
        };
        let players = match (status, r.count) {
            (_, Some(n)) if n.is_finite() && n > 0.0 => n,
            (Some(_), None) => 1.0,
            _ => continue,
        };
        // Count-only rows have nothing to weight by and enter at face value.
        let contribution = match (mode, status) {
            (InjuryMode::StatusWeighted, Some(status)) => status.weight(weights) * players,
            _ => players,
        };
        acc.entry((r.season, r.week, r.team.as_str())).or_insert([0.0; 7])[group.slot()] +=
            contribution;
    }
    acc.into_iter()
        .map(|((season, week, team), groups)| InjuryIndex {
            season,
            week,
            team: team.to_string(),
            groups,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(position: &str, status: &str) -> InjuryRecord {
        InjuryRecord {
            season: 2023,
            week: 4,
            team: "DET".to_string(),
            position: position.to_string(),
            status: Some(status.to_string()),
            count: None,
        }
    }

    #[test]
    fn status_weighted_and_count_modes() {
        let records = vec![
            rec("T", "Out"),
            rec("G", "Questionable"),
            rec("CB", "Doubtful"),
            rec("QB", "Out"),
            rec("WR", "Probable"),
        ];
        let weighted =
            build_injury_index(&records, InjuryMode::StatusWeighted, &InjuryWeights::default());
        assert_eq!(weighted.len(), 1);
        let idx = &weighted[0];
        assert!((idx.group(PositionGroup::Ol) - 1.3).abs() < 1e-12);
        assert!((idx.group(PositionGroup::Db) - 0.7).abs() < 1e-12);
        assert_eq!(idx.group(PositionGroup::Wr), 0.0);

        let counted = build_injury_index(&records, InjuryMode::Count, &InjuryWeights::default());
        assert_eq!(counted[0].group(PositionGroup::Ol), 2.0);
        assert_eq!(counted[0].total(), 3.0);
    }

    #[test]
    fn group_counts_add_up() {
        let group = |position: &str, status: Option<&str>, count: f64| InjuryRecord {
            season: 2023,
            week: 4,
            team: "DET".to_string(),
            position: position.to_string(),
            status: status.map(str::to_string),
            count: Some(count),
        };
        let records = vec![
            group("ol", None, 2.0),
            group("DB", None, 1.0),
            group("DB", Some("Doubtful"), 2.0),
            group("WR", None, 0.0),
        ];
        let counted = build_injury_index(&records, InjuryMode::Count, &InjuryWeights::default());
        assert_eq!(counted[0].group(PositionGroup::Ol), 2.0);
        assert_eq!(counted[0].group(PositionGroup::Db), 3.0);
        assert_eq!(counted[0].group(PositionGroup::Wr), 0.0);

        let weighted =
            build_injury_index(&records, InjuryMode::StatusWeighted, &InjuryWeights::default());
        assert_eq!(weighted[0].group(PositionGroup::Ol), 2.0);
        assert!((weighted[0].group(PositionGroup::Db) - 2.4).abs() < 1e-12);
    }
}
