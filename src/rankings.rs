use std::collections::{BTreeMap, BTreeSet};

use crate::asof::TeamWeekKeyed;

/// Long-format weekly rank of one team on one stat (1 = best).
#[derive(Debug, Clone)]
pub struct StatRankRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub stat: String,
    pub rank: f64,
}

/// All ranks of one team-week, keyed by stat name.
#[derive(Debug, Clone, PartialEq)]
pub struct RankWeek {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub ranks: BTreeMap<String, f64>,
}

impl TeamWeekKeyed for RankWeek {
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

impl RankWeek {
    pub fn rank(&self, stat: &str) -> Option<f64> {
        self.ranks.get(stat).copied()
    }
}

/// Offense stat of one side against the matching defense stat of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchupPair {
    pub name: &'static str,
    pub offense_stat: &'static str,
    pub defense_stat: &'static str,
}

pub const MATCHUP_PAIRS: [MatchupPair; 5] = [
    MatchupPair {
        name: "pass",
        offense_stat: "off_pass_yards",
        defense_stat: "def_pass_yards",
    },
    MatchupPair {
        name: "rush",
        offense_stat: "off_rush_yards",
        defense_stat: "def_rush_yards",
    },
    MatchupPair {
        name: "scoring",
        offense_stat: "off_points",
        defense_stat: "def_points",
    },
    MatchupPair {
        name: "turnover",
        offense_stat: "off_turnovers",
        defense_stat: "def_takeaways",
    },
    MatchupPair {
        name: "pass_rush",
        offense_stat: "off_sacks_allowed",
        defense_stat: "def_sacks",
    },
];

/// Pivots long ranks to one row per team-week. Also returns the sorted set of stat
/// names so every game gets the same rank columns. Names are lowercased and anything
/// outside `[a-z0-9]` becomes `_`, since they end up inside column names.
pub fn pivot_ranks(records: &[StatRankRecord]) -> (Vec<RankWeek>, Vec<String>) {
    let mut stats = BTreeSet::new();
    let mut acc: BTreeMap<(i32, u32, &str), BTreeMap<String, f64>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.rank.is_finite()) {
        let stat: String = r
            .stat
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if stat.is_empty() {
            continue;
        }
        stats.insert(stat.clone());
        acc.entry((r.season, r.week, r.team.as_str()))
            .or_default()
            .insert(stat, r.rank);
    }
    let rows = acc
        .into_iter()
        .map(|((season, week, team), ranks)| RankWeek {
            season,
            week,
            team: team.to_string(),
            ranks,
        })
        .collect();
    (rows, stats.into_iter().collect())
}

/// `(home, away)` matchup values: a side's offense rank minus the opponent's defense rank.
pub fn matchup(
    pair: &MatchupPair,
    home: Option<&RankWeek>,
    away: Option<&RankWeek>,
) -> (Option<f64>, Option<f64>) {
    let side = |off: Option<&RankWeek>, def: Option<&RankWeek>| {
        Some(off?.rank(pair.offense_stat)? - def?.rank(pair.defense_stat)?)
    };
    (side(home, away), side(away, home))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rank(team: &str, stat: &str, rank: f64) -> StatRankRecord {
        StatRankRecord {
            season: 2023,
            week: 5,
            team: team.to_string(),
            stat: stat.to_string(),
            rank,
        }
    }

    #[test]
    fn pivot_and_matchup() {
        let (rows, stats) = pivot_ranks(&[
            rank("KC", "off_pass_yards", 3.0),
            rank("KC", "DEF_PASS_YARDS", 20.0),
            rank("BUF", "off_pass_yards", 8.0),
            rank("BUF", "def_pass_yards", 2.0),
        ]);
        assert_eq!(stats, vec!["def_pass_yards", "off_pass_yards"]);
        assert_eq!(rows.len(), 2);
        let buf = rows.iter().find(|r| r.team == "BUF");
        let kc = rows.iter().find(|r| r.team == "KC");
        let (home, away) = matchup(&MATCHUP_PAIRS[0], kc, buf);
        assert_eq!(home, Some(1.0));
        assert_eq!(away, Some(-12.0));

        let (home, away) = matchup(&MATCHUP_PAIRS[1], kc, buf);
        assert_eq!((home, away), (None, None));
    }
}
