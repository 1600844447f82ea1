use std::collections::BTreeMap;

use crate::asof::TeamWeekKeyed;
use crate::model::{Game, SeasonType};

macro_rules! team_week_keyed {
    ($ty:ty) => {
        impl TeamWeekKeyed for $ty {
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
    };
}

fn per_game(total: f64, games: u32) -> Option<f64> {
    (games > 0).then(|| total / f64::from(games))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRecordToDate {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub games: u32,
    pub wins: u32,
    pub ties: u32,
    pub points_for: f64,
    pub points_against: f64,
}

team_week_keyed!(TeamRecordToDate);

impl TeamRecordToDate {
    /// Ties count as half a win.
    pub fn win_pct(&self) -> Option<f64> {
        per_game(f64::from(self.wins) + 0.5 * f64::from(self.ties), self.games)
    }

    pub fn points_for_pg(&self) -> Option<f64> {
        per_game(self.points_for, self.games)
    }

    pub fn points_against_pg(&self) -> Option<f64> {
        per_game(self.points_against, self.games)
    }
}

/// Win/loss and scoring records from completed regular-season games.
pub fn team_records_to_date(games: &[Game]) -> Vec<TeamRecordToDate> {
    let mut per_team: BTreeMap<(i32, &str), Vec<(u32, i32, i32)>> = BTreeMap::new();
    for g in games.iter().filter(|g| g.season_type == SeasonType::Reg) {
        let (Some(hs), Some(aws)) = (g.home_score, g.away_score) else {
            continue;
        };
        per_team
            .entry((g.season, g.home_team.as_str()))
            .or_default()
            .push((g.week, hs, aws));
        per_team
            .entry((g.season, g.away_team.as_str()))
            .or_default()
            .push((g.week, aws, hs));
    }

    let mut out = Vec::new();
    for ((season, team), mut results) in per_team {
        results.sort_by_key(|r| r.0);
        let mut acc = TeamRecordToDate {
            season,
            week: 0,
            team: team.to_string(),
            games: 0,
            wins: 0,
            ties: 0,
            points_for: 0.0,
            points_against: 0.0,
        };
        for (week, scored, allowed) in results {
            acc.week = week;
            acc.games += 1;
            match scored.cmp(&allowed) {
                std::cmp::Ordering::Greater => acc.wins += 1,
                std::cmp::Ordering::Equal => acc.ties += 1,
                std::cmp::Ordering::Less => {}
            }
            acc.points_for += f64::from(scored);
            acc.points_against += f64::from(allowed);
            out.push(acc.clone());
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct SnapCountRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub offense_snaps: f64,
    pub defense_snaps: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapsToDate {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub games: u32,
    pub offense_snaps: f64,
    pub defense_snaps: f64,
}

team_week_keyed!(SnapsToDate);

impl SnapsToDate {
    pub fn offense_snaps_pg(&self) -> Option<f64> {
        per_game(self.offense_snaps, self.games)
    }

    pub fn defense_snaps_pg(&self) -> Option<f64> {
        per_game(self.defense_snaps, self.games)
    }

    pub fn offense_share(&self) -> Option<f64> {
        let total = self.offense_snaps + self.defense_snaps;
        (total > 0.0).then(|| self.offense_snaps / total)
    }
}

pub fn snaps_to_date(records: &[SnapCountRecord]) -> Vec<SnapsToDate> {
    let mut per_team: BTreeMap<(i32, &str), BTreeMap<u32, (f64, f64)>> = BTreeMap::new();
    for r in records {
        let week = per_team
            .entry((r.season, r.team.as_str()))
            .or_default()
            .entry(r.week)
            .or_insert((0.0, 0.0));
        week.0 += r.offense_snaps;
        week.1 += r.defense_snaps;
    }

    let mut out = Vec::new();
    for ((season, team), weeks) in per_team {
        let mut acc = SnapsToDate {
            season,
            week: 0,
            team: team.to_string(),
            games: 0,
            offense_snaps: 0.0,
            defense_snaps: 0.0,
        };
        for (week, (off, def)) in weeks {
            acc.week = week;
            acc.games += 1;
            acc.offense_snaps += off;
            acc.defense_snaps += def;
            out.push(acc.clone());
        }
    }
    out
}

/// Weekly counting stats for one side of the ball. For the defensive table the same
/// fields describe what the defense allowed (turnovers = takeaways, sacks = sacks made).
#[derive(Debug, Clone, Default)]
pub struct TeamWeekStats {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub plays: f64,
    pub pass_yards: f64,
    pub rush_yards: f64,
    pub touchdowns: f64,
    pub turnovers: f64,
    pub sacks: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SideRatesToDate {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub games: u32,
    pub plays: f64,
    pub pass_yards: f64,
    pub rush_yards: f64,
    pub touchdowns: f64,
    pub turnovers: f64,
    pub sacks: f64,
}

team_week_keyed!(SideRatesToDate);

impl SideRatesToDate {
    pub fn yards_per_play(&self) -> Option<f64> {
        (self.plays > 0.0).then(|| (self.pass_yards + self.rush_yards) / self.plays)
    }

    pub fn pass_yards_pg(&self) -> Option<f64> {
        per_game(self.pass_yards, self.games)
    }

    pub fn rush_yards_pg(&self) -> Option<f64> {
        per_game(self.rush_yards, self.games)
    }

    pub fn touchdowns_pg(&self) -> Option<f64> {
        per_game(self.touchdowns, self.games)
    }

    pub fn turnovers_pg(&self) -> Option<f64> {
        per_game(self.turnovers, self.games)
    }

    pub fn sacks_pg(&self) -> Option<f64> {
        per_game(self.sacks, self.games)
    }
}

pub fn side_rates_to_date(stats: &[TeamWeekStats]) -> Vec<SideRatesToDate> {
    let mut per_team: BTreeMap<(i32, &str), BTreeMap<u32, TeamWeekStats>> = BTreeMap::new();
    for s in stats {
        let week = per_team
            .entry((s.season, s.team.as_str()))
            .or_default()
            .entry(s.week)
            .or_default();
        week.plays += s.plays;
        week.pass_yards += s.pass_yards;
        week.rush_yards += s.rush_yards;
        week.touchdowns += s.touchdowns;
        week.turnovers += s.turnovers;
        week.sacks += s.sacks;
    }

    let mut out = Vec::new();
    for ((season, team), weeks) in per_team {
        let mut acc = SideRatesToDate {
            season,
            week: 0,
            team: team.to_string(),
            games: 0,
            plays: 0.0,
            pass_yards: 0.0,
            rush_yards: 0.0,
            touchdowns: 0.0,
            turnovers: 0.0,
            sacks: 0.0,
        };
        for (week, s) in weeks {
            acc.week = week;
            acc.games += 1;
            acc.plays += s.plays;
            acc.pass_yards += s.pass_yards;
            acc.rush_yards += s.rush_yards;
            acc.touchdowns += s.touchdowns;
            acc.turnovers += s.turnovers;
            acc.sacks += s.sacks;
            out.push(acc.clone());
        }
    }
    out
}

pub const STABILITY_GROUPS: [&str; 8] = ["qb", "ol", "rb", "wr", "te", "dl", "lb", "db"];

#[derive(Debug, Clone)]
pub struct StabilityRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub group: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StabilityWeek {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub scores: BTreeMap<String, f64>,
}

team_week_keyed!(StabilityWeek);

impl StabilityWeek {
    pub fn score(&self, group: &str) -> Option<f64> {
        self.scores.get(group).copied()
    }
}

pub fn stability_weeks(records: &[StabilityRecord]) -> Vec<StabilityWeek> {
    let mut acc: BTreeMap<(i32, u32, &str), BTreeMap<String, f64>> = BTreeMap::new();
    for r in records.iter().filter(|r| r.score.is_finite()) {
        acc.entry((r.season, r.week, r.team.as_str()))
            .or_default()
            .insert(r.group.trim().to_ascii_lowercase(), r.score.clamp(0.0, 1.0));
    }
    acc.into_iter()
        .map(|((season, week, team), scores)| StabilityWeek {
            season,
            week,
            team: team.to_string(),
            scores,
        })
        .collect()
}
