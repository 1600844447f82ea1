use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::model::Game;
use crate::play_weighting::TeamGameRecord;

/// One cell of the season x week x team grid. Bye weeks and dropped team-games keep
/// `net == None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamWeekRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub off_epa: Option<f64>,
    pub def_epa: Option<f64>,
    pub net: Option<f64>,
    pub n_plays_eff: Option<f64>,
    pub games: u32,
}

pub type GridKey = (i32, u32, String);

#[derive(Debug, Default, Clone)]
struct WeekAcc {
    off_w: f64,
    off_we: f64,
    def_w: f64,
    def_we: f64,
    games: u32,
}

pub struct TeamWeekAggregator;

impl TeamWeekAggregator {
    /// Every team seen in a REG/POST game of a season, crossed with every week of that
    /// season in which any REG/POST game was scheduled.
    pub fn grid_from_schedule(games: &[Game]) -> BTreeSet<GridKey> {
        let mut weeks: BTreeMap<i32, BTreeSet<u32>> = BTreeMap::new();
        let mut teams: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();
        for g in games.iter().filter(|g| g.is_rated_phase()) {
            weeks.entry(g.season).or_default().insert(g.week);
            let season_teams = teams.entry(g.season).or_default();
            season_teams.insert(g.home_team.as_str());
            season_teams.insert(g.away_team.as_str());
        }

        let mut grid = BTreeSet::new();
        for (season, season_weeks) in &weeks {
            let Some(season_teams) = teams.get(season) else {
                continue;
            };
            for week in season_weeks {
                for team in season_teams {
                    grid.insert((*season, *week, (*team).to_string()));
                }
            }
        }
        grid
    }

    /// Only the team-weeks that produced an aggregate; bye weeks are absent.
    pub fn grid_from_observed(team_games: &[TeamGameRecord]) -> BTreeSet<GridKey> {
        team_games
            .iter()
            .map(|r| (r.season, r.week, r.team.clone()))
            .collect()
    }

    pub fn build(team_games: &[TeamGameRecord], games: Option<&[Game]>) -> Vec<TeamWeekRecord> {
        let grid = match games {
            Some(games) => Self::grid_from_schedule(games),
            None => {
                warn!(
                    "no schedule supplied; team-week grid falls back to observed team-weeks and \
                     bye weeks are lost, schedule strength will be degraded"
                );
                Self::grid_from_observed(team_games)
            }
        };

        let mut acc: BTreeMap<GridKey, WeekAcc> = BTreeMap::new();
        for r in team_games {
            let cell = acc
                .entry((r.season, r.week, r.team.clone()))
                .or_default();
            cell.off_w += r.off_weight;
            cell.off_we += r.off_weight * r.off_epa;
            cell.def_w += r.def_weight;
            cell.def_we += r.def_weight * r.def_epa;
            cell.games += 1;
        }

        let mut out = Vec::with_capacity(grid.len());
        let mut byes = 0usize;
        for key in grid {
            let record = match acc.get(&key) {
                Some(cell) if cell.off_w > 0.0 && cell.def_w > 0.0 => {
                    let off = cell.off_we / cell.off_w;
                    let def = cell.def_we / cell.def_w;
                    TeamWeekRecord {
                        season: key.0,
                        week: key.1,
                        team: key.2,
                        off_epa: Some(off),
                        def_epa: Some(def),
                        net: Some(off + def),
                        n_plays_eff: Some(cell.off_w + cell.def_w),
                        games: cell.games,
                    }
                }
                _ => {
                    byes += 1;
                    TeamWeekRecord {
                        season: key.0,
                        week: key.1,
                        team: key.2,
                        off_epa: None,
                        def_epa: None,
                        net: None,
                        n_plays_eff: None,
                        games: 0,
                    }
                }
            };
            out.push(record);
        }
        info!(rows = out.len(), empty_cells = byes, "built team-week grid");
        out
    }
}
