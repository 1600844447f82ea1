use std::collections::{BTreeMap, HashMap};

use crate::play_weighting::TeamGameRecord;
use crate::smoothing::SmoothedTeamWeek;

/// Neutral prior used for a team's first game and for any opponent rating that is
/// still unknown one week before kickoff.
pub const NEUTRAL_SOS: f64 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedTeamWeek {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub net_smooth: Option<f64>,
    pub off_smooth: Option<f64>,
    pub def_smooth: Option<f64>,
    pub cum_plays_eff: f64,
    pub sos: f64,
    pub adj_net: Option<f64>,
    pub adj_off: Option<f64>,
    pub adj_def: Option<f64>,
}

pub struct ScheduleAdjuster {
    beta: f64,
}

impl ScheduleAdjuster {
    pub fn new(beta: f64) -> Self {
        Self { beta }
    }

    /// Schedule strength at every week in which a team actually played: the running mean
    /// of each opponent's smoothed net rating as of the week before that game. The first
    /// game of a team's season counts as a zero observation.
    pub fn sos_at_played_weeks(
        team_games: &[TeamGameRecord],
        smoothed: &[SmoothedTeamWeek],
    ) -> HashMap<(i32, String, u32), f64> {
        let rating_at: HashMap<(i32, &str, u32), Option<f64>> = smoothed
            .iter()
            .map(|r| ((r.season, r.team.as_str(), r.week), r.net_smooth))
            .collect();

        let mut by_team: BTreeMap<(i32, &str), Vec<&TeamGameRecord>> = BTreeMap::new();
        for g in team_games {
            by_team.entry((g.season, g.team.as_str())).or_default().push(g);
        }

        let mut out = HashMap::new();
        for ((season, team), mut games) in by_team {
            games.sort_by(|a, b| (a.week, &a.game_id).cmp(&(b.week, &b.game_id)));
            let mut sum = 0.0;
            let mut n = 0usize;
            for g in games {
                let lagged = if n == 0 || g.week == 0 {
                    NEUTRAL_SOS
                } else {
                    rating_at
                        .get(&(season, g.opponent.as_str(), g.week - 1))
                        .copied()
                        .flatten()
                        .unwrap_or(NEUTRAL_SOS)
                };
                sum += lagged;
                n += 1;
                out.insert((season, team.to_string(), g.week), sum / n as f64);
            }
        }
        out
    }

    /// Reindexes schedule strength onto the full grid (held across byes) and subtracts
    /// `beta * sos` from the smoothed net rating and, when present, from each component.
    pub fn adjust(
        &self,
        team_games: &[TeamGameRecord],
        smoothed: &[SmoothedTeamWeek],
    ) -> Vec<AdjustedTeamWeek> {
        let played = Self::sos_at_played_weeks(team_games, smoothed);

        let mut series: BTreeMap<(i32, &str), Vec<&SmoothedTeamWeek>> = BTreeMap::new();
        for r in smoothed {
            series.entry((r.season, r.team.as_str())).or_default().push(r);
        }

        let mut out = Vec::with_capacity(smoothed.len());
        for ((season, team), mut weeks) in series {
            weeks.sort_by_key(|r| r.week);
            let mut current = NEUTRAL_SOS;
            for r in weeks {
                if let Some(sos) = played.get(&(season, team.to_string(), r.week)) {
                    current = *sos;
                }
                let shift = self.beta * current;
                out.push(AdjustedTeamWeek {
                    season: r.season,
                    week: r.week,
                    team: r.team.clone(),
                    net_smooth: r.net_smooth,
                    off_smooth: r.off_smooth,
                    def_smooth: r.def_smooth,
                    cum_plays_eff: r.cum_plays_eff,
                    sos: current,
                    adj_net: r.net_smooth.map(|v| v - shift),
                    adj_off: r.off_smooth.map(|v| v - shift),
                    adj_def: r.def_smooth.map(|v| v - shift),
                });
            }
        }
        out.sort_by(|a, b| {
            (a.season, a.week, a.team.as_str()).cmp(&(b.season, b.week, b.team.as_str()))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(week: u32, team: &str, opp: &str) -> TeamGameRecord {
        TeamGameRecord {
            season: 2023,
            week,
            game_id: format!("{week}-{team}-{opp}"),
            team: team.to_string(),
            opponent: opp.to_string(),
            off_epa: 0.0,
            off_weight: 20.0,
            def_epa: 0.0,
            def_weight: 20.0,
            net: 0.0,
            n_plays_eff: 40.0,
        }
    }

    fn smooth(week: u32, team: &str, v: Option<f64>) -> SmoothedTeamWeek {
        SmoothedTeamWeek {
            season: 2023,
            week,
            team: team.to_string(),
            net: v,
            net_smooth: v,
            off_smooth: v,
            def_smooth: v.map(|_| 0.0),
            cum_plays_eff: 0.0,
        }
    }

    #[test]
    fn first_game_is_neutral_and_later_games_use_lagged_opponent() {
        let games = vec![game(1, "SEA", "SF"), game(2, "SEA", "LA"), game(4, "SEA", "SF")];
        let smoothed = vec![
            smooth(1, "SEA", Some(0.2)),
            smooth(2, "SEA", Some(0.1)),
            smooth(3, "SEA", Some(0.1)),
            smooth(4, "SEA", Some(0.3)),
            smooth(1, "LA", Some(0.4)),
            smooth(3, "SF", Some(-0.6)),
        ];
        let sos = ScheduleAdjuster::sos_at_played_weeks(&games, &smoothed);
        assert_eq!(sos[&(2023, "SEA".to_string(), 1)], 0.0);
        // (0 + 0.4) / 2
        assert!((sos[&(2023, "SEA".to_string(), 2)] - 0.2).abs() < 1e-12);
        // (0 + 0.4 - 0.6) / 3
        assert!((sos[&(2023, "SEA".to_string(), 4)] - (-0.2 / 3.0)).abs() < 1e-12);

        let adjusted = ScheduleAdjuster::new(0.7).adjust(&games, &smoothed);
        let sea: Vec<&AdjustedTeamWeek> = adjusted.iter().filter(|r| r.team == "SEA").collect();
        assert_eq!(sea[0].sos, 0.0);
        assert_eq!(sea[0].adj_net, sea[0].net_smooth);
        // week 3 is a bye and holds week 2's value
        assert_eq!(sea[2].sos, sea[1].sos);
        let expected = 0.1 - 0.7 * 0.2;
        assert!((sea[2].adj_net.expect("adjusted") - expected).abs() < 1e-12);
    }

    #[test]
    fn missing_lag_value_counts_as_zero() {
        let games = vec![game(1, "SEA", "SF"), game(2, "SEA", "NO")];
        let smoothed = vec![smooth(1, "SEA", Some(0.2)), smooth(2, "SEA", Some(0.1))];
        let sos = ScheduleAdjuster::sos_at_played_weeks(&games, &smoothed);
        assert_eq!(sos[&(2023, "SEA".to_string(), 2)], 0.0);
    }
}
