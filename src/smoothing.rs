use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::team_week::TeamWeekRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedTeamWeek {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub net: Option<f64>,
    pub net_smooth: Option<f64>,
    pub off_smooth: Option<f64>,
    pub def_smooth: Option<f64>,
    pub cum_plays_eff: f64,
}

/// Running state of one exponentially weighted series.
#[derive(Debug, Clone, Copy, Default)]
struct EwmaState {
    last: Option<f64>,
}

impl EwmaState {
    fn step(&mut self, raw: Option<f64>, alpha: f64) -> Option<f64> {
        match (raw.filter(|v| v.is_finite()), self.last) {
            (Some(x), None) => self.last = Some(x),
            (Some(x), Some(prev)) => self.last = Some(alpha * x + (1.0 - alpha) * prev),
            // bye: hold the previous value, no decay
            (None, _) => {}
        }
        self.last
    }
}

/// EWMA over a week-ordered series. The first observed value passes through unchanged,
/// missing weeks repeat the previous smoothed value, and leading gaps stay `None`.
pub fn ewma_series(values: &[Option<f64>], alpha: f64) -> Vec<Option<f64>> {
    let mut state = EwmaState::default();
    values.iter().map(|v| state.step(*v, alpha)).collect()
}

pub struct EwmaSmoother {
    alpha: f64,
}

impl EwmaSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn from_half_life(half_life_weeks: f64) -> Self {
        Self::new(1.0 - 2f64.powf(-1.0 / half_life_weeks))
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smooths each (season, team) series independently; series are processed in parallel.
    pub fn smooth(&self, rows: &[TeamWeekRecord]) -> Vec<SmoothedTeamWeek> {
        let mut series: BTreeMap<(i32, &str), Vec<&TeamWeekRecord>> = BTreeMap::new();
        for r in rows {
            series.entry((r.season, r.team.as_str())).or_default().push(r);
        }

        let alpha = self.alpha;
        let mut out: Vec<SmoothedTeamWeek> = series
            .into_par_iter()
            .flat_map_iter(|(_, mut weeks)| {
                weeks.sort_by_key(|r| r.week);
                let mut net = EwmaState::default();
                let mut off = EwmaState::default();
                let mut def = EwmaState::default();
                let mut cum_plays = 0.0;
                weeks
                    .into_iter()
                    .map(|r| {
                        cum_plays += r.n_plays_eff.filter(|v| v.is_finite()).unwrap_or(0.0);
                        SmoothedTeamWeek {
                            season: r.season,
                            week: r.week,
                            team: r.team.clone(),
                            net: r.net,
                            net_smooth: net.step(r.net, alpha),
                            off_smooth: off.step(r.off_epa, alpha),
                            def_smooth: def.step(r.def_epa, alpha),
                            cum_plays_eff: cum_plays,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_by(|a, b| {
            (a.season, a.week, a.team.as_str()).cmp(&(b.season, b.week, b.team.as_str()))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bye_week_carries_forward() {
        let alpha = EwmaSmoother::from_half_life(4.0).alpha();
        let out = ewma_series(&[Some(0.5), None, Some(0.2)], alpha);
        assert_eq!(out[0], Some(0.5));
        assert_eq!(out[1], Some(0.5));
        let expected = alpha * 0.2 + (1.0 - alpha) * 0.5;
        assert!((out[2].expect("smoothed") - expected).abs() < 1e-15);
    }

    #[test]
    fn leading_gaps_stay_missing_and_first_value_passes_through() {
        let out = ewma_series(&[None, None, Some(-0.3), Some(0.1)], 0.5);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(-0.3));
        assert!((out[3].expect("smoothed") - (-0.1)).abs() < 1e-15);
    }

    #[test]
    fn cumulative_plays_never_decrease() {
        let rows: Vec<TeamWeekRecord> = [Some(25.0), None, Some(30.0), Some(22.0)]
            .iter()
            .enumerate()
            .map(|(i, plays)| TeamWeekRecord {
                season: 2023,
                week: i as u32 + 1,
                team: "SEA".to_string(),
                off_epa: plays.map(|_| 0.1),
                def_epa: plays.map(|_| 0.0),
                net: plays.map(|_| 0.1),
                n_plays_eff: *plays,
                games: u32::from(plays.is_some()),
            })
            .collect();
        let out = EwmaSmoother::from_half_life(4.0).smooth(&rows);
        let cum: Vec<f64> = out.iter().map(|r| r.cum_plays_eff).collect();
        assert_eq!(cum, vec![25.0, 25.0, 55.0, 77.0]);
    }
}
