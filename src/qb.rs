use std::collections::{BTreeMap, HashMap};

use crate::asof::TeamWeekKeyed;
use crate::model::median;

#[derive(Debug, Clone)]
pub struct StarterRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub position: String,
    pub player_id: String,
    /// 1 = starter. Rows without a rank are treated as starters.
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QbStarter {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub player_id: String,
}

impl TeamWeekKeyed for QbStarter {
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

/// The top-ranked QB per team-week. Equal ranks resolve to the smallest player id so
/// the choice does not depend on row order.
pub fn qb_starters(records: &[StarterRecord]) -> Vec<QbStarter> {
    let mut best: BTreeMap<(i32, u32, &str), (u32, &str)> = BTreeMap::new();
    for r in records {
        if !r.position.trim().eq_ignore_ascii_case("QB") || r.player_id.trim().is_empty() {
            continue;
        }
        let candidate = (r.depth.unwrap_or(1), r.player_id.as_str());
        best.entry((r.season, r.week, r.team.as_str()))
            .and_modify(|cur| {
                if candidate < *cur {
                    *cur = candidate;
                }
            })
            .or_insert(candidate);
    }
    best.into_iter()
        .map(|((season, week, team), (_, player))| QbStarter {
            season,
            week,
            team: team.to_string(),
            player_id: player.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct QbContract {
    pub player_id: String,
    pub year_signed: i32,
    /// Average annual value as a percentage of the salary cap.
    pub apy_cap_pct: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct QbCapTable {
    by_player: HashMap<String, BTreeMap<i32, Option<f64>>>,
    cohort_median: HashMap<i32, f64>,
    league_median_through: BTreeMap<i32, f64>,
}

impl QbCapTable {
    pub fn new(contracts: &[QbContract]) -> Self {
        let mut by_player: HashMap<String, BTreeMap<i32, Option<f64>>> = HashMap::new();
        let mut cohorts: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for c in contracts {
            let value = c.apy_cap_pct.filter(|v| v.is_finite());
            let slot = by_player
                .entry(c.player_id.clone())
                .or_default()
                .entry(c.year_signed)
                .or_insert(None);
            if value.is_some() {
                *slot = value;
            }
            if let Some(v) = value {
                cohorts.entry(c.year_signed).or_default().push(v);
            }
        }

        let mut pooled = Vec::new();
        let mut league_median_through = BTreeMap::new();
        for (&year, values) in &cohorts {
            pooled.extend_from_slice(values);
            if let Some(m) = median(&mut pooled) {
                league_median_through.insert(year, m);
            }
        }
        let cohort_median = cohorts
            .into_iter()
            .filter_map(|(year, mut v)| median(&mut v).map(|m| (year, m)))
            .collect();
        Self {
            by_player,
            cohort_median,
            league_median_through,
        }
    }

    fn league_median(&self, season: i32) -> Option<f64> {
        self.league_median_through
            .range(..=season)
            .next_back()
            .map(|(_, m)| *m)
    }

    /// Cap % of the player's latest contract signed no later than `season`, and whether
    /// the value had to be imputed.
    pub fn cap_pct(&self, player_id: Option<&str>, season: i32) -> (Option<f64>, bool) {
        let Some(player_id) = player_id else {
            return (None, true);
        };
        let latest = self
            .by_player
            .get(player_id)
            .and_then(|m| m.range(..=season).next_back());
        match latest {
            Some((_, Some(v))) => (Some(*v), false),
            Some((year, None)) => (
                self.cohort_median
                    .get(year)
                    .copied()
                    .or_else(|| self.league_median(season)),
                true,
            ),
            None => (self.league_median(season), true),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QbSeasonLine {
    pub player_id: String,
    pub season: i32,
    pub attempts: f64,
    pub passing_yards: f64,
    pub pass_tds: f64,
    pub interceptions: f64,
    pub sacks: f64,
    pub sack_yards: f64,
}

impl QbSeasonLine {
    pub fn efficiency_index(&self) -> f64 {
        let numerator = self.passing_yards + 20.0 * self.pass_tds
            - 45.0 * self.interceptions
            - self.sack_yards;
        numerator / (self.attempts + self.sacks).max(1.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QbPriorTable {
    index: HashMap<(String, i32), f64>,
    league_median: HashMap<i32, f64>,
}

impl QbPriorTable {
    pub fn new(lines: &[QbSeasonLine]) -> Self {
        let mut totals: HashMap<(String, i32), QbSeasonLine> = HashMap::new();
        for l in lines {
            let t = totals
                .entry((l.player_id.clone(), l.season))
                .or_insert_with(|| QbSeasonLine {
                    player_id: l.player_id.clone(),
                    season: l.season,
                    ..QbSeasonLine::default()
                });
            t.attempts += l.attempts;
            t.passing_yards += l.passing_yards;
            t.pass_tds += l.pass_tds;
            t.interceptions += l.interceptions;
            t.sacks += l.sacks;
            t.sack_yards += l.sack_yards;
        }

        let mut per_season: HashMap<i32, Vec<f64>> = HashMap::new();
        let mut index = HashMap::with_capacity(totals.len());
        for (key, line) in totals {
            let value = line.efficiency_index();
            if !value.is_finite() {
                continue;
            }
            per_season.entry(key.1).or_default().push(value);
            index.insert(key, value);
        }
        let league_median = per_season
            .into_iter()
            .filter_map(|(season, mut v)| median(&mut v).map(|m| (season, m)))
            .collect();
        Self {
            index,
            league_median,
        }
    }

    /// Previous-season efficiency of the player, falling back to that season's league
    /// median. The flag is set whenever the player's own value was unavailable.
    pub fn prior(&self, player_id: Option<&str>, season: i32) -> (Option<f64>, bool) {
        let prior = season - 1;
        if let Some(player_id) = player_id
            && let Some(v) = self.index.get(&(player_id.to_string(), prior))
        {
            return (Some(*v), false);
        }
        (self.league_median.get(&prior).copied(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_prefers_lowest_depth() {
        let rec = |player: &str, depth: u32| StarterRecord {
            season: 2023,
            week: 1,
            team: "KC".to_string(),
            position: "QB".to_string(),
            player_id: player.to_string(),
            depth: Some(depth),
        };
        let starters = qb_starters(&[rec("backup", 2), rec("mahomes", 1)]);
        assert_eq!(starters.len(), 1);
        assert_eq!(starters[0].player_id, "mahomes");
    }

    #[test]
    fn cap_pct_imputes_from_cohort_then_league() {
        let table = QbCapTable::new(&[
            QbContract {
                player_id: "a".into(),
                year_signed: 2020,
                apy_cap_pct: Some(10.0),
            },
            QbContract {
                player_id: "b".into(),
                year_signed: 2020,
                apy_cap_pct: Some(14.0),
            },
            QbContract {
                player_id: "c".into(),
                year_signed: 2020,
                apy_cap_pct: None,
            },
            QbContract {
                player_id: "a".into(),
                year_signed: 2024,
                apy_cap_pct: Some(20.0),
            },
        ]);
        assert_eq!(table.cap_pct(Some("a"), 2023), (Some(10.0), false));
        assert_eq!(table.cap_pct(Some("a"), 2024), (Some(20.0), false));
        assert_eq!(table.cap_pct(Some("c"), 2022), (Some(12.0), true));
        assert_eq!(table.cap_pct(Some("unknown"), 2022), (Some(12.0), true));
        assert_eq!(table.cap_pct(Some("unknown"), 2024), (Some(14.0), true));
        assert_eq!(table.cap_pct(Some("unknown"), 2019), (None, true));
        assert_eq!(table.cap_pct(None, 2022), (None, true));
    }

    #[test]
    fn efficiency_index_floors_denominator() {
        let line = QbSeasonLine {
            passing_yards: 30.0,
            pass_tds: 1.0,
            ..QbSeasonLine::default()
        };
        assert_eq!(line.efficiency_index(), 50.0);
    }

    #[test]
    fn prior_falls_back_to_league_median() {
        let line = |player: &str, yards: f64| QbSeasonLine {
            player_id: player.to_string(),
            season: 2022,
            attempts: 100.0,
            passing_yards: yards,
            ..QbSeasonLine::default()
        };
        let table = QbPriorTable::new(&[line("a", 700.0), line("b", 800.0), line("c", 600.0)]);
        assert_eq!(table.prior(Some("b"), 2023), (Some(8.0), false));
        assert_eq!(table.prior(Some("rookie"), 2023), (Some(7.0), true));
        assert_eq!(table.prior(Some("b"), 2020), (None, true));
    }
}
