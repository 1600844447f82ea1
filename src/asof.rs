//! Leakage-safe "as of kickoff" lookups into per-team weekly tables.
//!
//! A regular-season game may only see records from earlier weeks of the same season.
//! A postseason game sees the completed regular season and nothing after it, so earlier
//! playoff rounds never leak into later ones.

use std::collections::{BTreeMap, HashMap};

use crate::model::{Game, SeasonType};

pub trait TeamWeekKeyed {
    fn season(&self) -> i32;
    fn week(&self) -> u32;
    fn team(&self) -> &str;
}

impl<T: TeamWeekKeyed + ?Sized> TeamWeekKeyed for &T {
    fn season(&self) -> i32 {
        (**self).season()
    }
    fn week(&self) -> u32 {
        (**self).week()
    }
    fn team(&self) -> &str {
        (**self).team()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSlot {
    pub season: i32,
    pub week: u32,
    pub season_type: SeasonType,
}

impl GameSlot {
    pub fn of(game: &Game) -> Self {
        Self {
            season: game.season,
            week: game.week,
            season_type: game.season_type,
        }
    }

    pub fn is_reg_week_one(&self) -> bool {
        self.season_type == SeasonType::Reg && self.week == 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeasonCalendar {
    last_reg_week: HashMap<i32, u32>,
}

impl SeasonCalendar {
    pub fn from_games(games: &[Game]) -> Self {
        let mut last_reg_week: HashMap<i32, u32> = HashMap::new();
        for g in games.iter().filter(|g| g.season_type == SeasonType::Reg) {
            let entry = last_reg_week.entry(g.season).or_insert(g.week);
            *entry = (*entry).max(g.week);
        }
        Self { last_reg_week }
    }

    pub fn last_reg_week(&self, season: i32) -> Option<u32> {
        self.last_reg_week.get(&season).copied()
    }

    /// Highest week (inclusive) a lookup for `slot` may read, or `None` when nothing in
    /// the season qualifies.
    pub fn cutoff(&self, slot: GameSlot) -> Option<u32> {
        match slot.season_type {
            SeasonType::Reg => slot.week.checked_sub(1).filter(|w| *w > 0),
            SeasonType::Post => self.last_reg_week(slot.season),
            SeasonType::Pre => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsOfIndex<T> {
    by_team: HashMap<(i32, String), BTreeMap<u32, T>>,
    len: usize,
}

impl<T: TeamWeekKeyed> AsOfIndex<T> {
    pub fn new(rows: impl IntoIterator<Item = T>) -> Self {
        let mut by_team: HashMap<(i32, String), BTreeMap<u32, T>> = HashMap::new();
        for row in rows {
            by_team
                .entry((row.season(), row.team().to_string()))
                .or_default()
                .insert(row.week(), row);
        }
        let len = by_team.values().map(|m| m.len()).sum();
        Self { by_team, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn exact(&self, season: i32, week: u32, team: &str) -> Option<&T> {
        self.by_team.get(&(season, team.to_string()))?.get(&week)
    }

    pub fn latest_at_or_before(&self, season: i32, team: &str, max_week: u32) -> Option<&T> {
        self.by_team
            .get(&(season, team.to_string()))?
            .range(..=max_week)
            .next_back()
            .map(|(_, row)| row)
    }
}

/// Result of one side's lookup. `used_prior` is set when no in-season record qualified.
#[derive(Debug, Clone, Copy)]
pub struct AsOf<'a, T> {
    pub value: Option<&'a T>,
    pub used_prior: bool,
}

impl<T> AsOf<'_, T> {
    pub fn flag(&self) -> f64 {
        if self.used_prior { 1.0 } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AsOfJoiner<'c> {
    calendar: &'c SeasonCalendar,
}

impl<'c> AsOfJoiner<'c> {
    pub fn new(calendar: &'c SeasonCalendar) -> Self {
        Self { calendar }
    }

    pub fn lookup<'a, T: TeamWeekKeyed>(
        &self,
        index: &'a AsOfIndex<T>,
        slot: GameSlot,
        team: &str,
    ) -> AsOf<'a, T> {
        let value = self
            .calendar
            .cutoff(slot)
            .and_then(|cutoff| index.latest_at_or_before(slot.season, team, cutoff));
        AsOf {
            value,
            used_prior: value.is_none(),
        }
    }

    /// The team's final regular-season record of the previous season.
    pub fn prior_season_final<'a, T: TeamWeekKeyed>(
        &self,
        index: &'a AsOfIndex<T>,
        season: i32,
        team: &str,
    ) -> Option<&'a T> {
        let prior = season - 1;
        let cutoff = self.calendar.last_reg_week(prior).unwrap_or(u32::MAX);
        index.latest_at_or_before(prior, team, cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        season: i32,
        week: u32,
        team: String,
        value: f64,
    }

    impl TeamWeekKeyed for Row {
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

    fn row(season: i32, week: u32, value: f64) -> Row {
        Row {
            season,
            week,
            team: "KC".to_string(),
            value,
        }
    }

    fn calendar() -> SeasonCalendar {
        let mut games = Vec::new();
        for week in 1..=18 {
            games.push(Game::new(&format!("r{week}"), 2023, week, SeasonType::Reg, "KC", "BUF"));
        }
        games.push(Game::new("wc", 2023, 19, SeasonType::Post, "KC", "MIA"));
        SeasonCalendar::from_games(&games)
    }

    #[test]
    fn regular_season_reads_strictly_earlier_weeks() {
        let cal = calendar();
        let index = AsOfIndex::new(vec![row(2023, 3, 0.3), row(2023, 5, 0.5), row(2023, 6, 0.6)]);
        let joiner = AsOfJoiner::new(&cal);
        let slot = GameSlot {
            season: 2023,
            week: 6,
            season_type: SeasonType::Reg,
        };
        let hit = joiner.lookup(&index, slot, "KC");
        assert_eq!(hit.value.map(|r| r.value), Some(0.5));
        assert!(!hit.used_prior);

        let week_one = GameSlot { week: 1, ..slot };
        let miss = joiner.lookup(&index, week_one, "KC");
        assert!(miss.value.is_none());
        assert_eq!(miss.flag(), 1.0);
    }

    #[test]
    fn postseason_is_fenced_to_regular_season() {
        let cal = calendar();
        let index = AsOfIndex::new(vec![
            row(2023, 10, 0.1),
            row(2023, 18, 0.18),
            row(2023, 19, 0.19),
        ]);
        let joiner = AsOfJoiner::new(&cal);
        let slot = GameSlot {
            season: 2023,
            week: 20,
            season_type: SeasonType::Post,
        };
        assert_eq!(joiner.lookup(&index, slot, "KC").value.map(|r| r.week), Some(18));
    }

    #[test]
    fn prior_season_final_uses_last_regular_week() {
        let cal = calendar();
        let index = AsOfIndex::new(vec![row(2023, 17, 0.17), row(2023, 18, 0.18), row(2023, 20, 0.2)]);
        let joiner = AsOfJoiner::new(&cal);
        let prior = joiner.prior_season_final(&index, 2024, "KC").expect("prior season");
        assert_eq!(prior.week, 18);
    }
}
