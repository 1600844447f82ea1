use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeasonType {
    Pre,
    Reg,
    Post,
}

impl SeasonType {
    /// Accepts play-by-play season types as well as schedule game types.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRE" | "HOF" => Some(SeasonType::Pre),
            "REG" => Some(SeasonType::Reg),
            "POST" | "WC" | "DIV" | "CON" | "SB" => Some(SeasonType::Post),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonType::Pre => "PRE",
            SeasonType::Reg => "REG",
            SeasonType::Post => "POST",
        }
    }
}

impl fmt::Display for SeasonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One offensive snap from the play-by-play feed.
#[derive(Debug, Clone, Default)]
pub struct Play {
    pub game_id: String,
    pub posteam: Option<String>,
    pub defteam: Option<String>,
    pub season: Option<i32>,
    pub week: Option<u32>,
    pub season_type: Option<SeasonType>,
    pub epa: Option<f64>,
    pub wpa: Option<f64>,
    pub home_wp_post: Option<f64>,
    pub qb_kneel: bool,
    pub qb_spike: bool,
    pub penalty: bool,
    /// `None` when the feed did not carry an explicit no-play flag.
    pub no_play: Option<bool>,
    pub aborted_play: bool,
    pub play_deleted: bool,
}

impl Play {
    pub fn is_no_play(&self) -> bool {
        match self.no_play {
            Some(flag) => flag,
            None => self.play_deleted || self.aborted_play,
        }
    }
}

/// One scheduled game.
#[derive(Debug, Clone)]
pub struct Game {
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    pub season_type: SeasonType,
    pub home_team: String,
    pub away_team: String,
    pub gameday: Option<NaiveDate>,
    pub kickoff: Option<NaiveDateTime>,
    pub stadium: Option<String>,
    pub roof: Option<String>,
    pub temp: Option<f64>,
    pub wind: Option<f64>,
    pub spread_line: Option<f64>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl Game {
    pub fn new(
        game_id: &str,
        season: i32,
        week: u32,
        season_type: SeasonType,
        home_team: &str,
        away_team: &str,
    ) -> Self {
        Self {
            game_id: game_id.to_string(),
            season,
            week,
            season_type,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            gameday: None,
            kickoff: None,
            stadium: None,
            roof: None,
            temp: None,
            wind: None,
            spread_line: None,
            home_score: None,
            away_score: None,
        }
    }

    pub fn month(&self) -> Option<u32> {
        self.kickoff
            .map(|k| k.date().month())
            .or_else(|| self.gameday.map(|d| d.month()))
    }

    pub fn is_rated_phase(&self) -> bool {
        matches!(self.season_type, SeasonType::Reg | SeasonType::Post)
    }
}

/// Keeps finite values only; NaN/inf collapse to missing.
pub fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_type_accepts_schedule_codes() {
        assert_eq!(SeasonType::parse("REG"), Some(SeasonType::Reg));
        assert_eq!(SeasonType::parse("wc"), Some(SeasonType::Post));
        assert_eq!(SeasonType::parse("SB"), Some(SeasonType::Post));
        assert_eq!(SeasonType::parse("PRE"), Some(SeasonType::Pre));
        assert_eq!(SeasonType::parse("xyz"), None);
    }

    #[test]
    fn no_play_inferred_from_deleted_or_aborted() {
        let mut play = Play::default();
        assert!(!play.is_no_play());
        play.aborted_play = true;
        assert!(play.is_no_play());
        play.no_play = Some(false);
        assert!(!play.is_no_play());
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}
