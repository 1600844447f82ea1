use std::collections::HashMap;

use crate::model::{Game, finite, median};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoofClass {
    Indoor,
    Outdoor,
    Retractable,
    Unknown,
}

impl RoofClass {
    pub fn from_roof(roof: Option<&str>) -> Self {
        match roof.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("dome") | Some("indoor") | Some("indoors") => RoofClass::Indoor,
            Some("outdoors") | Some("outdoor") => RoofClass::Outdoor,
            Some("open") | Some("closed") | Some("retractable") => RoofClass::Retractable,
            _ => RoofClass::Unknown,
        }
    }
}

/// Which level of the cascade produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImputeTier {
    Observed,
    StadiumRoofMonth,
    RoofMonth,
    Month,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VenueFeatures {
    pub roof_class: RoofClass,
    pub temp: f64,
    pub wind: f64,
    pub temp_tier: ImputeTier,
    pub wind_tier: ImputeTier,
}

impl VenueFeatures {
    pub fn temp_missing(&self) -> bool {
        self.temp_tier != ImputeTier::Observed
    }

    pub fn wind_missing(&self) -> bool {
        self.wind_tier != ImputeTier::Observed
    }

    /// 0 cold (< 40F), 1 mild, 2 hot (> 75F).
    pub fn temp_bucket(&self) -> u8 {
        if self.temp < 40.0 {
            0
        } else if self.temp > 75.0 {
            2
        } else {
            1
        }
    }

    /// 0 calm (< 5 mph), 1 breezy (< 15 mph), 2 windy.
    pub fn wind_bucket(&self) -> u8 {
        if self.wind < 5.0 {
            0
        } else if self.wind < 15.0 {
            1
        } else {
            2
        }
    }
}

#[derive(Debug, Clone, Default)]
struct BucketMedians {
    stadium_roof_month: HashMap<(String, String, u32), f64>,
    roof_month: HashMap<(String, u32), f64>,
    month: HashMap<u32, f64>,
}

impl BucketMedians {
    fn fit(games: &[Game], pick: fn(&Game) -> Option<f64>) -> Self {
        let mut srm: HashMap<(String, String, u32), Vec<f64>> = HashMap::new();
        let mut rm: HashMap<(String, u32), Vec<f64>> = HashMap::new();
        let mut m: HashMap<u32, Vec<f64>> = HashMap::new();
        for g in games {
            let (Some(v), Some(month)) = (finite(pick(g)), g.month()) else {
                continue;
            };
            let roof = roof_key(g);
            srm.entry((stadium_key(g), roof.clone(), month))
                .or_default()
                .push(v);
            rm.entry((roof, month)).or_default().push(v);
            m.entry(month).or_default().push(v);
        }
        Self {
            stadium_roof_month: collapse(srm),
            roof_month: collapse(rm),
            month: collapse(m),
        }
    }

    fn impute(&self, game: &Game, fallback: f64) -> (f64, ImputeTier) {
        let Some(month) = game.month() else {
            return (fallback, ImputeTier::Fallback);
        };
        let roof = roof_key(game);
        if let Some(v) = self
            .stadium_roof_month
            .get(&(stadium_key(game), roof.clone(), month))
        {
            return (*v, ImputeTier::StadiumRoofMonth);
        }
        if let Some(v) = self.roof_month.get(&(roof, month)) {
            return (*v, ImputeTier::RoofMonth);
        }
        if let Some(v) = self.month.get(&month) {
            return (*v, ImputeTier::Month);
        }
        (fallback, ImputeTier::Fallback)
    }
}

fn collapse<K: std::hash::Hash + Eq>(groups: HashMap<K, Vec<f64>>) -> HashMap<K, f64> {
    groups
        .into_iter()
        .filter_map(|(k, mut v)| median(&mut v).map(|m| (k, m)))
        .collect()
}

fn stadium_key(game: &Game) -> String {
    game.stadium
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

fn roof_key(game: &Game) -> String {
    game.roof
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Temperature and wind imputation: stadium+roof+month median, then roof+month,
/// then month, then a fixed constant.
#[derive(Debug, Clone)]
pub struct WeatherImputer {
    temp: BucketMedians,
    wind: BucketMedians,
    fallback_temp: f64,
    fallback_wind: f64,
}

impl WeatherImputer {
    pub fn fit(games: &[Game], fallback_temp: f64, fallback_wind: f64) -> Self {
        Self {
            temp: BucketMedians::fit(games, |g| g.temp),
            wind: BucketMedians::fit(games, |g| g.wind),
            fallback_temp,
            fallback_wind,
        }
    }

    pub fn venue(&self, game: &Game) -> VenueFeatures {
        let (temp, temp_tier) = match finite(game.temp) {
            Some(t) => (t, ImputeTier::Observed),
            None => self.temp.impute(game, self.fallback_temp),
        };
        let (wind, wind_tier) = match finite(game.wind) {
            Some(w) => (w, ImputeTier::Observed),
            None => self.wind.impute(game, self.fallback_wind),
        };
        VenueFeatures {
            roof_class: RoofClass::from_roof(game.roof.as_deref()),
            temp,
            wind,
            temp_tier,
            wind_tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SeasonType;
    use chrono::NaiveDate;

    fn game(id: &str, stadium: &str, roof: &str, month: u32, temp: Option<f64>) -> Game {
        let mut g = Game::new(id, 2023, 1, SeasonType::Reg, "KC", "BUF");
        g.stadium = Some(stadium.to_string());
        g.roof = Some(roof.to_string());
        g.gameday = NaiveDate::from_ymd_opt(2023, month, 10);
        g.temp = temp;
        g.wind = temp.map(|_| 8.0);
        g
    }

    #[test]
    fn cascade_escalates_to_coarser_buckets() {
        let history = vec![
            game("a", "Arrowhead", "outdoors", 12, Some(30.0)),
            game("b", "Arrowhead", "outdoors", 12, Some(34.0)),
            game("c", "Lambeau", "outdoors", 11, Some(40.0)),
            game("d", "Dome", "dome", 10, Some(70.0)),
        ];
        let imputer = WeatherImputer::fit(&history, 60.0, 6.0);

        let same_stadium = imputer.venue(&game("x", "Arrowhead", "outdoors", 12, None));
        assert_eq!(same_stadium.temp_tier, ImputeTier::StadiumRoofMonth);
        assert_eq!(same_stadium.temp, 32.0);
        assert!(same_stadium.temp_missing());

        let same_roof = imputer.venue(&game("y", "Soldier", "outdoors", 11, None));
        assert_eq!(same_roof.temp_tier, ImputeTier::RoofMonth);
        assert_eq!(same_roof.temp, 40.0);

        let month_only = imputer.venue(&game("z", "Ford", "closed", 10, None));
        assert_eq!(month_only.temp_tier, ImputeTier::Month);
        assert_eq!(month_only.roof_class, RoofClass::Retractable);

        let nothing = imputer.venue(&game("w", "Ford", "closed", 9, None));
        assert_eq!(nothing.temp_tier, ImputeTier::Fallback);
        assert_eq!(nothing.temp, 60.0);
        assert_eq!(nothing.wind, 6.0);
    }

    #[test]
    fn buckets() {
        let v = VenueFeatures {
            roof_class: RoofClass::Outdoor,
            temp: 20.0,
            wind: 16.0,
            temp_tier: ImputeTier::Observed,
            wind_tier: ImputeTier::Observed,
        };
        assert_eq!(v.temp_bucket(), 0);
        assert_eq!(v.wind_bucket(), 2);
        assert!(!v.temp_missing());
    }
}
