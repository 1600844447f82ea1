use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::asof::{AsOfIndex, AsOfJoiner, GameSlot, SeasonCalendar};
use crate::config::{AssemblerConfig, QbPriorPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::frame::{Cell, Frame};
use crate::injuries::{INJURY_GROUPS, InjuryIndex, InjuryRecord, build_injury_index};
use crate::labels::{GameLabels, game_labels, spread_orientation};
use crate::model::{Game, SeasonType};
use crate::qb::{
    QbCapTable, QbContract, QbPriorTable, QbSeasonLine, QbStarter, StarterRecord, qb_starters,
};
use crate::rankings::{MATCHUP_PAIRS, RankWeek, StatRankRecord, matchup, pivot_ranks};
use crate::team_form::{
    STABILITY_GROUPS, SideRatesToDate, SnapCountRecord, SnapsToDate, StabilityRecord,
    StabilityWeek, TeamRecordToDate, TeamWeekStats, side_rates_to_date, snaps_to_date,
    stability_weeks, team_records_to_date,
};
use crate::team_strength::RatingRecord;
use crate::weather::{RoofClass, VenueFeatures, WeatherImputer};

/// Market and outcome columns. They close every row and are never model inputs.
pub const LABEL_COLUMNS: &[&str] = &[
    "spread_line",
    "spread_home",
    "margin",
    "total_points",
    "home_win",
    "spread_covered",
];

/// Columns that carry market information; downstream modeling must strip them.
pub const NON_PREDICTIVE_COLUMNS: &[&str] = &["spread_line", "spread_home"];

#[derive(Debug, Clone, Copy, Default)]
pub struct PregameInputs<'a> {
    pub games: &'a [Game],
    pub ratings: &'a [RatingRecord],
    pub injuries: &'a [InjuryRecord],
    pub starters: &'a [StarterRecord],
    pub contracts: &'a [QbContract],
    pub qb_seasons: &'a [QbSeasonLine],
    pub snaps: &'a [SnapCountRecord],
    pub offense: &'a [TeamWeekStats],
    pub defense: &'a [TeamWeekStats],
    pub stability: &'a [StabilityRecord],
    pub rankings: &'a [StatRankRecord],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Diffed,
    SidesOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairedFeature {
    pub name: String,
    pub home: Option<f64>,
    pub away: Option<f64>,
    pub kind: FeatureKind,
}

impl PairedFeature {
    pub fn diffed(name: impl Into<String>, home: Option<f64>, away: Option<f64>) -> Self {
        Self {
            name: name.into(),
            home: home.filter(|v| v.is_finite()),
            away: away.filter(|v| v.is_finite()),
            kind: FeatureKind::Diffed,
        }
    }

    pub fn flag(name: impl Into<String>, home: bool, away: bool) -> Self {
        let as_f64 = |b: bool| Some(if b { 1.0 } else { 0.0 });
        Self {
            name: name.into(),
            home: as_f64(home),
            away: as_f64(away),
            kind: FeatureKind::SidesOnly,
        }
    }

    pub fn diff(&self) -> Option<f64> {
        match self.kind {
            FeatureKind::Diffed => Some(self.home? - self.away?),
            FeatureKind::SidesOnly => None,
        }
    }
}

fn paired<T>(
    name: &str,
    home: Option<&T>,
    away: Option<&T>,
    get: impl Fn(&T) -> Option<f64>,
) -> PairedFeature {
    PairedFeature::diffed(name, home.and_then(|r| get(r)), away.and_then(|r| get(r)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PregameRow {
    pub game_id: String,
    pub season: i32,
    pub week: u32,
    pub season_type: SeasonType,
    pub home_team: String,
    pub away_team: String,
    pub gameday: Option<NaiveDate>,
    pub kickoff: Option<NaiveDateTime>,
    pub stadium: Option<String>,
    pub venue: VenueFeatures,
    pub features: Vec<PairedFeature>,
    pub labels: GameLabels,
}

impl PregameRow {
    pub fn feature(&self, name: &str) -> Option<&PairedFeature> {
        self.features.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct PregameTable {
    rows: Vec<PregameRow>,
    frame: Frame,
}

impl PregameTable {
    pub fn rows(&self) -> &[PregameRow] {
        &self.rows
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

const SIDE_RATES: [(&str, fn(&SideRatesToDate) -> Option<f64>); 6] = [
    ("yards_per_play", SideRatesToDate::yards_per_play),
    ("pass_yards_pg", SideRatesToDate::pass_yards_pg),
    ("rush_yards_pg", SideRatesToDate::rush_yards_pg),
    ("tds_pg", SideRatesToDate::touchdowns_pg),
    ("turnovers_pg", SideRatesToDate::turnovers_pg),
    ("sacks_pg", SideRatesToDate::sacks_pg),
];

struct Sources<'a> {
    joiner: AsOfJoiner<'a>,
    weather: WeatherImputer,
    ratings: AsOfIndex<&'a RatingRecord>,
    injuries: AsOfIndex<InjuryIndex>,
    starters: AsOfIndex<QbStarter>,
    caps: QbCapTable,
    qb_prior: QbPriorTable,
    snaps: AsOfIndex<SnapsToDate>,
    records: AsOfIndex<TeamRecordToDate>,
    offense: AsOfIndex<SideRatesToDate>,
    defense: AsOfIndex<SideRatesToDate>,
    stability: AsOfIndex<StabilityWeek>,
    ranks: AsOfIndex<RankWeek>,
    rank_stats: Vec<String>,
    spread_sign: f64,
}

impl<'a> Sources<'a> {
    fn build(
        inputs: &PregameInputs<'a>,
        calendar: &'a SeasonCalendar,
        config: &AssemblerConfig,
        targets: &[&Game],
    ) -> Self {
        let (rank_rows, rank_stats) = pivot_ranks(inputs.rankings);
        Self {
            joiner: AsOfJoiner::new(calendar),
            weather: WeatherImputer::fit(
                inputs.games,
                config.fallback_temp_f,
                config.fallback_wind_mph,
            ),
            // Grid rows dropped for low volume carry no rating and must not count as a hit.
            ratings: AsOfIndex::new(inputs.ratings.iter().filter(|r| r.rating_net.is_some())),
            injuries: AsOfIndex::new(build_injury_index(
                inputs.injuries,
                config.injury_mode,
                &config.injury_weights,
            )),
            starters: AsOfIndex::new(qb_starters(inputs.starters)),
            caps: QbCapTable::new(inputs.contracts),
            qb_prior: QbPriorTable::new(inputs.qb_seasons),
            snaps: AsOfIndex::new(snaps_to_date(inputs.snaps)),
            records: AsOfIndex::new(team_records_to_date(inputs.games)),
            offense: AsOfIndex::new(side_rates_to_date(inputs.offense)),
            defense: AsOfIndex::new(side_rates_to_date(inputs.defense)),
            stability: AsOfIndex::new(stability_weeks(inputs.stability)),
            ranks: AsOfIndex::new(rank_rows),
            rank_stats,
            spread_sign: spread_orientation(targets.iter().copied()),
        }
    }

    fn row(&self, game: &Game, config: &AssemblerConfig) -> PregameRow {
        let slot = GameSlot::of(game);
        let (home, away) = (game.home_team.as_str(), game.away_team.as_str());
        let mut features = Vec::with_capacity(96);

        self.rating_features(&mut features, slot, home, away);
        self.injury_features(&mut features, slot, home, away);
        self.snap_features(&mut features, slot, home, away);
        self.qb_features(&mut features, slot, home, away, config.qb_prior_policy);
        self.stability_features(&mut features, slot, home, away);
        self.form_features(&mut features, slot, home, away);
        self.rank_features(&mut features, slot, home, away);

        PregameRow {
            game_id: game.game_id.clone(),
            season: game.season,
            week: game.week,
            season_type: game.season_type,
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            gameday: game.gameday.or_else(|| game.kickoff.map(|k| k.date())),
            kickoff: game.kickoff,
            stadium: game.stadium.clone(),
            venue: self.weather.venue(game),
            features,
            labels: game_labels(game, self.spread_sign, config.push_policy),
        }
    }

    /// As-of ratings. A REG week-1 game without an in-season row carries over the
    /// team's final rating of the previous season.
    fn rating_features(&self, out: &mut Vec<PairedFeature>, slot: GameSlot, home: &str, away: &str) {
        let side = |team: &str| {
            let hit = self.joiner.lookup(&self.ratings, slot, team);
            let value = hit.value.copied().or_else(|| {
                if slot.is_reg_week_one() {
                    self.joiner
                        .prior_season_final(&self.ratings, slot.season, team)
                        .copied()
                } else {
                    None
                }
            });
            (value, hit.used_prior)
        };
        let (h, h_prior) = side(home);
        let (a, a_prior) = side(away);

        out.push(paired("rating_net", h, a, |r| r.rating_net));
        out.push(paired("rating_off", h, a, |r| r.rating_off));
        out.push(paired("rating_def", h, a, |r| r.rating_def));
        out.push(paired("net_epa_smooth", h, a, |r| r.net_epa_smooth));
        out.push(paired("sos", h, a, |r| Some(r.sos)));
        out.push(paired("n_plays_eff", h, a, |r| Some(r.n_plays_eff)));
        out.push(PairedFeature::flag("used_prior_rating", h_prior, a_prior));
    }

    /// Injury reports are read at the game's own week; no report means no burden.
    fn injury_features(&self, out: &mut Vec<PairedFeature>, slot: GameSlot, home: &str, away: &str) {
        let h = self.injuries.exact(slot.season, slot.week, home);
        let a = self.injuries.exact(slot.season, slot.week, away);
        for group in INJURY_GROUPS {
            out.push(PairedFeature::diffed(
                format!("inj_{}", group.key()),
                Some(h.map_or(0.0, |i| i.group(group))),
                Some(a.map_or(0.0, |i| i.group(group))),
            ));
        }
        out.push(PairedFeature::diffed(
            "inj_total",
            Some(h.map_or(0.0, InjuryIndex::total)),
            Some(a.map_or(0.0, InjuryIndex::total)),
        ));
    }

    fn snap_features(&self, out: &mut Vec<PairedFeature>, slot: GameSlot, home: &str, away: &str) {
        let h = self.joiner.lookup(&self.snaps, slot, home);
        let a = self.joiner.lookup(&self.snaps, slot, away);
        out.push(paired("off_snaps_pg", h.value, a.value, SnapsToDate::offense_snaps_pg));
        out.push(paired("def_snaps_pg", h.value, a.value, SnapsToDate::defense_snaps_pg));
        out.push(paired("off_snap_share", h.value, a.value, SnapsToDate::offense_share));
        out.push(PairedFeature::flag("snaps_used_prior", h.used_prior, a.used_prior));
    }

    fn starter(&self, slot: GameSlot, team: &str) -> Option<&str> {
        self.starters
            .exact(slot.season, slot.week, team)
            .or_else(|| self.joiner.lookup(&self.starters, slot, team).value)
            .map(|s| s.player_id.as_str())
    }

    fn qb_features(
        &self,
        out: &mut Vec<PairedFeature>,
        slot: GameSlot,
        home: &str,
        away: &str,
        policy: QbPriorPolicy,
    ) {
        let (h_qb, a_qb) = (self.starter(slot, home), self.starter(slot, away));

        let (h_cap, h_cap_imp) = self.caps.cap_pct(h_qb, slot.season);
        let (a_cap, a_cap_imp) = self.caps.cap_pct(a_qb, slot.season);
        out.push(PairedFeature::diffed("qb_cap_pct", h_cap, a_cap));
        out.push(PairedFeature::flag("qb_cap_imputed", h_cap_imp, a_cap_imp));

        let applies = match policy {
            QbPriorPolicy::RegWeekOne => slot.is_reg_week_one(),
            QbPriorPolicy::RegWeekOneAndPost => {
                slot.is_reg_week_one() || slot.season_type == SeasonType::Post
            }
        };
        let ((h_prior, h_imp), (a_prior, a_imp)) = if applies {
            (
                self.qb_prior.prior(h_qb, slot.season),
                self.qb_prior.prior(a_qb, slot.season),
            )
        } else {
            ((None, false), (None, false))
        };
        out.push(PairedFeature::diffed("qb_prior_eff", h_prior, a_prior));
        out.push(PairedFeature::flag("qb_prior_imputed", h_imp, a_imp));
    }

    /// REG week 1 has no lineup history yet: every group defaults to fully stable.
    fn stability_features(
        &self,
        out: &mut Vec<PairedFeature>,
        slot: GameSlot,
        home: &str,
        away: &str,
    ) {
        if slot.is_reg_week_one() {
            for group in STABILITY_GROUPS {
                out.push(PairedFeature::diffed(format!("stab_{group}"), Some(1.0), Some(1.0)));
            }
            out.push(PairedFeature::flag("stab_used_prior", false, false));
            return;
        }
        let h = self.joiner.lookup(&self.stability, slot, home);
        let a = self.joiner.lookup(&self.stability, slot, away);
        for group in STABILITY_GROUPS {
            out.push(paired(&format!("stab_{group}"), h.value, a.value, |s| {
                s.score(group)
            }));
        }
        out.push(PairedFeature::flag("stab_used_prior", h.used_prior, a.used_prior));
    }

    fn form_features(&self, out: &mut Vec<PairedFeature>, slot: GameSlot, home: &str, away: &str) {
        let h = self.joiner.lookup(&self.records, slot, home);
        let a = self.joiner.lookup(&self.records, slot, away);
        out.push(paired("win_pct", h.value, a.value, TeamRecordToDate::win_pct));
        out.push(paired("points_for_pg", h.value, a.value, TeamRecordToDate::points_for_pg));
        out.push(paired(
            "points_against_pg",
            h.value,
            a.value,
            TeamRecordToDate::points_against_pg,
        ));
        out.push(PairedFeature::flag("record_used_prior", h.used_prior, a.used_prior));

        for (prefix, index) in [("off", &self.offense), ("def", &self.defense)] {
            let h = self.joiner.lookup(index, slot, home);
            let a = self.joiner.lookup(index, slot, away);
            for (stat, get) in SIDE_RATES {
                out.push(paired(&format!("{prefix}_{stat}"), h.value, a.value, get));
            }
            out.push(PairedFeature::flag(
                format!("{prefix}_used_prior"),
                h.used_prior,
                a.used_prior,
            ));
        }
    }

    fn rank_features(&self, out: &mut Vec<PairedFeature>, slot: GameSlot, home: &str, away: &str) {
        let h = self.joiner.lookup(&self.ranks, slot, home);
        let a = self.joiner.lookup(&self.ranks, slot, away);
        for stat in &self.rank_stats {
            out.push(paired(&format!("rank_{stat}"), h.value, a.value, |r| {
                r.rank(stat)
            }));
        }
        for pair in &MATCHUP_PAIRS {
            let (home_value, away_value) = matchup(pair, h.value, a.value);
            out.push(PairedFeature::diffed(
                format!("matchup_{}", pair.name),
                home_value,
                away_value,
            ));
        }
        out.push(PairedFeature::flag("rank_used_prior", h.used_prior, a.used_prior));
    }
}

pub struct PregameAssembler {
    config: AssemblerConfig,
}

impl PregameAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    /// History outside `seasons` feeds priors and lookups but produces no rows.
    pub fn assemble(
        &self,
        inputs: &PregameInputs<'_>,
        seasons: RangeInclusive<i32>,
    ) -> PipelineResult<PregameTable> {
        if seasons.start() > seasons.end() {
            return Err(PipelineError::Config(format!(
                "season range {}..={} is empty",
                seasons.start(),
                seasons.end()
            )));
        }
        if inputs.ratings.is_empty() {
            return Err(PipelineError::MissingTable {
                family: "team_strength".to_string(),
            });
        }

        let mut by_id: BTreeMap<&str, &Game> = BTreeMap::new();
        let mut duplicates = 0usize;
        for g in inputs
            .games
            .iter()
            .filter(|g| seasons.contains(&g.season) && g.is_rated_phase())
        {
            if by_id.insert(g.game_id.as_str(), g).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(duplicates, "duplicate game ids in schedule; keeping the last row");
        }
        let targets: Vec<&Game> = by_id.into_values().collect();

        let calendar = SeasonCalendar::from_games(inputs.games);
        let sources = Sources::build(inputs, &calendar, &self.config, &targets);

        let mut rows: Vec<PregameRow> = targets
            .par_iter()
            .map(|g| sources.row(g, &self.config))
            .collect();
        rows.sort_by(|a, b| {
            (a.season, a.week, a.game_id.as_str()).cmp(&(b.season, b.week, b.game_id.as_str()))
        });

        let frame = rows_to_frame(&rows)?;
        check_postconditions(&frame, targets.len())?;

        let carried = rows
            .iter()
            .filter_map(|r| r.feature("used_prior_rating"))
            .filter(|f| f.home == Some(1.0) || f.away == Some(1.0))
            .count();
        info!(
            seasons = %format!("{}..={}", seasons.start(), seasons.end()),
            games = rows.len(),
            columns = frame.n_cols(),
            rating_cold_starts = carried,
            spread_sign = sources.spread_sign,
            "pregame features assembled"
        );
        Ok(PregameTable { rows, frame })
    }
}

fn bool_cell(b: bool) -> Cell {
    Cell::Int(i64::from(b))
}

pub fn rows_to_frame(rows: &[PregameRow]) -> PipelineResult<Frame> {
    let layout: Vec<(&str, FeatureKind)> = rows
        .first()
        .map(|r| {
            r.features
                .iter()
                .map(|f| (f.name.as_str(), f.kind))
                .collect()
        })
        .unwrap_or_default();

    let mut names: Vec<String> = [
        "game_id",
        "season",
        "week",
        "season_type",
        "home_team",
        "away_team",
        "gameday",
        "kickoff",
        "stadium",
        "roof_class",
        "is_indoor",
        "is_outdoor",
        "is_retractable",
        "temp",
        "wind",
        "temp_missing",
        "wind_missing",
        "temp_bucket",
        "wind_bucket",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for (name, kind) in &layout {
        names.push(format!("home_{name}"));
        names.push(format!("away_{name}"));
        if *kind == FeatureKind::Diffed {
            names.push(format!("diff_{name}"));
        }
    }
    names.extend(LABEL_COLUMNS.iter().map(|s| s.to_string()));

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let same_layout = row.features.len() == layout.len()
            && row
                .features
                .iter()
                .zip(&layout)
                .all(|(f, (name, kind))| f.name == *name && f.kind == *kind);
        if !same_layout {
            return Err(PipelineError::Postcondition(format!(
                "game {} has a feature layout different from the first row",
                row.game_id
            )));
        }

        let v = &row.venue;
        let roof = match v.roof_class {
            RoofClass::Indoor => "indoor",
            RoofClass::Outdoor => "outdoor",
            RoofClass::Retractable => "retractable",
            RoofClass::Unknown => "unknown",
        };
        let mut out = vec![
            Cell::Text(row.game_id.clone()),
            Cell::Int(i64::from(row.season)),
            Cell::Int(i64::from(row.week)),
            Cell::Text(row.season_type.to_string()),
            Cell::Text(row.home_team.clone()),
            Cell::Text(row.away_team.clone()),
            row.gameday
                .map(|d| Cell::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Cell::Null),
            row.kickoff
                .map(|k| Cell::Text(k.format("%Y-%m-%dT%H:%M").to_string()))
                .unwrap_or(Cell::Null),
            row.stadium.clone().map(Cell::Text).unwrap_or(Cell::Null),
            Cell::Text(roof.to_string()),
            bool_cell(v.roof_class == RoofClass::Indoor),
            bool_cell(v.roof_class == RoofClass::Outdoor),
            bool_cell(v.roof_class == RoofClass::Retractable),
            Cell::Float(v.temp),
            Cell::Float(v.wind),
            bool_cell(v.temp_missing()),
            bool_cell(v.wind_missing()),
            Cell::Int(i64::from(v.temp_bucket())),
            Cell::Int(i64::from(v.wind_bucket())),
        ];
        for f in &row.features {
            out.push(Cell::from_opt_f64(f.home));
            out.push(Cell::from_opt_f64(f.away));
            if f.kind == FeatureKind::Diffed {
                out.push(Cell::from_opt_f64(f.diff()));
            }
        }
        let l = &row.labels;
        out.push(Cell::from_opt_f64(l.spread_line));
        out.push(Cell::from_opt_f64(l.spread_home));
        out.push(Cell::from_opt_i64(l.margin));
        out.push(Cell::from_opt_i64(l.total_points));
        out.push(Cell::from_opt_i64(l.home_win));
        out.push(Cell::from_opt_i64(l.spread_covered));
        cells.push(out);
    }
    Frame::from_rows(&names, cells)
}

/// A failure means a join multiplied rows or a sign convention broke.
pub fn check_postconditions(frame: &Frame, expected_games: usize) -> PipelineResult<()> {
    let ids = frame
        .column("game_id")
        .ok_or_else(|| PipelineError::missing_column("pregame", "game_id"))?;
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        let id = id.as_str().ok_or_else(|| {
            PipelineError::Postcondition("pregame row without a game id".to_string())
        })?;
        if !seen.insert(id) {
            return Err(PipelineError::Postcondition(format!(
                "game {id} appears more than once"
            )));
        }
    }
    if seen.len() != expected_games {
        return Err(PipelineError::Postcondition(format!(
            "expected {expected_games} games, assembled {}",
            seen.len()
        )));
    }

    for (name, diff) in frame.columns().filter(|(n, _)| n.starts_with("diff_")) {
        let feature = &name["diff_".len()..];
        let home = frame
            .column(&format!("home_{feature}"))
            .ok_or_else(|| PipelineError::missing_column("pregame", &format!("home_{feature}")))?;
        let away = frame
            .column(&format!("away_{feature}"))
            .ok_or_else(|| PipelineError::missing_column("pregame", &format!("away_{feature}")))?;
        for (row, ((d, h), a)) in diff.iter().zip(home).zip(away).enumerate() {
            let expected = match (h.as_f64(), a.as_f64()) {
                (Some(h), Some(a)) => Some(h - a),
                _ => None,
            };
            if d.as_f64() != expected {
                return Err(PipelineError::Postcondition(format!(
                    "{name} != home_{feature} - away_{feature} at row {row}"
                )));
            }
        }
    }

    if let (Some(wins), Some(margins)) = (frame.column("home_win"), frame.column("margin")) {
        for (row, (w, m)) in wins.iter().zip(margins).enumerate() {
            let ok = match (w.as_i64(), m.as_i64()) {
                (None, None) => true,
                (Some(w), Some(m)) => w == i64::from(m > 0),
                _ => false,
            };
            if !ok {
                return Err(PipelineError::Postcondition(format!(
                    "home_win {w:?} inconsistent with margin {m:?} at row {row}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_have_no_diff() {
        let flag = PairedFeature::flag("used_prior_rating", true, false);
        assert_eq!(flag.diff(), None);
        let f = PairedFeature::diffed("rating_net", Some(1.5), Some(-0.5));
        assert_eq!(f.diff(), Some(2.0));
        let missing = PairedFeature::diffed("rating_net", Some(f64::NAN), Some(1.0));
        assert_eq!(missing.home, None);
        assert_eq!(missing.diff(), None);
    }

    #[test]
    fn postconditions_catch_a_broken_diff() {
        let names: Vec<String> = ["game_id", "home_x", "away_x", "diff_x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let frame = Frame::from_rows(
            &names,
            vec![vec![
                Cell::Text("g1".into()),
                Cell::Float(2.0),
                Cell::Float(0.5),
                Cell::Float(-1.5),
            ]],
        )
        .expect("frame");
        let err = check_postconditions(&frame, 1).expect_err("sign flip must be caught");
        assert!(matches!(err, PipelineError::Postcondition(_)));
    }

    #[test]
    fn postconditions_catch_fan_out() {
        let names = vec!["game_id".to_string()];
        let frame = Frame::from_rows(
            &names,
            vec![vec![Cell::Text("g1".into())], vec![Cell::Text("g1".into())]],
        )
        .expect("frame");
        assert!(check_postconditions(&frame, 1).is_err());
    }
}
