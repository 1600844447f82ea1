//! Weekly team-strength ratings ("SRS-EPA Lite").
//!
//! Leverage-weighted EPA per play is aggregated to team-games, collapsed onto a full
//! season x week x team grid, smoothed with an EWMA that holds through byes, corrected
//! for a lagged cumulative schedule strength and finally z-scored within each week.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::asof::TeamWeekKeyed;
use crate::config::StrengthParams;
use crate::error::PipelineResult;
use crate::frame::{Cell, Frame};
use crate::model::{Game, Play};
use crate::normalize::WeeklyZScorer;
use crate::play_weighting::{PlayWeighter, TeamGameAggregator};
use crate::schedule_adjust::ScheduleAdjuster;
use crate::smoothing::EwmaSmoother;
use crate::team_week::TeamWeekAggregator;

/// Published weekly rating row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub season: i32,
    pub week: u32,
    pub team: String,
    pub rating_net: Option<f64>,
    pub rating_off: Option<f64>,
    pub rating_def: Option<f64>,
    pub net_epa_smooth: Option<f64>,
    pub off_epa_smooth: Option<f64>,
    pub def_epa_smooth: Option<f64>,
    pub sos: f64,
    pub n_plays_eff: f64,
    pub params_version: String,
    pub run_timestamp: DateTime<Utc>,
}

impl TeamWeekKeyed for RatingRecord {
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

pub const RATING_COLUMNS: &[&str] = &[
    "season",
    "week",
    "team",
    "rating_net",
    "rating_off",
    "rating_def",
    "net_epa_smooth",
    "off_epa_smooth",
    "def_epa_smooth",
    "sos",
    "n_plays_eff",
    "params_version",
    "run_timestamp",
];

pub fn ratings_to_frame(rows: &[RatingRecord]) -> PipelineResult<Frame> {
    let names: Vec<String> = RATING_COLUMNS.iter().map(|s| s.to_string()).collect();
    let cells = rows
        .iter()
        .map(|r| {
            vec![
                Cell::Int(i64::from(r.season)),
                Cell::Int(i64::from(r.week)),
                Cell::Text(r.team.clone()),
                Cell::from_opt_f64(r.rating_net),
                Cell::from_opt_f64(r.rating_off),
                Cell::from_opt_f64(r.rating_def),
                Cell::from_opt_f64(r.net_epa_smooth),
                Cell::from_opt_f64(r.off_epa_smooth),
                Cell::from_opt_f64(r.def_epa_smooth),
                Cell::Float(r.sos),
                Cell::Float(r.n_plays_eff),
                Cell::Text(r.params_version.clone()),
                Cell::Text(r.run_timestamp.to_rfc3339()),
            ]
        })
        .collect();
    Frame::from_rows(&names, cells)
}

pub struct TeamStrengthEngine {
    params: StrengthParams,
}

impl TeamStrengthEngine {
    pub fn new(params: StrengthParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &StrengthParams {
        &self.params
    }

    pub fn run(&self, plays: &[Play], games: Option<&[Game]>) -> PipelineResult<Vec<RatingRecord>> {
        self.run_at(plays, games, Utc::now())
    }

    /// Same as [`run`](Self::run) with an explicit generation timestamp, so two runs over
    /// identical inputs produce identical tables.
    pub fn run_at(
        &self,
        plays: &[Play],
        games: Option<&[Game]>,
        run_timestamp: DateTime<Utc>,
    ) -> PipelineResult<Vec<RatingRecord>> {
        self.params.validate()?;

        let (weighted, summary) = PlayWeighter::new(self.params.w_min).weigh(plays, games)?;
        let team_games = TeamGameAggregator::new(self.params.min_eff_plays).aggregate(&weighted);
        let grid = TeamWeekAggregator::build(&team_games, games);
        let smoothed = EwmaSmoother::new(self.params.alpha()).smooth(&grid);
        let adjusted = ScheduleAdjuster::new(self.params.beta).adjust(&team_games, &smoothed);
        let z = WeeklyZScorer::new(self.params.keep_components).standardize(&adjusted);

        let version = self.params.version_tag();
        let keep = self.params.keep_components;
        let mut out: Vec<RatingRecord> = adjusted
            .into_iter()
            .zip(z)
            .map(|(a, z)| RatingRecord {
                season: a.season,
                week: a.week,
                team: a.team,
                rating_net: z.rating_net,
                rating_off: z.rating_off,
                rating_def: z.rating_def,
                net_epa_smooth: a.net_smooth,
                off_epa_smooth: if keep { a.off_smooth } else { None },
                def_epa_smooth: if keep { a.def_smooth } else { None },
                sos: a.sos,
                n_plays_eff: a.cum_plays_eff,
                params_version: version.clone(),
                run_timestamp,
            })
            .collect();
        out.sort_by(|a, b| {
            (a.season, a.week, a.team.as_str()).cmp(&(b.season, b.week, b.team.as_str()))
        });

        info!(
            plays_in = plays.len(),
            plays_kept = summary.kept,
            team_games = team_games.len(),
            rows = out.len(),
            params = %version,
            "team-strength ratings computed"
        );
        Ok(out)
    }
}
