use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::model::{Game, Play, SeasonType, finite};

/// A play that survived filtering, with its resolved calendar slot and leverage weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPlay {
    pub season: i32,
    pub week: u32,
    pub game_id: String,
    pub offense: String,
    pub defense: String,
    pub epa: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeighingSummary {
    pub kept: usize,
    pub preseason: usize,
    pub unscheduled: usize,
    pub non_finite: usize,
    pub non_plays: usize,
}

/// Down-weights plays run while the game was already decided.
#[derive(Debug, Clone, Copy)]
pub struct PlayWeighter {
    w_min: f64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    season: i32,
    week: u32,
    season_type: SeasonType,
}

impl PlayWeighter {
    pub fn new(w_min: f64) -> Self {
        Self { w_min }
    }

    /// `max(w_min, 1 - 2|wp_pre - 0.5|)` where the pre-snap home win probability is
    /// reconstructed as `clip(home_wp_post - wpa, 0, 1)`.
    pub fn weight(&self, home_wp_post: f64, wpa: f64) -> f64 {
        let wp_pre = (home_wp_post - wpa).clamp(0.0, 1.0);
        (1.0 - 2.0 * (wp_pre - 0.5).abs()).max(self.w_min)
    }

    pub fn weigh(
        &self,
        plays: &[Play],
        games: Option<&[Game]>,
    ) -> PipelineResult<(Vec<WeightedPlay>, WeighingSummary)> {
        if games.is_none()
            && let Some(play) = plays.iter().find(|p| p.season.is_none() || p.week.is_none())
        {
            return Err(PipelineError::Config(format!(
                "play in game {} has no season/week and no schedule was supplied",
                play.game_id
            )));
        }

        let schedule: HashMap<&str, Slot> = games
            .unwrap_or_default()
            .iter()
            .map(|g| {
                (
                    g.game_id.as_str(),
                    Slot {
                        season: g.season,
                        week: g.week,
                        season_type: g.season_type,
                    },
                )
            })
            .collect();

        let mut summary = WeighingSummary::default();
        let mut out = Vec::with_capacity(plays.len());
        for play in plays {
            let slot = schedule.get(play.game_id.as_str()).copied();
            let season_type = play.season_type.or(slot.map(|s| s.season_type));
            if season_type == Some(SeasonType::Pre) {
                summary.preseason += 1;
                continue;
            }
            let (season, week) = match (play.season, play.week) {
                (Some(season), Some(week)) => (season, week),
                _ => match slot {
                    Some(slot) => (slot.season, slot.week),
                    None => {
                        summary.unscheduled += 1;
                        continue;
                    }
                },
            };

            let (Some(epa), Some(wp_post), Some(wpa)) = (
                finite(play.epa),
                finite(play.home_wp_post),
                finite(play.wpa),
            ) else {
                summary.non_finite += 1;
                continue;
            };
            if play.qb_kneel || play.qb_spike || play.penalty || play.is_no_play() {
                summary.non_plays += 1;
                continue;
            }
            let (Some(offense), Some(defense)) = (play.posteam.as_ref(), play.defteam.as_ref())
            else {
                summary.non_plays += 1;
                continue;
            };

            out.push(WeightedPlay {
                season,
                week,
                game_id: play.game_id.clone(),
                offense: offense.clone(),
                defense: defense.clone(),
                epa,
                weight: self.weight(wp_post, wpa),
            });
        }
        summary.kept = out.len();
        debug!(?summary, "weighted plays");
        Ok((out, summary))
    }
}

/// Offensive and defensive efficiency for one team in one game.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGameRecord {
    pub season: i32,
    pub week: u32,
    pub game_id: String,
    pub team: String,
    pub opponent: String,
    pub off_epa: f64,
    pub off_weight: f64,
    /// Negated weighted mean EPA allowed, so that higher is better.
    pub def_epa: f64,
    pub def_weight: f64,
    pub net: f64,
    pub n_plays_eff: f64,
}

#[derive(Debug, Clone, Default)]
struct SideAcc {
    opponent: String,
    sum_w: f64,
    sum_we: f64,
}

impl SideAcc {
    fn push(&mut self, opponent: &str, epa: f64, weight: f64) {
        if self.opponent.is_empty() {
            self.opponent = opponent.to_string();
        }
        self.sum_w += weight;
        self.sum_we += weight * epa;
    }

    fn mean(&self) -> Option<f64> {
        (self.sum_w > 0.0).then(|| self.sum_we / self.sum_w)
    }
}

type GameKey = (i32, u32, String, String);

pub struct TeamGameAggregator {
    min_eff_plays: f64,
}

impl TeamGameAggregator {
    pub fn new(min_eff_plays: f64) -> Self {
        Self { min_eff_plays }
    }

    /// Team-games with fewer effective plays than the threshold, or with only one side of
    /// the ball observed, are dropped rather than zero-filled.
    pub fn aggregate(&self, plays: &[WeightedPlay]) -> Vec<TeamGameRecord> {
        let mut offense: BTreeMap<GameKey, SideAcc> = BTreeMap::new();
        let mut defense: BTreeMap<GameKey, SideAcc> = BTreeMap::new();
        for p in plays {
            offense
                .entry((p.season, p.week, p.game_id.clone(), p.offense.clone()))
                .or_default()
                .push(&p.defense, p.epa, p.weight);
            defense
                .entry((p.season, p.week, p.game_id.clone(), p.defense.clone()))
                .or_default()
                .push(&p.offense, p.epa, p.weight);
        }

        let mut out = Vec::with_capacity(offense.len());
        let mut dropped = 0usize;
        for (key, off) in &offense {
            let Some(def) = defense.get(key) else {
                dropped += 1;
                continue;
            };
            let (Some(off_epa), Some(allowed)) = (off.mean(), def.mean()) else {
                dropped += 1;
                continue;
            };
            let n_plays_eff = off.sum_w + def.sum_w;
            if n_plays_eff < self.min_eff_plays {
                dropped += 1;
                continue;
            }
            let (season, week, game_id, team) = key.clone();
            let def_epa = -allowed;
            out.push(TeamGameRecord {
                season,
                week,
                game_id,
                team,
                opponent: off.opponent.clone(),
                off_epa,
                off_weight: off.sum_w,
                def_epa,
                def_weight: def.sum_w,
                net: off_epa + def_epa,
                n_plays_eff,
            });
        }
        dropped += defense.keys().filter(|k| !offense.contains_key(*k)).count();
        info!(
            team_games = out.len(),
            dropped,
            min_eff_plays = self.min_eff_plays,
            "aggregated team-games"
        );
        out
    }
}
