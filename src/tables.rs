//! Typed loaders for every upstream table.
//!
//! Each loader checks its required columns before touching a row, canonicalizes team
//! codes and skips rows whose keys are null. Optional columns that are absent read as
//! null.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

use crate::error::{PipelineError, PipelineResult};
use crate::frame::Frame;
use crate::injuries::InjuryRecord;
use crate::model::{Game, Play, SeasonType};
use crate::qb::{QbContract, QbSeasonLine, StarterRecord};
use crate::rankings::StatRankRecord;
use crate::team_form::{SnapCountRecord, StabilityRecord, TeamWeekStats};
use crate::team_strength::RatingRecord;
use crate::teams::canonical_team;

fn season_at(frame: &Frame, row: usize) -> Option<i32> {
    frame.i64_at("season", row).and_then(|v| i32::try_from(v).ok())
}

fn week_at(frame: &Frame, row: usize) -> Option<u32> {
    frame.i64_at("week", row).and_then(|v| u32::try_from(v).ok())
}

fn team_at(frame: &Frame, column: &str, row: usize) -> Option<String> {
    frame.str_at(column, row).map(canonical_team)
}

fn num(frame: &Frame, column: &str, row: usize) -> f64 {
    frame.f64_at(column, row).unwrap_or(0.0)
}

fn note_skipped(table: &str, skipped: usize) {
    if skipped > 0 {
        warn!(table, skipped, "rows with null keys skipped");
    }
}

/// Play-by-play. Without a schedule every play must carry its own season and week.
pub fn load_plays(frame: &Frame, schedule_supplied: bool) -> PipelineResult<Vec<Play>> {
    frame.require(
        "plays",
        &["game_id", "posteam", "defteam", "epa", "wpa", "home_wp_post"],
    )?;
    if !schedule_supplied {
        for column in ["season", "week"] {
            if !frame.has_column(column) {
                return Err(PipelineError::Config(format!(
                    "plays have no `{column}` column and no schedule was supplied"
                )));
            }
        }
    }

    let flag = |column: &str, row: usize| frame.bool_at(column, row).unwrap_or(false);
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let Some(game_id) = frame.str_at("game_id", row) else {
            skipped += 1;
            continue;
        };
        out.push(Play {
            game_id: game_id.to_string(),
            posteam: team_at(frame, "posteam", row),
            defteam: team_at(frame, "defteam", row),
            season: season_at(frame, row),
            week: week_at(frame, row),
            season_type: frame.str_at("season_type", row).and_then(SeasonType::parse),
            epa: frame.f64_at("epa", row),
            wpa: frame.f64_at("wpa", row),
            home_wp_post: frame.f64_at("home_wp_post", row),
            qb_kneel: flag("qb_kneel", row),
            qb_spike: flag("qb_spike", row),
            penalty: flag("penalty", row),
            no_play: frame.bool_at("no_play", row),
            aborted_play: flag("aborted_play", row),
            play_deleted: flag("play_deleted", row),
        });
    }
    note_skipped("plays", skipped);
    Ok(out)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Schedule rows. The phase comes from `game_type` (REG/WC/DIV/CON/SB/PRE) or, failing
/// that, `season_type`.
pub fn load_games(frame: &Frame) -> PipelineResult<Vec<Game>> {
    frame.require("games", &["game_id", "season", "week", "home_team", "away_team"])?;
    let phase_column = if frame.has_column("game_type") {
        "game_type"
    } else if frame.has_column("season_type") {
        "season_type"
    } else {
        return Err(PipelineError::missing_column("games", "game_type"));
    };

    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(game_id), Some(season), Some(week), Some(season_type), Some(home), Some(away)) = (
            frame.str_at("game_id", row),
            season_at(frame, row),
            week_at(frame, row),
            frame.str_at(phase_column, row).and_then(SeasonType::parse),
            team_at(frame, "home_team", row),
            team_at(frame, "away_team", row),
        ) else {
            skipped += 1;
            continue;
        };
        let mut game = Game::new(game_id, season, week, season_type, &home, &away);
        game.gameday = frame.str_at("gameday", row).and_then(parse_date);
        game.kickoff = match (game.gameday, frame.str_at("gametime", row)) {
            (Some(day), Some(time)) => chrono::NaiveTime::parse_from_str(time.trim(), "%H:%M")
                .ok()
                .map(|t| NaiveDateTime::new(day, t)),
            _ => None,
        };
        game.stadium = frame.str_at("stadium", row).map(str::to_string);
        game.roof = frame.str_at("roof", row).map(str::to_string);
        game.temp = frame.f64_at("temp", row);
        game.wind = frame.f64_at("wind", row);
        game.spread_line = frame.f64_at("spread_line", row);
        game.home_score = frame
            .i64_at("home_score", row)
            .and_then(|v| i32::try_from(v).ok());
        game.away_score = frame
            .i64_at("away_score", row)
            .and_then(|v| i32::try_from(v).ok());
        out.push(game);
    }
    note_skipped("games", skipped);
    Ok(out)
}

/// Reads back a published team-strength table.
pub fn load_ratings(frame: &Frame) -> PipelineResult<Vec<RatingRecord>> {
    frame.require(
        "team_strength",
        &[
            "season",
            "week",
            "team",
            "rating_net",
            "net_epa_smooth",
            "sos",
            "n_plays_eff",
        ],
    )?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team)) =
            (season_at(frame, row), week_at(frame, row), team_at(frame, "team", row))
        else {
            skipped += 1;
            continue;
        };
        let run_timestamp = frame
            .str_at("run_timestamp", row)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();
        out.push(RatingRecord {
            season,
            week,
            team,
            rating_net: frame.f64_at("rating_net", row),
            rating_off: frame.f64_at("rating_off", row),
            rating_def: frame.f64_at("rating_def", row),
            net_epa_smooth: frame.f64_at("net_epa_smooth", row),
            off_epa_smooth: frame.f64_at("off_epa_smooth", row),
            def_epa_smooth: frame.f64_at("def_epa_smooth", row),
            sos: num(frame, "sos", row),
            n_plays_eff: num(frame, "n_plays_eff", row),
            params_version: frame
                .str_at("params_version", row)
                .unwrap_or_default()
                .to_string(),
            run_timestamp,
        });
    }
    note_skipped("team_strength", skipped);
    Ok(out)
}

/// Per-player reports (`position`, status) or pre-aggregated rows (`position_group`,
/// `count`, optional status).
pub fn load_injuries(frame: &Frame) -> PipelineResult<Vec<InjuryRecord>> {
    frame.require("injuries", &["season", "week", "team"])?;
    let position_column = ["position", "position_group"]
        .into_iter()
        .find(|c| frame.has_column(c))
        .ok_or_else(|| PipelineError::missing_column("injuries", "position"))?;
    let status_column = ["report_status", "status"]
        .into_iter()
        .find(|c| frame.has_column(c));
    if status_column.is_none() && !frame.has_column("count") {
        return Err(PipelineError::missing_column("injuries", "status"));
    }

    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team), Some(position)) = (
            season_at(frame, row),
            week_at(frame, row),
            team_at(frame, "team", row),
            frame.str_at(position_column, row),
        ) else {
            skipped += 1;
            continue;
        };
        out.push(InjuryRecord {
            season,
            week,
            team,
            position: position.to_string(),
            status: status_column
                .and_then(|c| frame.str_at(c, row))
                .map(str::to_string),
            count: frame.f64_at("count", row),
        });
    }
    note_skipped("injuries", skipped);
    Ok(out)
}

pub fn load_starters(frame: &Frame) -> PipelineResult<Vec<StarterRecord>> {
    frame.require("depth_charts", &["season", "week", "team", "position", "player_id"])?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team), Some(position), Some(player)) = (
            season_at(frame, row),
            week_at(frame, row),
            team_at(frame, "team", row),
            frame.str_at("position", row),
            frame.str_at("player_id", row),
        ) else {
            skipped += 1;
            continue;
        };
        out.push(StarterRecord {
            season,
            week,
            team,
            position: position.to_string(),
            player_id: player.to_string(),
            depth: frame
                .i64_at("depth_team", row)
                .and_then(|v| u32::try_from(v).ok()),
        });
    }
    note_skipped("depth_charts", skipped);
    Ok(out)
}

/// Contract rows; when a `position` column exists only quarterbacks are kept.
pub fn load_contracts(frame: &Frame) -> PipelineResult<Vec<QbContract>> {
    frame.require("contracts", &["player_id", "year_signed", "apy_cap_pct"])?;
    let filter_qb = frame.has_column("position");
    let mut skipped = 0;
    let mut out = Vec::new();
    for row in 0..frame.n_rows() {
        if filter_qb
            && !frame
                .str_at("position", row)
                .is_some_and(|p| p.trim().eq_ignore_ascii_case("QB"))
        {
            continue;
        }
        let (Some(player), Some(year)) = (
            frame.str_at("player_id", row),
            frame
                .i64_at("year_signed", row)
                .and_then(|v| i32::try_from(v).ok()),
        ) else {
            skipped += 1;
            continue;
        };
        out.push(QbContract {
            player_id: player.to_string(),
            year_signed: year,
            apy_cap_pct: frame.f64_at("apy_cap_pct", row),
        });
    }
    note_skipped("contracts", skipped);
    Ok(out)
}

pub fn load_qb_seasons(frame: &Frame) -> PipelineResult<Vec<QbSeasonLine>> {
    frame.require(
        "qb_seasons",
        &[
            "player_id",
            "season",
            "attempts",
            "passing_yards",
            "passing_tds",
            "interceptions",
            "sacks",
            "sack_yards",
        ],
    )?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(player), Some(season)) = (frame.str_at("player_id", row), season_at(frame, row))
        else {
            skipped += 1;
            continue;
        };
        out.push(QbSeasonLine {
            player_id: player.to_string(),
            season,
            attempts: num(frame, "attempts", row),
            passing_yards: num(frame, "passing_yards", row),
            pass_tds: num(frame, "passing_tds", row),
            interceptions: num(frame, "interceptions", row),
            sacks: num(frame, "sacks", row),
            sack_yards: num(frame, "sack_yards", row),
        });
    }
    note_skipped("qb_seasons", skipped);
    Ok(out)
}

pub fn load_snaps(frame: &Frame) -> PipelineResult<Vec<SnapCountRecord>> {
    frame.require(
        "snap_counts",
        &["season", "week", "team", "offense_snaps", "defense_snaps"],
    )?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team)) =
            (season_at(frame, row), week_at(frame, row), team_at(frame, "team", row))
        else {
            skipped += 1;
            continue;
        };
        out.push(SnapCountRecord {
            season,
            week,
            team,
            offense_snaps: num(frame, "offense_snaps", row),
            defense_snaps: num(frame, "defense_snaps", row),
        });
    }
    note_skipped("snap_counts", skipped);
    Ok(out)
}

/// Offense or defense weekly aggregates; `table` only names the source in errors.
pub fn load_team_week_stats(frame: &Frame, table: &str) -> PipelineResult<Vec<TeamWeekStats>> {
    frame.require(
        table,
        &[
            "season",
            "week",
            "team",
            "plays",
            "pass_yards",
            "rush_yards",
            "touchdowns",
            "turnovers",
            "sacks",
        ],
    )?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team)) =
            (season_at(frame, row), week_at(frame, row), team_at(frame, "team", row))
        else {
            skipped += 1;
            continue;
        };
        out.push(TeamWeekStats {
            season,
            week,
            team,
            plays: num(frame, "plays", row),
            pass_yards: num(frame, "pass_yards", row),
            rush_yards: num(frame, "rush_yards", row),
            touchdowns: num(frame, "touchdowns", row),
            turnovers: num(frame, "turnovers", row),
            sacks: num(frame, "sacks", row),
        });
    }
    note_skipped(table, skipped);
    Ok(out)
}

pub fn load_stability(frame: &Frame) -> PipelineResult<Vec<StabilityRecord>> {
    frame.require(
        "stability",
        &["season", "week", "team", "position_group", "score"],
    )?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team), Some(group), Some(score)) = (
            season_at(frame, row),
            week_at(frame, row),
            team_at(frame, "team", row),
            frame.str_at("position_group", row),
            frame.f64_at("score", row),
        ) else {
            skipped += 1;
            continue;
        };
        out.push(StabilityRecord {
            season,
            week,
            team,
            group: group.to_string(),
            score,
        });
    }
    note_skipped("stability", skipped);
    Ok(out)
}

pub fn load_rankings(frame: &Frame) -> PipelineResult<Vec<StatRankRecord>> {
    frame.require("rankings", &["season", "week", "team", "stat", "rank"])?;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(frame.n_rows());
    for row in 0..frame.n_rows() {
        let (Some(season), Some(week), Some(team), Some(stat), Some(rank)) = (
            season_at(frame, row),
            week_at(frame, row),
            team_at(frame, "team", row),
            frame.str_at("stat", row),
            frame.f64_at("rank", row),
        ) else {
            skipped += 1;
            continue;
        };
        out.push(StatRankRecord {
            season,
            week,
            team,
            stat: stat.to_string(),
            rank,
        });
    }
    note_skipped("rankings", skipped);
    Ok(out)
}
