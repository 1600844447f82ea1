use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};

use gridiron_etl::PipelineError;
use gridiron_etl::config::StrengthParams;
use gridiron_etl::frame::{Cell, Frame};
use gridiron_etl::model::{Game, Play, SeasonType};
use gridiron_etl::tables::load_plays;
use gridiron_etl::team_strength::{RatingRecord, TeamStrengthEngine};

fn snap(game_id: &str, week: u32, offense: &str, defense: &str, epa: f64) -> Play {
    Play {
        game_id: game_id.to_string(),
        posteam: Some(offense.to_string()),
        defteam: Some(defense.to_string()),
        season: Some(2023),
        week: Some(week),
        season_type: Some(SeasonType::Reg),
        epa: Some(epa),
        wpa: Some(0.0),
        home_wp_post: Some(0.5),
        ..Play::default()
    }
}

/// SEA gains +0.3 per snap and allows -0.2; SF is the mirror image. Both weeks identical.
fn scenario_a() -> (Vec<Play>, Vec<Game>) {
    let mut plays = Vec::new();
    let mut games = Vec::new();
    for week in 1..=2 {
        let id = format!("2023_{week:02}_SF_SEA");
        for _ in 0..12 {
            plays.push(snap(&id, week, "SEA", "SF", 0.3));
            plays.push(snap(&id, week, "SF", "SEA", -0.2));
        }
        games.push(Game::new(&id, 2023, week, SeasonType::Reg, "SEA", "SF"));
    }
    (plays, games)
}

fn run(plays: &[Play], games: Option<&[Game]>) -> Vec<RatingRecord> {
    let ts = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single().expect("timestamp");
    TeamStrengthEngine::new(StrengthParams::default())
        .run_at(plays, games, ts)
        .expect("engine run")
}

fn mean_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

#[test]
fn two_team_league_rates_mirror_images() {
    let (plays, games) = scenario_a();
    let ratings = run(&plays, Some(&games));
    assert_eq!(ratings.len(), 4);

    let week1: Vec<&RatingRecord> = ratings.iter().filter(|r| r.week == 1).collect();
    let sea = week1.iter().find(|r| r.team == "SEA").expect("SEA week 1");
    let sf = week1.iter().find(|r| r.team == "SF").expect("SF week 1");

    assert_eq!(sea.sos, 0.0);
    assert_eq!(sf.sos, 0.0);
    assert!((sea.net_epa_smooth.expect("net") - 0.5).abs() < 1e-12);
    assert!((sf.net_epa_smooth.expect("net") + 0.5).abs() < 1e-12);

    let sea_rating = sea.rating_net.expect("rating");
    let sf_rating = sf.rating_net.expect("rating");
    assert!(sea_rating > 0.0);
    assert!(sf_rating < 0.0);
    assert!((sea_rating + sf_rating).abs() < 1e-12);

    let (mean, sd) = mean_sd(&[sea_rating, sf_rating]);
    assert!(mean.abs() < 1e-12);
    assert!((sd - 1.0).abs() < 1e-9);
}

#[test]
fn first_week_is_schedule_neutral_for_every_team() {
    let (plays, games) = scenario_a();
    let ratings = run(&plays, Some(&games));
    let mut first: BTreeMap<&str, &RatingRecord> = BTreeMap::new();
    for r in &ratings {
        first.entry(r.team.as_str()).or_insert(r);
    }
    for r in first.values() {
        assert_eq!(r.week, 1);
        assert_eq!(r.sos, 0.0);
    }
}

#[test]
fn each_week_is_standardized() {
    let mut plays = Vec::new();
    let mut games = Vec::new();
    let teams = [("KC", 0.25), ("BUF", 0.1), ("MIA", -0.05), ("NYJ", -0.2)];
    for week in 1..=3 {
        for pair in [(0, 1), (2, 3)] {
            let (home, h_epa) = teams[pair.0];
            let (away, a_epa) = teams[pair.1];
            let id = format!("2023_{week:02}_{away}_{home}");
            for i in 0..15 {
                let jitter = f64::from(i % 3) * 0.01 * f64::from(week);
                plays.push(snap(&id, week, home, away, h_epa + jitter));
                plays.push(snap(&id, week, away, home, a_epa - jitter));
            }
            games.push(Game::new(&id, 2023, week, SeasonType::Reg, home, away));
        }
    }
    let ratings = run(&plays, Some(&games));
    for week in 1..=3 {
        let values: Vec<f64> = ratings
            .iter()
            .filter(|r| r.week == week)
            .filter_map(|r| r.rating_net)
            .collect();
        assert_eq!(values.len(), 4);
        let (mean, sd) = mean_sd(&values);
        assert!(mean.abs() < 1e-9, "week {week} mean {mean}");
        assert!((sd - 1.0).abs() < 1e-9, "week {week} sd {sd}");
    }
}

#[test]
fn identical_cross_section_rates_zero() {
    let mut plays = Vec::new();
    let id = "2023_01_NYG_DAL";
    for _ in 0..20 {
        plays.push(snap(id, 1, "DAL", "NYG", 0.1));
        plays.push(snap(id, 1, "NYG", "DAL", 0.1));
    }
    let games = vec![Game::new(id, 2023, 1, SeasonType::Reg, "DAL", "NYG")];
    let ratings = run(&plays, Some(&games));
    assert_eq!(ratings.len(), 2);
    assert!(ratings.iter().all(|r| r.rating_net == Some(0.0)));
}

#[test]
fn exposure_is_monotone_and_components_reconcile() {
    let mut plays = Vec::new();
    let mut games = Vec::new();
    // DET has a bye in week 2.
    for (week, home, away) in [(1, "DET", "GB"), (2, "GB", "CHI"), (3, "CHI", "DET")] {
        let id = format!("2023_{week:02}_{away}_{home}");
        for i in 0..14 {
            let e = f64::from(i) * 0.02 - 0.1;
            plays.push(snap(&id, week, home, away, e + 0.05));
            plays.push(snap(&id, week, away, home, e));
        }
        games.push(Game::new(&id, 2023, week, SeasonType::Reg, home, away));
    }
    let ratings = run(&plays, Some(&games));

    let mut by_team: BTreeMap<&str, Vec<&RatingRecord>> = BTreeMap::new();
    for r in &ratings {
        by_team.entry(r.team.as_str()).or_default().push(r);
    }
    for rows in by_team.values() {
        for pair in rows.windows(2) {
            assert!(pair[1].week > pair[0].week);
            assert!(pair[1].n_plays_eff >= pair[0].n_plays_eff);
        }
    }

    let det_bye = ratings
        .iter()
        .find(|r| r.team == "DET" && r.week == 2)
        .expect("DET bye row");
    let det_w1 = ratings
        .iter()
        .find(|r| r.team == "DET" && r.week == 1)
        .expect("DET week 1");
    assert_eq!(det_bye.net_epa_smooth, det_w1.net_epa_smooth);
    assert_eq!(det_bye.n_plays_eff, det_w1.n_plays_eff);

    for r in &ratings {
        if let (Some(net), Some(off), Some(def)) =
            (r.net_epa_smooth, r.off_epa_smooth, r.def_epa_smooth)
        {
            assert!((net - (off + def)).abs() < 1e-9);
        }
    }
}

#[test]
fn params_version_and_sorting() {
    let (plays, games) = scenario_a();
    let ratings = run(&plays, Some(&games));
    assert!(
        ratings
            .windows(2)
            .all(|w| (w[0].season, w[0].week, &w[0].team) <= (w[1].season, w[1].week, &w[1].team))
    );
    assert!(ratings.iter().all(|r| r.params_version.starts_with("srs_epa_lite_v1|")));
    let again = run(&plays, Some(&games));
    assert_eq!(ratings, again);
}

#[test]
fn missing_epa_column_fails_before_computation() {
    let names: Vec<String> = ["game_id", "posteam", "defteam", "wpa", "home_wp_post", "season", "week"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let frame = Frame::from_rows(
        &names,
        vec![vec![
            Cell::Text("g".into()),
            Cell::Text("KC".into()),
            Cell::Text("BUF".into()),
            Cell::Float(0.0),
            Cell::Float(0.5),
            Cell::Int(2023),
            Cell::Int(1),
        ]],
    )
    .expect("frame");
    let err = load_plays(&frame, false).expect_err("epa is required");
    assert!(matches!(err, PipelineError::MissingColumn { .. }));
    assert!(err.to_string().contains("epa"));
}

#[test]
fn plays_without_week_and_no_schedule_are_rejected() {
    let mut plays = scenario_a().0;
    plays[0].week = None;
    let err = TeamStrengthEngine::new(StrengthParams::default())
        .run(&plays, None)
        .expect_err("no schedule to recover the week");
    assert!(matches!(err, PipelineError::Config(_)));
}
