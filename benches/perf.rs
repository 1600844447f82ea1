use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use chrono::{DateTime, Utc};
use gridiron_etl::config::{AssemblerConfig, StrengthParams};
use gridiron_etl::model::{Game, Play, SeasonType};
use gridiron_etl::pregame::{PregameAssembler, PregameInputs};
use gridiron_etl::team_strength::TeamStrengthEngine;

const TEAMS: [&str; 16] = [
    "ARI", "ATL", "BAL", "BUF", "CAR", "CHI", "CIN", "CLE", "DAL", "DEN", "DET", "GB", "HOU",
    "IND", "JAX", "KC",
];

/// Two seasons where each half of the league plays the other half with ~60 snaps per side per game.
fn synthetic_league() -> (Vec<Play>, Vec<Game>) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut plays = Vec::new();
    let mut games = Vec::new();
    for season in 2022..=2023 {
        for week in 1..=17u32 {
            let half = TEAMS.len() / 2;
            for i in 0..half {
                let home = TEAMS[i];
                let away = TEAMS[half + (i + week as usize) % half];
                let id = format!("{season}_{week:02}_{away}_{home}");
                for _ in 0..60 {
                    for (offense, defense) in [(home, away), (away, home)] {
                        plays.push(Play {
                            game_id: id.clone(),
                            posteam: Some(offense.to_string()),
                            defteam: Some(defense.to_string()),
                            season: Some(season),
                            week: Some(week),
                            season_type: Some(SeasonType::Reg),
                            epa: Some(rng.gen_range(-1.5..1.5)),
                            wpa: Some(rng.gen_range(-0.05..0.05)),
                            home_wp_post: Some(rng.gen_range(0.05..0.95)),
                            ..Play::default()
                        });
                    }
                }
                let mut game = Game::new(&id, season, week, SeasonType::Reg, home, away);
                game.home_score = Some(rng.gen_range(3..40));
                game.away_score = Some(rng.gen_range(3..40));
                game.spread_line = Some(f64::from(rng.gen_range(-14i32..14)) / 2.0);
                games.push(game);
            }
        }
    }
    (plays, games)
}

fn bench_team_strength(c: &mut Criterion) {
    let (plays, games) = synthetic_league();
    let engine = TeamStrengthEngine::new(StrengthParams::default());
    c.bench_function("team_strength_two_seasons", |b| {
        b.iter(|| {
            let ratings = engine
                .run_at(black_box(&plays), Some(&games), DateTime::<Utc>::default())
                .unwrap();
            black_box(ratings.len());
        })
    });
}

fn bench_pregame_assemble(c: &mut Criterion) {
    let (plays, games) = synthetic_league();
    let ratings = TeamStrengthEngine::new(StrengthParams::default())
        .run_at(&plays, Some(&games), DateTime::<Utc>::default())
        .unwrap();
    let assembler = PregameAssembler::new(AssemblerConfig::default());
    c.bench_function("pregame_assemble_two_seasons", |b| {
        b.iter(|| {
            let inputs = PregameInputs {
                games: black_box(&games),
                ratings: &ratings,
                ..PregameInputs::default()
            };
            let table = assembler.assemble(&inputs, 2022..=2023).unwrap();
            black_box(table.len());
        })
    });
}

criterion_group!(benches, bench_team_strength, bench_pregame_assemble);
criterion_main!(benches);
