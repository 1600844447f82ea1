use tracing::debug;

use crate::config::PushPolicy;
use crate::model::{Game, finite};

/// Outcome columns of one game. All `None` while the game is unplayed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GameLabels {
    pub spread_line: Option<f64>,
    pub spread_home: Option<f64>,
    pub margin: Option<i64>,
    pub total_points: Option<i64>,
    pub home_win: Option<i64>,
    pub spread_covered: Option<i64>,
}

/// Sign that orients `spread_line` so it correlates positively with the home margin,
/// decided once over every game that has both a line and a final score.
pub fn spread_orientation<'a>(games: impl IntoIterator<Item = &'a Game>) -> f64 {
    let pairs: Vec<(f64, f64)> = games
        .into_iter()
        .filter_map(|g| {
            let line = finite(g.spread_line)?;
            let margin = f64::from(g.home_score? - g.away_score?);
            Some((line, margin))
        })
        .collect();
    if pairs.len() < 2 {
        return 1.0;
    }
    let n = pairs.len() as f64;
    let mean_line = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_margin = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let cov: f64 = pairs
        .iter()
        .map(|(l, m)| (l - mean_line) * (m - mean_margin))
        .sum();
    let sign = if cov < 0.0 { -1.0 } else { 1.0 };
    debug!(games = pairs.len(), cov, sign, "spread orientation detected");
    sign
}

pub fn game_labels(game: &Game, spread_sign: f64, push: PushPolicy) -> GameLabels {
    let spread_line = finite(game.spread_line);
    let spread_home = spread_line.map(|s| s * spread_sign);
    let (margin, total_points) = match (game.home_score, game.away_score) {
        (Some(h), Some(a)) => (
            Some(i64::from(h) - i64::from(a)),
            Some(i64::from(h) + i64::from(a)),
        ),
        _ => (None, None),
    };
    let home_win = margin.map(|m| i64::from(m > 0));
    let spread_covered = match (margin, spread_home) {
        (Some(m), Some(s)) => {
            let edge = m as f64 - s;
            let covered = match push {
                PushPolicy::PushCovers => edge >= 0.0,
                PushPolicy::Strict => edge > 0.0,
            };
            Some(i64::from(covered))
        }
        _ => None,
    };
    GameLabels {
        spread_line,
        spread_home,
        margin,
        total_points,
        home_win,
        spread_covered,
    }
}
