pub mod asof;
pub mod config;
pub mod error;
pub mod frame;
pub mod injuries;
pub mod labels;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod play_weighting;
pub mod pregame;
pub mod qb;
pub mod rankings;
pub mod schedule_adjust;
pub mod smoothing;
pub mod tables;
pub mod team_form;
pub mod team_strength;
pub mod team_week;
pub mod teams;
pub mod weather;

pub use error::{PipelineError, PipelineResult};
