//! Batch entry point: weekly team-strength ratings and the pregame feature table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;

use gridiron_etl::config::PipelineConfig;
use gridiron_etl::frame::Frame;
use gridiron_etl::persist::{
    finish_run, open_db, read_parquet, read_parquet_if_exists, replace_table, start_run,
    write_parquet,
};
use gridiron_etl::pregame::{PregameAssembler, PregameInputs};
use gridiron_etl::team_strength::{TeamStrengthEngine, ratings_to_frame};
use gridiron_etl::{logging, tables, teams};

const RATINGS_TABLE: &str = "team_strength";
const PREGAME_TABLE: &str = "pregame_features";

#[derive(Parser)]
#[command(name = "gridiron_etl")]
#[command(about = "NFL team-strength ratings and pregame features", long_about = None)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the SQLite warehouse and only write parquet
    #[arg(long)]
    no_db: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute weekly team-strength ratings from play-by-play
    Ratings {
        /// Play-by-play parquet (default: <data_dir>/plays.parquet)
        #[arg(long)]
        plays: Option<PathBuf>,
        /// Schedule parquet (default: <data_dir>/games.parquet when present)
        #[arg(long)]
        games: Option<PathBuf>,
        /// First season to publish
        #[arg(long)]
        start: Option<i32>,
        /// Last season to publish
        #[arg(long)]
        end: Option<i32>,
    },
    /// Assemble the pregame feature table for a season range
    Pregame {
        #[arg(long)]
        start: i32,
        #[arg(long)]
        end: i32,
    },
    /// Write the effective configuration as JSON
    Config {
        #[arg(long, default_value = "gridiron.json")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();
    let config = PipelineConfig::load(cli.config.as_deref())?;
    info!(
        data_dir = %config.data_dir.display(),
        team_aliases = teams::TEAM_ALIAS_VERSION,
        "configuration loaded"
    );

    match cli.command {
        Commands::Ratings {
            plays,
            games,
            start,
            end,
        } => run_ratings(&config, cli.no_db, plays, games, start, end),
        Commands::Pregame { start, end } => run_pregame(&config, cli.no_db, start, end),
        Commands::Config { out } => {
            config.save(&out)?;
            info!(path = %out.display(), "config written");
            Ok(())
        }
    }
}

fn publish(
    config: &PipelineConfig,
    no_db: bool,
    table: &str,
    frame: &Frame,
    keys: &[&str],
    params_version: Option<&str>,
) -> Result<()> {
    write_parquet(&config.data_dir.join(format!("{table}.parquet")), frame)?;
    if no_db {
        return Ok(());
    }
    let mut conn = open_db(&config.db_path)?;
    let run_id = start_run(&conn, table, params_version)?;
    let rows = replace_table(&mut conn, table, frame, keys)?;
    finish_run(&conn, run_id, rows)?;
    Ok(())
}

fn run_ratings(
    config: &PipelineConfig,
    no_db: bool,
    plays_path: Option<PathBuf>,
    games_path: Option<PathBuf>,
    start: Option<i32>,
    end: Option<i32>,
) -> Result<()> {
    let plays_path = plays_path.unwrap_or_else(|| config.data_dir.join("plays.parquet"));
    let games_frame = match games_path {
        Some(path) => Some(read_parquet(&path)?),
        None => read_parquet_if_exists(&config.data_dir.join("games.parquet"))?,
    };
    let games = games_frame
        .as_ref()
        .map(tables::load_games)
        .transpose()
        .context("load schedule")?;
    let plays = tables::load_plays(&read_parquet(&plays_path)?, games.is_some())
        .context("load plays")?;

    let engine = TeamStrengthEngine::new(config.strength);
    let mut ratings = engine.run(&plays, games.as_deref())?;
    ratings.retain(|r| start.is_none_or(|s| r.season >= s) && end.is_none_or(|e| r.season <= e));

    let frame = ratings_to_frame(&ratings)?;
    let version = engine.params().version_tag();
    publish(
        config,
        no_db,
        RATINGS_TABLE,
        &frame,
        &["season", "week", "team"],
        Some(&version),
    )
}

fn optional_table<T>(
    dir: &Path,
    name: &str,
    load: impl Fn(&Frame) -> gridiron_etl::PipelineResult<Vec<T>>,
) -> Result<Vec<T>> {
    let path = dir.join(format!("{name}.parquet"));
    match read_parquet_if_exists(&path)? {
        Some(frame) => load(&frame).with_context(|| format!("load {}", path.display())),
        None => {
            info!(table = name, "input table absent; family left empty");
            Ok(Vec::new())
        }
    }
}

fn run_pregame(config: &PipelineConfig, no_db: bool, start: i32, end: i32) -> Result<()> {
    if start > end {
        bail!("--start {start} is after --end {end}");
    }
    let dir = config.data_dir.as_path();
    let games = tables::load_games(&read_parquet(&dir.join("games.parquet"))?)
        .context("load schedule")?;
    let ratings_frame = read_parquet(&dir.join(format!("{RATINGS_TABLE}.parquet")))?;
    let ratings = tables::load_ratings(&ratings_frame).context("load team-strength ratings")?;

    let injuries = optional_table(dir, "injuries", tables::load_injuries)?;
    let starters = optional_table(dir, "depth_charts", tables::load_starters)?;
    let contracts = optional_table(dir, "contracts", tables::load_contracts)?;
    let qb_seasons = optional_table(dir, "qb_seasons", tables::load_qb_seasons)?;
    let snaps = optional_table(dir, "snap_counts", tables::load_snaps)?;
    let offense = optional_table(dir, "offense_weekly", |f| {
        tables::load_team_week_stats(f, "offense_weekly")
    })?;
    let defense = optional_table(dir, "defense_weekly", |f| {
        tables::load_team_week_stats(f, "defense_weekly")
    })?;
    let stability = optional_table(dir, "stability", tables::load_stability)?;
    let rankings = optional_table(dir, "rankings", tables::load_rankings)?;

    let inputs = PregameInputs {
        games: &games,
        ratings: &ratings,
        injuries: &injuries,
        starters: &starters,
        contracts: &contracts,
        qb_seasons: &qb_seasons,
        snaps: &snaps,
        offense: &offense,
        defense: &defense,
        stability: &stability,
        rankings: &rankings,
    };
    let table = PregameAssembler::new(config.assembler).assemble(&inputs, start..=end)?;
    publish(config, no_db, PREGAME_TABLE, table.frame(), &["game_id"], None)
}
