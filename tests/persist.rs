use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;

use gridiron_etl::frame::{Cell, Frame};
use gridiron_etl::persist::{
    finish_run, init_schema, read_parquet, read_parquet_if_exists, replace_table, start_run,
    write_parquet,
};

fn sample(rows: &[(&str, i64, Option<f64>)]) -> Frame {
    let names: Vec<String> = ["game_id", "season", "diff_rating_net", "played"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows = rows
        .iter()
        .map(|(id, season, diff)| {
            vec![
                Cell::Text(id.to_string()),
                Cell::Int(*season),
                Cell::from_opt_f64(*diff),
                Cell::Bool(diff.is_some()),
            ]
        })
        .collect();
    Frame::from_rows(&names, rows).expect("frame")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gridiron_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn memory_db() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory db");
    init_schema(&conn).expect("schema");
    conn
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
        .expect("count")
}

#[test]
fn parquet_round_trip_keeps_types_and_nulls() {
    let dir = scratch_dir("roundtrip");
    let path = dir.join("pregame_features.parquet");
    let frame = sample(&[("2023_01_DET_KC", 2023, Some(0.25)), ("2023_01_BUF_NYJ", 2023, None)]);

    write_parquet(&path, &frame).expect("write");
    assert!(path.exists());
    assert!(!dir.join("pregame_features.parquet.tmp").exists());

    let back = read_parquet(&path).expect("read");
    assert_eq!(back.names(), frame.names());
    assert_eq!(back.n_rows(), 2);
    assert_eq!(back.str_at("game_id", 0), Some("2023_01_DET_KC"));
    assert_eq!(back.i64_at("season", 1), Some(2023));
    assert_eq!(back.f64_at("diff_rating_net", 0), Some(0.25));
    assert!(back.cell("diff_rating_net", 1).is_null());
    assert_eq!(back.bool_at("played", 0), Some(true));
    assert_eq!(back.bool_at("played", 1), Some(false));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn absent_parquet_reads_as_none() {
    let dir = scratch_dir("absent");
    let missing = read_parquet_if_exists(&dir.join("injuries.parquet")).expect("no error");
    assert!(missing.is_none());
}

#[test]
fn replace_table_swaps_contents() {
    let mut conn = memory_db();
    let first = sample(&[("a", 2022, Some(1.0)), ("b", 2022, None), ("c", 2023, Some(-0.5))]);
    assert_eq!(replace_table(&mut conn, "pregame_features", &first, &["game_id"]).expect("first"), 3);
    assert_eq!(count(&conn, "pregame_features"), 3);

    let second = sample(&[("d", 2024, Some(0.1))]);
    replace_table(&mut conn, "pregame_features", &second, &["game_id"]).expect("second");
    assert_eq!(count(&conn, "pregame_features"), 1);
    let id: String = conn
        .query_row("SELECT game_id FROM pregame_features", [], |r| r.get(0))
        .expect("row");
    assert_eq!(id, "d");
}

#[test]
fn duplicate_keys_roll_back_the_replacement() {
    let mut conn = memory_db();
    let good = sample(&[("a", 2023, Some(1.0)), ("b", 2023, Some(2.0))]);
    replace_table(&mut conn, "pregame_features", &good, &["game_id"]).expect("good");

    let fanned_out = sample(&[("x", 2023, Some(1.0)), ("x", 2023, Some(2.0))]);
    assert!(replace_table(&mut conn, "pregame_features", &fanned_out, &["game_id"]).is_err());
    assert_eq!(count(&conn, "pregame_features"), 2);
}

#[test]
fn unknown_key_column_is_rejected() {
    let mut conn = memory_db();
    let frame = sample(&[("a", 2023, None)]);
    assert!(replace_table(&mut conn, "team_strength", &frame, &["team"]).is_err());
}

#[test]
fn runs_are_recorded() {
    let conn = memory_db();
    let run_id = start_run(&conn, "team_strength", Some("srs_epa_lite_v1|test")).expect("start");
    finish_run(&conn, run_id, 64).expect("finish");

    let (table, version, rows, finished): (String, Option<String>, i64, Option<String>) = conn
        .query_row(
            "SELECT table_name, params_version, rows_written, finished_at FROM pipeline_runs WHERE run_id = ?1",
            [run_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .expect("run row");
    assert_eq!(table, "team_strength");
    assert_eq!(version.as_deref(), Some("srs_epa_lite_v1|test"));
    assert_eq!(rows, 64);
    assert!(finished.is_some());
}
