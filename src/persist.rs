//! Whole-table reads and writes: parquet files and the SQLite warehouse.
//!
//! Both sinks are all-or-nothing. Parquet is written to a temporary file and renamed
//! into place; a warehouse table is dropped and recreated inside one transaction.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, Utc};
use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::parser::parse_message_type;
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};
use tracing::{debug, info};

use crate::frame::{Cell, Frame};

/// Storage type of one column, the widest type among its non-null cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnKind {
    Bool,
    Int,
    Float,
    Text,
}

fn column_kind(cells: &[Cell]) -> ColumnKind {
    cells
        .iter()
        .filter_map(|c| match c {
            Cell::Null => None,
            Cell::Bool(_) => Some(ColumnKind::Bool),
            Cell::Int(_) => Some(ColumnKind::Int),
            Cell::Float(_) => Some(ColumnKind::Float),
            Cell::Text(_) => Some(ColumnKind::Text),
        })
        .max()
        .unwrap_or(ColumnKind::Text)
}

fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null => None,
        Cell::Bool(b) => Some(b.to_string()),
        Cell::Int(v) => Some(v.to_string()),
        Cell::Float(v) => Some(v.to_string()),
        Cell::Text(s) => Some(s.clone()),
    }
}

fn is_present(cell: &Cell, kind: ColumnKind) -> bool {
    match kind {
        ColumnKind::Bool => cell.as_bool().is_some(),
        ColumnKind::Int => cell.as_i64().is_some(),
        ColumnKind::Float => cell.as_f64().is_some(),
        ColumnKind::Text => !cell.is_null(),
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn field_to_cell(field: &Field) -> Cell {
    match field {
        Field::Null => Cell::Null,
        Field::Bool(b) => Cell::Bool(*b),
        Field::Byte(v) => Cell::Int(i64::from(*v)),
        Field::Short(v) => Cell::Int(i64::from(*v)),
        Field::Int(v) => Cell::Int(i64::from(*v)),
        Field::Long(v) => Cell::Int(*v),
        Field::UByte(v) => Cell::Int(i64::from(*v)),
        Field::UShort(v) => Cell::Int(i64::from(*v)),
        Field::UInt(v) => Cell::Int(i64::from(*v)),
        Field::ULong(v) => i64::try_from(*v).map(Cell::Int).unwrap_or(Cell::Null),
        Field::Float(v) => Cell::from_opt_f64(Some(f64::from(*v))),
        Field::Double(v) => Cell::from_opt_f64(Some(*v)),
        Field::Str(s) => Cell::Text(s.clone()),
        Field::Bytes(b) => b
            .as_utf8()
            .map(|s| Cell::Text(s.to_string()))
            .unwrap_or(Cell::Null),
        Field::Date(days) => NaiveDate::from_num_days_from_ce_opt(days + 719_163)
            .map(|d| Cell::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Cell::Null),
        Field::TimestampMillis(ms) => {
            timestamp_cell(ms.div_euclid(1_000), ms.rem_euclid(1_000) * 1_000_000)
        }
        Field::TimestampMicros(us) => {
            timestamp_cell(us.div_euclid(1_000_000), us.rem_euclid(1_000_000) * 1_000)
        }
        other => Cell::Text(other.to_string()),
    }
}

fn timestamp_cell(secs: i64, nanos: i64) -> Cell {
    u32::try_from(nanos)
        .ok()
        .and_then(|n| DateTime::<Utc>::from_timestamp(secs, n))
        .map(|t| Cell::Text(t.to_rfc3339()))
        .unwrap_or(Cell::Null)
}

/// Reads a flat parquet file into a [`Frame`].
pub fn read_parquet(path: &Path) -> Result<Frame> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let names: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); names.len()];
    let iter = reader
        .get_row_iter(None)
        .with_context(|| format!("iterate rows of {}", path.display()))?;
    for row in iter {
        let row = row.with_context(|| format!("decode row of {}", path.display()))?;
        for (idx, (_, field)) in row.get_column_iter().enumerate() {
            let Some(column) = columns.get_mut(idx) else {
                bail!("{}: row wider than schema", path.display());
            };
            column.push(field_to_cell(field));
        }
    }

    let mut frame = Frame::new();
    for (name, cells) in names.iter().zip(columns) {
        frame
            .push_column(name, cells)
            .with_context(|| format!("assemble {}", path.display()))?;
    }
    debug!(path = %path.display(), rows = frame.n_rows(), cols = frame.n_cols(), "parquet read");
    Ok(frame)
}

/// Missing file reads as `None`; any other failure is an error.
pub fn read_parquet_if_exists(path: &Path) -> Result<Option<Frame>> {
    if !path.exists() {
        return Ok(None);
    }
    read_parquet(path).map(Some)
}

/// Writes `frame` with an inferred schema (every column OPTIONAL).
pub fn write_parquet(path: &Path, frame: &Frame) -> Result<()> {
    if frame.n_cols() == 0 {
        bail!("refusing to write {} with no columns", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }

    let kinds: Vec<ColumnKind> = frame.columns().map(|(_, c)| column_kind(c)).collect();
    let mut message = String::from("message gridiron {\n");
    for ((name, _), kind) in frame.columns().zip(&kinds) {
        if !is_identifier(name) {
            bail!("column name `{name}` is not a plain identifier");
        }
        let physical = match kind {
            ColumnKind::Bool => "BOOLEAN",
            ColumnKind::Int => "INT64",
            ColumnKind::Float => "DOUBLE",
            ColumnKind::Text => "BYTE_ARRAY",
        };
        let annotation = if *kind == ColumnKind::Text { " (UTF8)" } else { "" };
        message.push_str(&format!("  OPTIONAL {physical} {name}{annotation};\n"));
    }
    message.push('}');
    let schema = Arc::new(parse_message_type(&message).context("build parquet schema")?);
    let props = Arc::new(WriterProperties::builder().build());

    let tmp = tmp_path(path);
    let file = fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    let mut writer =
        SerializedFileWriter::new(file, schema, props).context("open parquet writer")?;
    let mut row_group = writer.next_row_group().context("open row group")?;
    for ((name, cells), kind) in frame.columns().zip(&kinds) {
        let mut column = row_group
            .next_column()
            .context("open column writer")?
            .ok_or_else(|| anyhow!("schema has fewer columns than the frame at `{name}`"))?;
        let defs: Vec<i16> = cells
            .iter()
            .map(|c| i16::from(is_present(c, *kind)))
            .collect();
        let written = match kind {
            ColumnKind::Bool => {
                let values: Vec<bool> = cells.iter().filter_map(Cell::as_bool).collect();
                column
                    .typed::<BoolType>()
                    .write_batch(&values, Some(&defs), None)
            }
            ColumnKind::Int => {
                let values: Vec<i64> = cells.iter().filter_map(Cell::as_i64).collect();
                column
                    .typed::<Int64Type>()
                    .write_batch(&values, Some(&defs), None)
            }
            ColumnKind::Float => {
                let values: Vec<f64> = cells.iter().filter_map(Cell::as_f64).collect();
                column
                    .typed::<DoubleType>()
                    .write_batch(&values, Some(&defs), None)
            }
            ColumnKind::Text => {
                let values: Vec<ByteArray> = cells
                    .iter()
                    .filter_map(cell_text)
                    .map(|s| ByteArray::from(s.as_str()))
                    .collect();
                column
                    .typed::<ByteArrayType>()
                    .write_batch(&values, Some(&defs), None)
            }
        };
        written.with_context(|| format!("write column `{name}`"))?;
        column.close().with_context(|| format!("close column `{name}`"))?;
    }
    row_group.close().context("close row group")?;
    writer.close().context("finish parquet file")?;

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    info!(path = %path.display(), rows = frame.n_rows(), cols = frame.n_cols(), "parquet written");
    Ok(())
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            table_name TEXT NOT NULL,
            params_version TEXT NULL,
            rows_written INTEGER NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn start_run(conn: &Connection, table: &str, params_version: Option<&str>) -> Result<i64> {
    conn.execute(
        "INSERT INTO pipeline_runs(started_at, finished_at, table_name, params_version, rows_written)
         VALUES (?1, NULL, ?2, ?3, 0)",
        params![Utc::now().to_rfc3339(), table, params_version],
    )
    .context("insert pipeline run")?;
    Ok(conn.last_insert_rowid())
}

pub fn finish_run(conn: &Connection, run_id: i64, rows: usize) -> Result<()> {
    conn.execute(
        "UPDATE pipeline_runs SET finished_at = ?1, rows_written = ?2 WHERE run_id = ?3",
        params![Utc::now().to_rfc3339(), rows as i64, run_id],
    )
    .context("update pipeline run")?;
    Ok(())
}

fn cell_value(cell: &Cell, kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Bool | ColumnKind::Int => cell.as_i64().map(Value::Integer),
        ColumnKind::Float => cell.as_f64().map(Value::Real),
        ColumnKind::Text => cell_text(cell).map(Value::Text),
    }
    .unwrap_or(Value::Null)
}

/// Replaces `table` wholesale with the contents of `frame`. A unique index over
/// `key_columns` guards against fan-out.
pub fn replace_table(
    conn: &mut Connection,
    table: &str,
    frame: &Frame,
    key_columns: &[&str],
) -> Result<usize> {
    if !is_identifier(table) {
        bail!("table name `{table}` is not a plain identifier");
    }
    if frame.n_cols() == 0 {
        bail!("refusing to replace `{table}` with a frame without columns");
    }
    for (name, _) in frame.columns() {
        if !is_identifier(name) {
            bail!("column name `{name}` is not a plain identifier");
        }
    }
    for key in key_columns {
        if !frame.has_column(key) {
            bail!("key column `{key}` is not in the frame for `{table}`");
        }
    }

    let kinds: Vec<ColumnKind> = frame.columns().map(|(_, c)| column_kind(c)).collect();
    let definitions: Vec<String> = frame
        .columns()
        .zip(&kinds)
        .map(|((name, _), kind)| {
            let sql_type = match kind {
                ColumnKind::Bool | ColumnKind::Int => "INTEGER",
                ColumnKind::Float => "REAL",
                ColumnKind::Text => "TEXT",
            };
            format!("\"{name}\" {sql_type}")
        })
        .collect();
    let placeholders: Vec<String> = (1..=frame.n_cols()).map(|i| format!("?{i}")).collect();

    let tx = conn.transaction().context("begin replace transaction")?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS \"{table}\"; CREATE TABLE \"{table}\" ({});",
        definitions.join(", ")
    ))
    .with_context(|| format!("recreate table {table}"))?;
    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO \"{table}\" VALUES ({})",
                placeholders.join(", ")
            ))
            .with_context(|| format!("prepare insert into {table}"))?;
        let columns: Vec<&[Cell]> = frame.columns().map(|(_, c)| c).collect();
        for row in 0..frame.n_rows() {
            let values = columns
                .iter()
                .zip(&kinds)
                .map(|(col, kind)| cell_value(&col[row], *kind));
            stmt.execute(params_from_iter(values))
                .with_context(|| format!("insert row {row} into {table}"))?;
        }
    }
    if !key_columns.is_empty() {
        let keys: Vec<String> = key_columns.iter().map(|k| format!("\"{k}\"")).collect();
        tx.execute_batch(&format!(
            "CREATE UNIQUE INDEX \"idx_{table}_key\" ON \"{table}\"({});",
            keys.join(", ")
        ))
        .with_context(|| format!("index {table} on its key"))?;
    }
    tx.commit().context("commit replace transaction")?;

    info!(table, rows = frame.n_rows(), "warehouse table replaced");
    Ok(frame.n_rows())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widest_kind_wins() {
        assert_eq!(
            column_kind(&[Cell::Int(1), Cell::Null, Cell::Float(0.5)]),
            ColumnKind::Float
        );
        assert_eq!(column_kind(&[Cell::Null]), ColumnKind::Text);
        assert_eq!(column_kind(&[Cell::Bool(true), Cell::Int(3)]), ColumnKind::Int);
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("diff_rating_net"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("drop table"));
    }
}
