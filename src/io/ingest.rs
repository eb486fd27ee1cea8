//! Observation table ingest and validation.
//!
//! Two layouts are supported:
//!
//! - `mrt`: the whitespace-delimited machine-readable tables published with
//!   supernova catalogues. A fixed-size description block precedes the data
//!   and columns are addressed by position.
//! - `csv`: a headered CSV with `z`, `mu` and optional `mu_err` columns
//!   (common aliases accepted).
//!
//! Bad rows are skipped and reported; only a table with no usable rows fails.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::data::compute_stats;
use crate::domain::{DatasetStats, Observation, TableFormat, TableSpec};
use crate::error::AppError;

const Z_ALIASES: &[&str] = &["z", "zcmb", "zhd", "redshift"];
const MU_ALIASES: &[&str] = &["mu", "mu_obs", "distance_modulus"];
const MU_ERR_ALIASES: &[&str] = &["mu_err", "sigma", "dmu"];
const ID_ALIASES: &[&str] = &["id", "name", "sn"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    /// One-based line number in the source file.
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: validated observations + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Open `path` and read it according to `table`.
pub fn load_observations(path: &Path, table: &TableSpec) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open data file '{}': {e}", path.display())))?;

    let data = read_observations(file, table)?;
    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows_used,
        row_errors = data.row_errors.len(),
        "loaded observations"
    );
    Ok(data)
}

/// Read observations from any reader.
pub fn read_observations<R: Read>(reader: R, table: &TableSpec) -> Result<IngestedData, AppError> {
    let (observations, row_errors, rows_read) = match table.format {
        TableFormat::Mrt => read_mrt(reader, table)?,
        TableFormat::Csv => read_csv(reader)?,
    };

    for e in row_errors.iter().take(10) {
        warn!(line = e.line, id = e.id.as_deref().unwrap_or("-"), "skipped row: {}", e.message);
    }
    if row_errors.len() > 10 {
        warn!(more = row_errors.len() - 10, "further rows skipped");
    }

    let rows_used = observations.len();
    if rows_used == 0 {
        return Err(AppError::input("No valid observations remain after validation."));
    }

    let stats = compute_stats(&observations)
        .ok_or_else(|| AppError::input("No valid observations remain after validation."))?;

    Ok(IngestedData {
        observations,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

type Parsed = (Vec<Observation>, Vec<RowError>, usize);

fn read_mrt<R: Read>(reader: R, table: &TableSpec) -> Result<Parsed, AppError> {
    let min_cols = [Some(table.z_col), Some(table.mu_col), table.mu_err_col, table.id_col]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0)
        + 1;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut skipped = 0usize;

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| AppError::io(format!("Failed to read line {line_no}: {e}")))?;
        // Blank lines neither count toward the preamble nor form rows.
        if line.trim().is_empty() {
            continue;
        }
        if skipped < table.skip_lines {
            skipped += 1;
            continue;
        }
        rows_read += 1;

        let fields: Vec<&str> = line.split_whitespace().collect();
        let id = table.id_col.and_then(|c| fields.get(c)).map(|s| s.to_string());

        if fields.len() < min_cols {
            row_errors.push(RowError {
                line: line_no,
                id,
                message: format!("Expected at least {min_cols} columns, found {}.", fields.len()),
            });
            continue;
        }

        let z = fields[table.z_col];
        let mu = fields[table.mu_col];
        let mu_err = table.mu_err_col.map(|c| fields[c]);

        match validate_row(Some(z), Some(mu), mu_err) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError {
                line: line_no,
                id,
                message,
            }),
        }
    }

    debug!(rows_read, skipped = table.skip_lines, "parsed mrt table");
    Ok((observations, row_errors, rows_read))
}

fn read_csv<R: Read>(reader: R) -> Result<Parsed, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let z_name = resolve_column(&header_map, Z_ALIASES)
        .ok_or_else(|| AppError::config(format!("Missing required column: one of {Z_ALIASES:?}")))?;
    let mu_name = resolve_column(&header_map, MU_ALIASES)
        .ok_or_else(|| AppError::config(format!("Missing required column: one of {MU_ALIASES:?}")))?;
    let mu_err_name = resolve_column(&header_map, MU_ERR_ALIASES);
    let id_name = resolve_column(&header_map, ID_ALIASES);

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let id = id_name.and_then(|n| get_optional(&record, &header_map, n)).map(str::to_string);
        let z = get_optional(&record, &header_map, z_name);
        let mu = get_optional(&record, &header_map, mu_name);
        let mu_err = mu_err_name.and_then(|n| get_optional(&record, &header_map, n));

        match validate_row(z, mu, mu_err) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError { line, id, message }),
        }
    }

    Ok((observations, row_errors, rows_read))
}

fn validate_row(z: Option<&str>, mu: Option<&str>, mu_err: Option<&str>) -> Result<Observation, String> {
    let z = parse_f64(z, "z")?;
    let mu = parse_f64(mu, "mu")?;
    // The uncertainty is informational; an unreadable value is dropped, not fatal.
    let mu_err = mu_err.and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite());

    if z <= 0.0 {
        return Err(format!("Redshift must be > 0 (got {z})."));
    }

    Ok(Observation { z, mu, mu_err })
}

fn parse_f64(s: Option<&str>, name: &str) -> Result<f64, String> {
    let s = s.ok_or_else(|| format!("Missing required value: `{name}`"))?;
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{name}` value: '{s}'"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("Non-finite `{name}` value."))
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_column<'a>(header_map: &HashMap<String, usize>, aliases: &[&'a str]) -> Option<&'a str> {
    aliases.iter().copied().find(|a| header_map.contains_key(*a))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A data row with `cols` whitespace-separated fields.
    fn mrt_row(cols: usize, name: &str, z: &str, mu: &str, mu_err: &str) -> String {
        (0..cols)
            .map(|i| match i {
                2 => name.to_string(),
                10 => z.to_string(),
                47 => mu.to_string(),
                48 => mu_err.to_string(),
                _ => "0".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn mrt_table(preamble: usize, rows: &[String]) -> String {
        let mut s = String::new();
        for i in 0..preamble {
            s.push_str(&format!("Description line {i}\n"));
        }
        for r in rows {
            s.push_str(r);
            s.push('\n');
        }
        s
    }

    #[test]
    fn mrt_reads_positional_columns_after_preamble() {
        let text = mrt_table(
            127,
            &[
                mrt_row(62, "SN2001a", "0.0233", "34.72", "0.15"),
                mrt_row(62, "SN2002b", "0.5120", "42.31", "0.21"),
            ],
        );
        let data = read_observations(text.as_bytes(), &TableSpec::default()).unwrap();

        assert_eq!(data.rows_read, 2);
        assert_eq!(data.rows_used, 2);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.observations[0].z, 0.0233);
        assert_eq!(data.observations[0].mu, 34.72);
        assert_eq!(data.observations[0].mu_err, Some(0.15));
        assert_eq!(data.stats.z_max, 0.512);
    }

    #[test]
    fn mrt_preamble_count_ignores_blank_lines() {
        let mut text = String::from("\n\n");
        for i in 0..127 {
            text.push_str(&format!("Description line {i}\n"));
            if i % 40 == 0 {
                text.push_str("   \n");
            }
        }
        text.push_str(&mrt_row(62, "SN2001a", "0.0233", "34.72", "0.15"));
        text.push('\n');

        let data = read_observations(text.as_bytes(), &TableSpec::default()).unwrap();
        assert_eq!(data.rows_read, 1);
        assert_eq!(data.rows_used, 1);
        assert_eq!(data.observations[0].z, 0.0233);
    }

    #[test]
    fn mrt_reports_short_and_invalid_rows() {
        let text = mrt_table(
            127,
            &[
                mrt_row(62, "good", "0.1", "38.2", "0.1"),
                mrt_row(20, "short", "0.2", "40.0", "0.1"),
                mrt_row(62, "zero", "0", "40.0", "0.1"),
                mrt_row(62, "text", "abc", "40.0", "0.1"),
            ],
        );
        let data = read_observations(text.as_bytes(), &TableSpec::default()).unwrap();

        assert_eq!(data.rows_read, 4);
        assert_eq!(data.rows_used, 1);
        assert_eq!(data.row_errors.len(), 3);
        assert_eq!(data.row_errors[0].line, 129);
        assert_eq!(data.row_errors[0].id.as_deref(), Some("short"));
        assert!(data.row_errors[1].message.contains("> 0"));
    }

    #[test]
    fn csv_resolves_aliases_and_strips_bom() {
        let text = "\u{feff}Name,zCMB,MU_OBS,sigma\nA,0.05,36.1,0.2\nB,0.30,41.0,\nC,-0.1,30.0,0.1\n";
        let table = TableSpec {
            format: TableFormat::Csv,
            ..TableSpec::default()
        };
        let data = read_observations(text.as_bytes(), &table).unwrap();

        assert_eq!(data.rows_used, 2);
        assert_eq!(data.observations[0].mu_err, Some(0.2));
        assert_eq!(data.observations[1].mu_err, None);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].line, 4);
        assert_eq!(data.row_errors[0].id.as_deref(), Some("C"));
    }

    #[test]
    fn csv_missing_column_is_config_error() {
        let table = TableSpec {
            format: TableFormat::Csv,
            ..TableSpec::default()
        };
        let err = read_observations("z,flux\n0.1,3\n".as_bytes(), &table).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_usable_rows_is_input_error() {
        let table = TableSpec {
            format: TableFormat::Csv,
            ..TableSpec::default()
        };
        let err = read_observations("z,mu\n0,35\nnan,40\n".as_bytes(), &table).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
