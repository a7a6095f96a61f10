//! CSV ingest and normalization.
//!
//! Two CSV layouts are understood:
//!
//! - catalogs: `name, ra_deg, dec_deg, ra_err_mas, dec_err_mas[, corr][, flag]`
//! - position differences: `name, ra_deg, dec_deg, dra_uas, ddec_uas, dra_err_uas,
//!   ddec_err_uas[, corr]`
//!
//! Headers are matched case-insensitively. Required columns missing from the header
//! are fatal (exit code 2). Bad rows are skipped and reported as `RowError`s; a file
//! with no usable rows is fatal (exit code 3).

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{CatalogEntry, Observation, ObservationSet};
use crate::error::AppError;

const CATALOG_COLUMNS: [&str; 5] = ["name", "ra_deg", "dec_deg", "ra_err_mas", "dec_err_mas"];
const DIFFERENCE_COLUMNS: [&str; 7] = [
    "name",
    "ra_deg",
    "dec_deg",
    "dra_uas",
    "ddec_uas",
    "dra_err_uas",
    "ddec_err_uas",
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub name: Option<String>,
    pub message: String,
}

/// Parsed catalog plus what was skipped.
#[derive(Debug, Clone)]
pub struct CatalogData {
    pub entries: Vec<CatalogEntry>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Parsed position differences plus what was skipped.
#[derive(Debug, Clone)]
pub struct DifferenceData {
    pub observations: ObservationSet,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load a position-difference CSV.
pub fn load_differences(path: &Path) -> Result<DifferenceData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display()))
    })?;
    read_differences_csv(file)
}

/// Read a position-difference CSV from any reader.
pub fn read_differences_csv<R: Read>(input: R) -> Result<DifferenceData, AppError> {
    let (records, header_map) = open_csv(input, &DIFFERENCE_COLUMNS)?;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in records.into_iter().enumerate() {
        let line = record_line(&result, idx);
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    name: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_difference_row(&record, &header_map) {
            Ok(obs) => observations.push(obs),
            Err(message) => row_errors.push(RowError {
                line,
                name: get_optional(&record, &header_map, "name").map(str::to_string),
                message,
            }),
        }
    }

    if observations.is_empty() {
        return Err(AppError::new(3, "No valid position differences in input."));
    }

    Ok(DifferenceData {
        observations: ObservationSet::new(observations),
        row_errors,
        rows_read,
    })
}

/// Read a generic catalog CSV from any reader.
pub fn read_catalog_csv<R: Read>(input: R) -> Result<CatalogData, AppError> {
    let (records, header_map) = open_csv(input, &CATALOG_COLUMNS)?;

    let mut entries = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in records.into_iter().enumerate() {
        let line = record_line(&result, idx);
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    name: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_catalog_row(&record, &header_map) {
            Ok(entry) => entries.push(entry),
            Err(message) => row_errors.push(RowError {
                line,
                name: get_optional(&record, &header_map, "name").map(str::to_string),
                message,
            }),
        }
    }

    if entries.is_empty() {
        return Err(AppError::new(3, "No valid catalog entries in input."));
    }

    Ok(CatalogData {
        entries,
        row_errors,
        rows_read,
    })
}

type Records = Vec<Result<StringRecord, csv::Error>>;

fn open_csv<R: Read>(input: R, required: &[&str]) -> Result<(Records, HashMap<String, usize>), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for name in required {
        if !header_map.contains_key(*name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }

    Ok((reader.records().collect(), header_map))
}

/// 1-based file line of a record. Comment lines are skipped by the reader, so the
/// record index only serves as a fallback when the reader gives no position.
fn record_line(result: &Result<StringRecord, csv::Error>, idx: usize) -> usize {
    let position = match result {
        Ok(record) => record.position(),
        Err(e) => e.position(),
    };
    // Line 1 is the header.
    position.map_or(idx + 2, |p| p.line() as usize)
}

fn parse_difference_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<Observation, String> {
    let name = get_required(record, header_map, "name")?.to_string();
    let ra_deg = get_f64(record, header_map, "ra_deg")?;
    let dec_deg = get_f64(record, header_map, "dec_deg")?;
    let dra = get_f64(record, header_map, "dra_uas")?;
    let ddec = get_f64(record, header_map, "ddec_uas")?;
    let e_dra = get_f64(record, header_map, "dra_err_uas")?;
    let e_ddec = get_f64(record, header_map, "ddec_err_uas")?;
    let corr = get_opt_f64(record, header_map, "corr")?.unwrap_or(0.0);

    check_position(ra_deg, dec_deg)?;
    check_error("dra_err_uas", e_dra)?;
    check_error("ddec_err_uas", e_ddec)?;
    check_corr(corr)?;

    Ok(Observation {
        name,
        ra: ra_deg.to_radians(),
        dec: dec_deg.to_radians(),
        dra,
        ddec,
        e_dra,
        e_ddec,
        corr,
    })
}

fn parse_catalog_row(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
) -> Result<CatalogEntry, String> {
    let name = get_required(record, header_map, "name")?.to_string();
    let ra_deg = get_f64(record, header_map, "ra_deg")?;
    let dec_deg = get_f64(record, header_map, "dec_deg")?;
    let ra_err = get_f64(record, header_map, "ra_err_mas")?;
    let dec_err = get_f64(record, header_map, "dec_err_mas")?;
    let corr = get_opt_f64(record, header_map, "corr")?.unwrap_or(0.0);
    let flag = get_optional(record, header_map, "flag").map(str::to_string);

    check_position(ra_deg, dec_deg)?;
    check_error("ra_err_mas", ra_err)?;
    check_error("dec_err_mas", dec_err)?;
    check_corr(corr)?;

    Ok(CatalogEntry {
        name,
        ra: ra_deg.to_radians(),
        dec: dec_deg.to_radians(),
        ra_err,
        dec_err,
        corr,
        flag,
        sessions: None,
    })
}

pub(crate) fn check_position(ra_deg: f64, dec_deg: f64) -> Result<(), String> {
    if !(0.0..360.0).contains(&ra_deg) {
        return Err(format!("RA {ra_deg} deg outside [0, 360)."));
    }
    if !(-90.0..=90.0).contains(&dec_deg) {
        return Err(format!("Dec {dec_deg} deg outside [-90, 90]."));
    }
    Ok(())
}

pub(crate) fn check_error(field: &str, value: f64) -> Result<(), String> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(format!("`{field}` must be > 0 (got {value})."))
    }
}

pub(crate) fn check_corr(corr: f64) -> Result<(), String> {
    if corr.abs() <= 1.0 {
        Ok(())
    } else {
        Err(format!("Correlation {corr} outside [-1, 1]."))
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
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn get_f64(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<f64, String> {
    parse_f64(name, get_required(record, header_map, name)?)
}

fn get_opt_f64(
    record: &StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<Option<f64>, String> {
    get_optional(record, header_map, name)
        .map(|s| parse_f64(name, s))
        .transpose()
}

fn parse_f64(name: &str, s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}
