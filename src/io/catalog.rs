//! Catalog readers.
//!
//! - `.sou` spool extracts (VLBI solution positions)
//! - ICRF2 data files
//! - generic CSV catalogs (see `io::ingest`)
//!
//! All readers return positions in radians and uncertainties in mas, with the RA
//! uncertainty on RA itself (not scaled by `cos(dec)`).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{CatalogEntry, CatalogFormat, SessionStats};
use crate::error::AppError;
use crate::io::ingest::{CatalogData, RowError, check_corr, check_error, read_catalog_csv};

/// Value written by the solution software when a field is unavailable.
const FILLER: char = '*';

/// Byte ranges of the first/last session dates in a `.sou` record.
const SOU_FIRST_SESSION: std::ops::Range<usize> = 181..191;
const SOU_LAST_SESSION: std::ops::Range<usize> = 202..212;

/// Load a catalog file of the given format.
pub fn load_catalog(path: &Path, format: CatalogFormat) -> Result<CatalogData, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open catalog '{}': {e}", path.display()))
    })?;
    read_catalog(file, format)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

/// Read a catalog of the given format from any reader.
pub fn read_catalog<R: Read>(mut input: R, format: CatalogFormat) -> Result<CatalogData, AppError> {
    let data = match format {
        CatalogFormat::Csv => return read_catalog_csv(input),
        CatalogFormat::Sou | CatalogFormat::Icrf2 => {
            let mut text = String::new();
            input
                .read_to_string(&mut text)
                .map_err(|e| AppError::new(2, format!("Failed to read catalog: {e}")))?;
            if format == CatalogFormat::Sou {
                parse_sou(&text)
            } else {
                parse_icrf2(&text)
            }
        }
    };

    if data.entries.is_empty() {
        return Err(AppError::new(3, "No valid catalog entries in input."));
    }
    Ok(data)
}

/// Parse the text of a `.sou` file.
///
/// Lines starting with `#` are comments. Each record is whitespace-tokenized:
/// name at token 1, RA `hh_mm_ss.s` at 3, RA error (mas) at 5, Dec `dd_mm_ss.s` at 7,
/// Dec error (mas) at 9, correlation at 11, and the observation and session counts
/// at 13, 15, 17, 19. The first/last session dates sit at fixed columns.
pub fn parse_sou(text: &str) -> CatalogData {
    parse_lines(text, parse_sou_record)
}

/// Parse the text of an ICRF2 data file.
///
/// Whitespace columns: `_, name, _, flag, RAh, RAm, RAs, Decd, Decm, Decs, e_RA (s),
/// e_Dec (arcsec), corr`.
pub fn parse_icrf2(text: &str) -> CatalogData {
    parse_lines(text, parse_icrf2_record)
}

fn parse_lines(text: &str, parse: fn(&str) -> Result<CatalogEntry, String>) -> CatalogData {
    let mut entries = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        rows_read += 1;
        match parse(line) {
            Ok(entry) => entries.push(entry),
            Err(message) => row_errors.push(RowError {
                line: idx + 1,
                name: line.split_whitespace().nth(1).map(str::to_string),
                message,
            }),
        }
    }

    CatalogData {
        entries,
        row_errors,
        rows_read,
    }
}

fn parse_sou_record(line: &str) -> Result<CatalogEntry, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 20 {
        return Err(format!("Expected at least 20 fields, found {}.", tokens.len()));
    }

    let name = tokens[1].to_string();
    let ra = parse_sexagesimal(tokens[3], "RA")?;
    let ra_err = parse_field(tokens[5], "RA error")?;
    let dec = parse_sexagesimal(tokens[7], "Dec")?;
    let dec_err = parse_field(tokens[9], "Dec error")?;
    let corr = parse_field(tokens[11], "correlation")?;

    let obs_used = parse_count(tokens[13], "used observations")?;
    let obs_total = parse_count(tokens[15], "total observations")?;
    let sessions_used = parse_count(tokens[17], "used sessions")?;
    let sessions_total = parse_count(tokens[19], "total sessions")?;

    if !(0.0..=90.0).contains(&dec.abs()) {
        return Err(format!("Dec {dec} deg outside [-90, 90]."));
    }
    check_error("RA error", ra_err)?;
    check_error("Dec error", dec_err)?;
    check_corr(corr)?;

    Ok(CatalogEntry {
        name,
        ra: (ra * 15.0).to_radians(),
        dec: dec.to_radians(),
        ra_err,
        dec_err,
        corr,
        flag: None,
        sessions: Some(SessionStats {
            obs_used,
            obs_total,
            sessions_used,
            sessions_total,
            first_session: session_date(line, SOU_FIRST_SESSION),
            last_session: session_date(line, SOU_LAST_SESSION),
        }),
    })
}

fn parse_icrf2_record(line: &str) -> Result<CatalogEntry, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 13 {
        return Err(format!("Expected at least 13 fields, found {}.", tokens.len()));
    }

    let name = tokens[1].to_string();
    let flag = tokens[3].to_string();

    let ra_h = parse_field(tokens[4], "RA hours")?;
    let ra_m = parse_field(tokens[5], "RA minutes")?;
    let ra_s = parse_field(tokens[6], "RA seconds")?;
    let dec_d = parse_field(tokens[7], "Dec degrees")?;
    let dec_m = parse_field(tokens[8], "Dec minutes")?;
    let dec_s = parse_field(tokens[9], "Dec seconds")?;
    // Seconds of time and arcseconds to mas.
    let ra_err = parse_field(tokens[10], "RA error")? * 15.0e3;
    let dec_err = parse_field(tokens[11], "Dec error")? * 1.0e3;
    let corr = parse_field(tokens[12], "correlation")?;

    // "-00" parses as +0, so the sign comes from the text.
    let sign = if tokens[7].starts_with('-') { -1.0 } else { 1.0 };
    let ra_hours = ra_h + ra_m / 60.0 + ra_s / 3600.0;
    let dec_deg = sign * (dec_d.abs() + dec_m / 60.0 + dec_s / 3600.0);

    if !(0.0..24.0).contains(&ra_hours) {
        return Err(format!("RA {ra_hours} h outside [0, 24)."));
    }
    if !(-90.0..=90.0).contains(&dec_deg) {
        return Err(format!("Dec {dec_deg} deg outside [-90, 90]."));
    }
    check_error("RA error", ra_err)?;
    check_error("Dec error", dec_err)?;
    check_corr(corr)?;

    Ok(CatalogEntry {
        name,
        ra: (ra_hours * 15.0).to_radians(),
        dec: dec_deg.to_radians(),
        ra_err,
        dec_err,
        corr,
        flag: Some(flag),
        sessions: None,
    })
}

/// `[-]a_b_c.c` to `a + b/60 + c/3600`, signed by the leading character.
fn parse_sexagesimal(token: &str, what: &str) -> Result<f64, String> {
    let parts: Vec<&str> = token.split('_').collect();
    let [a, b, c] = parts.as_slice() else {
        return Err(format!("Invalid {what} '{token}': expected a_b_c."));
    };
    let a: f64 = a
        .parse()
        .map_err(|_| format!("Invalid {what} '{token}'."))?;
    let b: f64 = b
        .parse()
        .map_err(|_| format!("Invalid {what} '{token}'."))?;
    let c: f64 = c
        .parse()
        .map_err(|_| format!("Invalid {what} '{token}'."))?;

    let sign = if token.starts_with('-') { -1.0 } else { 1.0 };
    Ok(sign * (a.abs() + b / 60.0 + c / 3600.0))
}

fn parse_field(token: &str, what: &str) -> Result<f64, String> {
    if token.starts_with(FILLER) {
        return Ok(0.0);
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid {what} '{token}'.")),
    }
}

fn parse_count(token: &str, what: &str) -> Result<u32, String> {
    if token.starts_with(FILLER) {
        return Ok(0);
    }
    token
        .parse::<u32>()
        .map_err(|_| format!("Invalid {what} '{token}'."))
}

fn session_date(line: &str, cols: std::ops::Range<usize>) -> Option<NaiveDate> {
    let text = line.get(cols)?.trim();
    NaiveDate::parse_from_str(text, "%Y.%m.%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Place each `(column, text)` at its 1-based column of a blank record.
    fn fixed_line(fields: &[(usize, &str)]) -> String {
        let mut buf = vec![b' '; 212];
        for (col, text) in fields {
            buf[col - 1..col - 1 + text.len()].copy_from_slice(text.as_bytes());
        }
        String::from_utf8(buf).unwrap()
    }

    fn sou_record(name: &str, ra: &str, dec: &str, ra_err: &str, corr: &str) -> String {
        fixed_line(&[
            (1, "SOU_GCO:"),
            (11, name),
            (21, "RA:"),
            (25, ra),
            (43, "+-"),
            (46, ra_err),
            (57, "Dec:"),
            (62, dec),
            (80, "+-"),
            (83, "    0.2500"),
            (94, "Cor:"),
            (99, corr),
            (106, "Obs_used:"),
            (116, "   1520"),
            (124, "Obs_tot:"),
            (133, "   1600"),
            (141, "Ses_used:"),
            (151, "   42"),
            (157, "Ses_tot:"),
            (166, "   45"),
            (172, "Date_beg:"),
            (182, "1994.08.03"),
            (193, "Date_end:"),
            (203, "2017.11.20"),
        ])
    }

    #[test]
    fn sou_record_fields() {
        let text = format!(
            "# GETPAR_SOU format version 1.0\n{}\n{}\n",
            sou_record("0000+212", "00_03_18.67411012", " 21_30_47.9617020", "    0.1000", "0.1234"),
            sou_record("0003-066", "00_06_13.89288024", "-06_23_35.3353226", "    0.3000", "-0.050"),
        );
        let data = parse_sou(&text);
        assert!(data.row_errors.is_empty(), "{:?}", data.row_errors);
        assert_eq!(data.entries.len(), 2);

        let a = &data.entries[0];
        assert_eq!(a.name, "0000+212");
        let ra_deg: f64 = (0.0 + 3.0 / 60.0 + 18.674_110_12 / 3600.0) * 15.0;
        assert!((a.ra - ra_deg.to_radians()).abs() < 1e-15);
        let dec_deg: f64 = 21.0 + 30.0 / 60.0 + 47.961_702 / 3600.0;
        assert!((a.dec - dec_deg.to_radians()).abs() < 1e-15);
        assert_eq!(a.ra_err, 0.1);
        assert_eq!(a.dec_err, 0.25);
        assert_eq!(a.corr, 0.1234);
        let s = a.sessions.as_ref().unwrap();
        assert_eq!((s.obs_used, s.obs_total, s.sessions_used, s.sessions_total), (1520, 1600, 42, 45));
        assert_eq!(s.first_session, NaiveDate::from_ymd_opt(1994, 8, 3));
        assert_eq!(s.last_session, NaiveDate::from_ymd_opt(2017, 11, 20));

        let b = &data.entries[1];
        assert!(b.dec < 0.0);
        assert_eq!(b.corr, -0.05);
    }

    #[test]
    fn sou_filler_error_is_rejected_as_non_positive() {
        // A filler parses as 0, which is not a usable uncertainty.
        let text = sou_record("0003-066", "00_06_13.89288024", "-06_23_35.3353226", "********", "0.0000");
        let data = parse_sou(&text);
        assert!(data.entries.is_empty());
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].name.as_deref(), Some("0003-066"));
        assert!(data.row_errors[0].message.contains("RA error"));
    }

    #[test]
    fn sou_short_record_is_a_row_error() {
        let data = parse_sou("SOU_GCO:  0000+212  RA: 00_03_18.67\n");
        assert!(data.entries.is_empty());
        assert_eq!(data.row_errors[0].line, 1);
    }

    #[test]
    fn icrf2_negative_zero_degrees() {
        let text = "\
ICRF J000435.6-473619 0004-478   N 00 04 35.65550384 -47 36 19.6037899 0.00000506 0.0000909 -0.033
ICRF J001031.0+105829 0007+106   D 00 10 31.00590630 +10 58 29.5041260 0.00000193 0.0000294  0.071
ICRF J002945.8-003512 0027-008   V 00 29 45.89702000 -00 35 12.7501000 0.00001200 0.0003100  0.210
";
        let data = parse_icrf2(text);
        assert!(data.row_errors.is_empty(), "{:?}", data.row_errors);
        assert_eq!(data.entries.len(), 3);

        let first = &data.entries[0];
        assert_eq!(first.name, "J000435.6-473619");
        assert_eq!(first.flag.as_deref(), Some("N"));
        assert!((first.ra_err - 0.000_005_06 * 15.0e3).abs() < 1e-12);
        assert!((first.dec_err - 0.090_9).abs() < 1e-12);

        let third = &data.entries[2];
        let expected = -(35.0 / 60.0 + 12.7501 / 3600.0_f64);
        assert!((third.dec - expected.to_radians()).abs() < 1e-15);
        assert!(data.entries[1].dec > 0.0);
    }

    #[test]
    fn read_catalog_dispatches_and_rejects_empty() {
        let csv = "name,ra_deg,dec_deg,ra_err_mas,dec_err_mas\nA,1,2,0.1,0.1\n";
        let data = read_catalog(csv.as_bytes(), CatalogFormat::Csv).unwrap();
        assert_eq!(data.entries.len(), 1);

        let err = read_catalog("# only a comment\n".as_bytes(), CatalogFormat::Sou).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
