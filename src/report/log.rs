//! Plain-text fit log.
//!
//! The log is written to any `std::io::Write` sink, one block per fit. Every line
//! starts with `#` so a log can be concatenated with data files.

use std::io::{self, Write};

use crate::fit::{AxisStats, Deg01Fit};
use crate::math::WeightedStats;

/// Write the log block of one fit.
pub fn write_fit_log<W: Write>(out: &mut W, fit: &Deg01Fit) -> io::Result<()> {
    writeln!(out, "# VSH deg01 fit: mode={}, elim={}", fit.mode, fit.elim)?;

    write_stats(out, "apriori", &fit.apriori)?;

    for record in &fit.history {
        writeln!(out, "# Number of sample: {}", record.n_kept)?;
    }
    if !fit.degenerate.is_empty() {
        writeln!(out, "# Degenerate correlations: {}", fit.degenerate.len())?;
    }

    let names = fit.mode.param_names();
    writeln!(out, "# Estimates (uas)")?;
    for ((name, value), sigma) in names.iter().zip(&fit.solution.params).zip(&fit.solution.sigmas) {
        writeln!(out, "#   {name:<3} {value:+10.3} +/- {sigma:8.3}")?;
    }

    writeln!(out, "# Correlation coefficients")?;
    write!(out, "#    ")?;
    for name in names {
        write!(out, " {name:>6}")?;
    }
    writeln!(out)?;
    for (name, row) in names.iter().zip(&fit.solution.correlation) {
        write!(out, "#   {name:<3}")?;
        for c in row {
            write!(out, " {c:+6.2}")?;
        }
        writeln!(out)?;
    }

    write_stats(out, "posteriori", &fit.posteriori)?;
    if fit.reduced_chi2.is_finite() {
        writeln!(out, "# posteriori reduced Chi-square: {:10.3}", fit.reduced_chi2)?;
    } else {
        writeln!(out, "# posteriori reduced Chi-square: undefined (no degrees of freedom)")?;
    }
    writeln!(out, "# Number of outliers: {}", fit.outliers.len())?;
    writeln!(out, "#")?;

    Ok(())
}

fn write_stats<W: Write>(out: &mut W, label: &str, stats: &AxisStats) -> io::Result<()> {
    writeln!(out, "# {label} statistics (weighted)")?;
    write_axis(out, "RA", stats.ra.as_ref())?;
    write_axis(out, "Dec", stats.dec.as_ref())
}

fn write_axis<W: Write>(out: &mut W, axis: &str, stats: Option<&WeightedStats>) -> io::Result<()> {
    let Some(s) = stats else {
        return writeln!(out, "#   {axis:>3}: n/a");
    };
    writeln!(out, "#  {:>15}: {:10.3} uas", format!("mean for {axis}"), s.mean)?;
    writeln!(out, "#  {:>15}: {:10.3} uas", format!("wrms for {axis}"), s.wrms)?;
    writeln!(out, "#  {:>15}: {:10.3} uas", format!("std for {axis}"), s.std)
}
