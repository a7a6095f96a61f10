//! Terminal summary of a run.

use std::collections::BTreeMap;

use crate::domain::{ElimMode, ElimOptions, FitMode, InputSummary};
use crate::fit::Deg01Fit;

/// Format the full run summary (input stats + one section per fit mode).
pub fn format_run_summary(
    input: &InputSummary,
    fits: &BTreeMap<FitMode, Deg01Fit>,
    elim: &ElimOptions,
) -> String {
    let mut out = String::new();

    out.push_str("=== vsh - degree-1 VSH fit ===\n");
    out.push_str(&format!("Input: {}\n", input.description));
    out.push_str(&format!(
        "Rows: read={} | skipped={}\n",
        input.rows_read, input.rows_skipped
    ));
    if let Some(matched) = input.matched {
        out.push_str(&format!("Common sources: {matched}\n"));
    }
    out.push_str(&format!("Observations: n={}\n", input.n_obs));
    out.push_str(&format!("Elimination: {}\n", describe_elim(elim)));

    for (mode, fit) in fits {
        out.push('\n');
        out.push_str(&format!(
            "[{mode}] iterations={} | kept={} | outliers={} | chi2_red={}\n",
            fit.history.len(),
            fit.kept.len(),
            fit.outliers.len(),
            fmt_opt(fit.reduced_chi2),
        ));
        out.push_str(&format_param_table(fit));
    }

    out
}

fn format_param_table(fit: &Deg01Fit) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<6} {:>12} {:>10}\n", "param", "value(uas)", "sigma").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<12} {:-<10}\n", "", "", "").trim_end());
    out.push('\n');

    for ((name, value), sigma) in fit
        .mode
        .param_names()
        .iter()
        .zip(&fit.solution.params)
        .zip(&fit.solution.sigmas)
    {
        out.push_str(format!("{name:<6} {value:>+12.3} {sigma:>10.3}\n").trim_end());
        out.push('\n');
    }
    out
}

fn describe_elim(elim: &ElimOptions) -> String {
    match elim.mode {
        ElimMode::None => "none".to_string(),
        ElimMode::Sigma => format!(
            "sigma (n={}, scale={})",
            elim.n_sigma,
            if elim.use_wrms { "wrms" } else { "rms" }
        ),
        ElimMode::AngSep => format!("angsep (max={} uas)", elim.max_angsep),
        ElimMode::NorSep => format!("norsep (max={})", elim.max_norsep),
        ElimMode::NorAng => format!(
            "nor_ang (angsep max={} uas, norsep max={})",
            elim.max_angsep, elim.max_norsep
        ),
    }
}

fn fmt_opt(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}")
    } else {
        "n/a".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{SampleSpec, generate_observations};
    use crate::fit::vsh_deg01_fit;

    #[test]
    fn summary_has_one_section_per_mode() {
        let obs = generate_observations(
            &SampleSpec {
                count: 50,
                noise: 1.0,
                ..SampleSpec::default()
            },
            9,
        )
        .unwrap();
        let elim = ElimOptions::default();
        let mut fits = BTreeMap::new();
        for mode in FitMode::ALL {
            fits.insert(mode, vsh_deg01_fit(&obs, mode, &elim).unwrap());
        }
        let input = InputSummary {
            description: "diff.csv".to_string(),
            rows_read: 52,
            rows_skipped: 2,
            matched: None,
            n_obs: 50,
        };

        let text = format_run_summary(&input, &fits, &elim);
        assert!(text.contains("Input: diff.csv"));
        assert!(text.contains("Rows: read=52 | skipped=2"));
        assert!(!text.contains("Common sources"));
        assert!(text.contains("Elimination: sigma (n=3, scale=rms)"));

        let full = text.find("[full]").unwrap();
        let rotation = text.find("[rotation]").unwrap();
        let glide = text.find("[glide]").unwrap();
        assert!(full < rotation && rotation < glide);
        assert_eq!(text.lines().filter(|l| l.starts_with("R1 ")).count(), 2);
        assert_eq!(text.lines().filter(|l| l.starts_with("G3 ")).count(), 2);
    }
}
