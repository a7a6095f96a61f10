//! Cross-matching two catalogs and forming their position differences.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use tracing::warn;

use crate::domain::{CatalogEntry, Observation, ObservationSet};
use crate::fit::norsep::combined_correlation;

/// Radians to microarcseconds.
pub const RAD_TO_UAS: f64 = 180.0 / PI * 3600.0e6;

/// mas to µas.
const MAS_TO_UAS: f64 = 1.0e3;

/// Index pairs `(i, j)` of entries with identical names.
///
/// Catalog 1 order is kept. When a name occurs more than once in catalog 2 the first
/// occurrence wins. Names are compared exactly.
pub fn crossmatch(cat1: &[CatalogEntry], cat2: &[CatalogEntry]) -> Vec<(usize, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(cat2.len());
    for (j, entry) in cat2.iter().enumerate() {
        index.entry(entry.name.as_str()).or_insert(j);
    }

    cat1.iter()
        .enumerate()
        .filter_map(|(i, entry)| index.get(entry.name.as_str()).map(|&j| (i, j)))
        .collect()
}

/// Position differences `cat1 - cat2` for matched pairs.
///
/// `dra` is `Δα·cos(δ1)` with `Δα` wrapped into `(-π, π]`. The observation sits at the
/// catalog 1 position. Pairs whose RA error vanishes (a source at a pole) are skipped.
pub fn position_differences(
    cat1: &[CatalogEntry],
    cat2: &[CatalogEntry],
    pairs: &[(usize, usize)],
) -> ObservationSet {
    let mut observations = Vec::with_capacity(pairs.len());

    for &(i, j) in pairs {
        let (a, b) = (&cat1[i], &cat2[j]);
        let cos_dec = a.dec.cos();

        let e_dra = a.ra_err.hypot(b.ra_err) * MAS_TO_UAS * cos_dec.abs();
        let e_ddec = a.dec_err.hypot(b.dec_err) * MAS_TO_UAS;
        if !(e_dra > 0.0 && e_ddec > 0.0) {
            warn!(source = %a.name, "zero position-difference error; source skipped");
            continue;
        }

        // The cos(δ1) factor scales the RA error and the covariance alike, so it drops
        // out of the correlation.
        let corr = combined_correlation((a.ra_err, a.dec_err, a.corr), (b.ra_err, b.dec_err, b.corr));

        observations.push(Observation {
            name: a.name.clone(),
            ra: a.ra,
            dec: a.dec,
            dra: wrap_pi(a.ra - b.ra) * cos_dec * RAD_TO_UAS,
            ddec: (a.dec - b.dec) * RAD_TO_UAS,
            e_dra,
            e_ddec,
            corr,
        });
    }

    ObservationSet::new(observations)
}

/// Wrap an angle difference into `(-π, π]`.
fn wrap_pi(x: f64) -> f64 {
    let w = x.rem_euclid(TAU);
    if w > PI { w - TAU } else { w }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn entry(name: &str, ra_deg: f64, dec_deg: f64, ra_err: f64, dec_err: f64, corr: f64) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            ra: ra_deg.to_radians(),
            dec: dec_deg.to_radians(),
            ra_err,
            dec_err,
            corr,
            flag: None,
            sessions: None,
        }
    }

    #[test]
    fn crossmatch_keeps_cat1_order_and_first_cat2_match() {
        let cat1 = vec![
            entry("C", 0.0, 0.0, 1.0, 1.0, 0.0),
            entry("A", 0.0, 0.0, 1.0, 1.0, 0.0),
            entry("X", 0.0, 0.0, 1.0, 1.0, 0.0),
        ];
        let cat2 = vec![
            entry("A", 0.0, 0.0, 1.0, 1.0, 0.0),
            entry("C", 0.0, 0.0, 1.0, 1.0, 0.0),
            entry("C", 0.0, 0.0, 1.0, 1.0, 0.0),
            entry("a", 0.0, 0.0, 1.0, 1.0, 0.0),
        ];
        assert_eq!(crossmatch(&cat1, &cat2), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn differences_scale_ra_by_cos_dec() {
        let arcsec = 1.0 / 3600.0;
        let cat1 = vec![entry("S", 10.0 + 2.0 * arcsec, 60.0 - arcsec, 0.3, 0.4, 0.5)];
        let cat2 = vec![entry("S", 10.0, 60.0, 0.4, 0.3, -0.5)];
        let obs = position_differences(&cat1, &cat2, &crossmatch(&cat1, &cat2));
        let o = &obs.as_slice()[0];

        let cos_dec = (60.0 - arcsec).to_radians().cos();
        assert_relative_eq!(o.dra, 2.0e6 * cos_dec, max_relative = 1e-8);
        assert_relative_eq!(o.ddec, -1.0e6, max_relative = 1e-8);
        assert_relative_eq!(o.e_dra, 500.0 * cos_dec, max_relative = 1e-12);
        assert_relative_eq!(o.e_ddec, 500.0, max_relative = 1e-12);
        // (0.5*0.3*0.4 - 0.5*0.4*0.3) / ... = 0
        assert!(o.corr.abs() < 1e-15);
        assert_eq!(o.ra, cat1[0].ra);
    }

    #[test]
    fn ra_difference_wraps_across_zero() {
        let arcsec = 1.0 / 3600.0;
        let cat1 = vec![entry("S", 0.5 * arcsec, 0.0, 1.0, 1.0, 0.0)];
        let cat2 = vec![entry("S", 360.0 - 0.5 * arcsec, 0.0, 1.0, 1.0, 0.0)];
        let obs = position_differences(&cat1, &cat2, &[(0, 0)]);
        assert_relative_eq!(obs.as_slice()[0].dra, 1.0e6, max_relative = 1e-6);
    }

    #[test]
    fn polar_sources_are_skipped() {
        let cat1 = vec![entry("P", 0.0, 90.0, 1.0, 1.0, 0.0), entry("Q", 0.0, 10.0, 1.0, 1.0, 0.0)];
        let cat2 = cat1.clone();
        let obs = position_differences(&cat1, &cat2, &crossmatch(&cat1, &cat2));
        // cos(90°) is ~6e-17 in floating point, not zero, so P survives with a tiny error.
        assert_eq!(obs.len(), 2);

        let mut exact = cat1.clone();
        exact[0].ra_err = 0.0;
        let obs = position_differences(&exact, &exact, &[(0, 0), (1, 1)]);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs.as_slice()[0].name, "Q");
    }

    #[test]
    fn wrap_pi_range() {
        assert_relative_eq!(wrap_pi(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-15);
        assert_relative_eq!(wrap_pi(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-15);
        assert_relative_eq!(wrap_pi(PI), PI, epsilon = 1e-15);
        assert_eq!(wrap_pi(0.0), 0.0);
    }
}
