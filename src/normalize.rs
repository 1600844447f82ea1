use std::collections::BTreeMap;

use tracing::debug;

use crate::schedule_adjust::AdjustedTeamWeek;

/// Standardizes one cross-section to mean 0 / sample sd 1 over its non-missing values.
///
/// When the standard deviation is zero or undefined (fewer than two values) every
/// non-missing value maps to 0.0.
pub fn zscore_cross_section(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let n = present.len();
    let mean = if n > 0 {
        present.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sd = if n > 1 {
        (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };
    let degenerate = !sd.is_finite() || sd == 0.0;

    values
        .iter()
        .map(|v| {
            let v = v.filter(|x| x.is_finite())?;
            if degenerate {
                Some(0.0)
            } else {
                Some((v - mean) / sd)
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeeklyZ {
    pub rating_net: Option<f64>,
    pub rating_off: Option<f64>,
    pub rating_def: Option<f64>,
}

pub struct WeeklyZScorer {
    keep_components: bool,
}

impl WeeklyZScorer {
    pub fn new(keep_components: bool) -> Self {
        Self { keep_components }
    }

    /// Z-scores per (season, week); the result is index-aligned with `rows`.
    pub fn standardize(&self, rows: &[AdjustedTeamWeek]) -> Vec<WeeklyZ> {
        let mut sections: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
        for (idx, r) in rows.iter().enumerate() {
            sections.entry((r.season, r.week)).or_default().push(idx);
        }

        let mut out = vec![WeeklyZ::default(); rows.len()];
        let mut degenerate_sections = 0usize;
        for idxs in sections.values() {
            let net: Vec<Option<f64>> = idxs.iter().map(|i| rows[*i].adj_net).collect();
            let z_net = zscore_cross_section(&net);
            if z_net.iter().flatten().all(|z| *z == 0.0) {
                degenerate_sections += 1;
            }
            let (z_off, z_def) = if self.keep_components {
                let off: Vec<Option<f64>> = idxs.iter().map(|i| rows[*i].adj_off).collect();
                let def: Vec<Option<f64>> = idxs.iter().map(|i| rows[*i].adj_def).collect();
                (zscore_cross_section(&off), zscore_cross_section(&def))
            } else {
                (vec![None; idxs.len()], vec![None; idxs.len()])
            };
            for (pos, idx) in idxs.iter().enumerate() {
                out[*idx] = WeeklyZ {
                    rating_net: z_net[pos],
                    rating_off: z_off[pos],
                    rating_def: z_def[pos],
                };
            }
        }
        debug!(
            sections = sections.len(),
            degenerate_sections, "standardized weekly cross-sections"
        );
        out
    }
}
