//! Censoring model — non-random row removal and resampling.
//!
//! Two independent contributions can mark a row for removal:
//!   1. the smooth censoring function of (Income, EducationLevel), with the
//!      group's `censor_shape`;
//!   2. one Bernoulli draw per correlated variable with the group's
//!      `censor_{var}_probability` (0 if absent).
//! Draws happen for every row of every group regardless of earlier marks,
//! so the number of draws never depends on the outcome of another draw.
//!
//! Survivors keep their order. If more survive than `num_samples`, a random
//! subset of exactly `num_samples` rows is drawn without replacement from
//! the resample stream. Fewer survivors are returned as they are.

use crate::{
    config::GroupsConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    rng::SimRng,
    table::Table,
    types::{EDUCATION_COLUMN, GROUP_COLUMN, INCOME_COLUMN},
};

const STAGE: &str = "censoring";

/// Censoring probability of one row:
/// `1 - exp(-shape * (1 - income / max_income) * (1 - education / max_education))`,
/// clamped to [0, 1].
///
/// Non-increasing in income and in education for a non-negative shape.
pub fn smooth_censor_probability(
    income: f64,
    education: f64,
    max_income: f64,
    max_education: f64,
    shape: f64,
) -> f64 {
    let norm_income = income / max_income;
    let norm_education = education / max_education;
    let p = 1.0 - (-shape * (1.0 - norm_income) * (1.0 - norm_education)).exp();
    p.clamp(0.0, 1.0)
}

/// Result of a censoring pass.
#[derive(Debug, Clone)]
pub struct CensorOutcome {
    pub table:             Table,
    pub smooth_marked:     usize,
    pub correlated_marked: usize,
    pub dropped:           usize,
    pub survivors:         usize,
}

impl CensorOutcome {
    pub fn event(&self) -> SimEvent {
        SimEvent::RowsCensored {
            smooth_marked:     self.smooth_marked,
            correlated_marked: self.correlated_marked,
            dropped:           self.dropped,
            survivors:         self.survivors,
            final_rows:        self.table.row_count(),
        }
    }
}

pub struct CensoringModel {
    groups:      GroupsConfig,
    correlated:  Vec<String>,
    num_samples: usize,
}

impl CensoringModel {
    pub fn new(groups: GroupsConfig, correlated: Vec<String>, num_samples: usize) -> Self {
        Self {
            groups,
            correlated,
            num_samples,
        }
    }

    pub fn name(&self) -> &'static str {
        STAGE
    }

    /// Derive the censored table from `full`. `full` is never modified.
    pub fn censor(
        &self,
        full: &Table,
        rng: &mut SimRng,
        resample_rng: &mut SimRng,
    ) -> SimResult<CensorOutcome> {
        let income = full.dense_numeric(INCOME_COLUMN, STAGE)?;
        let education = full.dense_numeric(EDUCATION_COLUMN, STAGE)?;
        let max_income = column_max(&income, INCOME_COLUMN)?;
        let max_education = column_max(&education, EDUCATION_COLUMN)?;

        // Resolve per-group parameters before drawing.
        let mut shapes = Vec::with_capacity(self.groups.len());
        let mut var_probs = Vec::with_capacity(self.groups.len());
        for (group, params) in &self.groups {
            shapes.push(params.censor_shape(STAGE, group)?);
            let probs = self
                .correlated
                .iter()
                .map(|var| params.censor_probability(STAGE, group, var))
                .collect::<SimResult<Vec<f64>>>()?;
            var_probs.push(probs);
        }

        let partition = full.partition_by(GROUP_COLUMN, STAGE)?;
        let members: Vec<&[usize]> = self
            .groups
            .keys()
            .map(|group| partition.get(group).map(Vec::as_slice).unwrap_or(&[]))
            .collect();
        let mut marked = vec![false; full.row_count()];

        let mut smooth_marked = 0;
        for (rows, shape) in members.iter().zip(&shapes) {
            for &row in rows.iter() {
                let p = smooth_censor_probability(
                    income[row],
                    education[row],
                    max_income,
                    max_education,
                    *shape,
                );
                if rng.chance(p) {
                    marked[row] = true;
                    smooth_marked += 1;
                }
            }
        }

        let mut correlated_marked = 0;
        for (v, var) in self.correlated.iter().enumerate() {
            for (rows, probs) in members.iter().zip(&var_probs) {
                let p = probs[v];
                for &row in rows.iter() {
                    if rng.chance(p) {
                        marked[row] = true;
                        correlated_marked += 1;
                    }
                }
            }
            log::debug!("censoring: {var} draws complete");
        }

        let survivors: Vec<usize> = (0..full.row_count()).filter(|&r| !marked[r]).collect();
        let dropped = full.row_count() - survivors.len();

        let selected: Vec<usize> = if survivors.len() > self.num_samples {
            let picks = resample_rng.choose_indices(survivors.len(), self.num_samples)?;
            picks.into_iter().map(|i| survivors[i]).collect()
        } else {
            survivors.clone()
        };

        let table = full.select_rows(&selected);
        log::info!(
            "censoring: dropped {dropped} of {} rows, {} survivors, {} kept",
            full.row_count(),
            survivors.len(),
            table.row_count()
        );
        Ok(CensorOutcome {
            table,
            smooth_marked,
            correlated_marked,
            dropped,
            survivors: survivors.len(),
        })
    }
}

fn column_max(values: &[f64], column: &str) -> SimResult<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > 0.0 && max.is_finite()) {
        return Err(SimError::degenerate(
            STAGE,
            column,
            format!("has maximum {max}; normalization needs a positive maximum"),
        ));
    }
    Ok(max)
}
