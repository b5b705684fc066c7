//! Disease liability model.
//!
//! 1. Baseline liability ~ Normal(0, 1) for every row.
//! 2. Each group adds its own Normal(disease_mean_shift, disease_variance_factor)
//!    draw to each of its rows. The factor is a standard deviation.
//! 3. Rows at or above the (100 - prevalence) percentile of the liability
//!    column are disease-positive.
//!
//! The percentile uses linear interpolation between order statistics
//! (see `stats::percentile_linear`), so prevalence 0 yields the maximum as
//! threshold and prevalence 100 the minimum.

use crate::{
    config::GroupsConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    rng::{normal, SimRng},
    stage::Stage,
    stats,
    table::{Column, Table},
    types::{DISEASE_LIABILITY_COLUMN, DISEASE_STATE_COLUMN, GROUP_COLUMN},
};
use rand_distr::StandardNormal;

const STAGE: &str = "disease";

pub struct DiseaseLiabilityModel {
    groups:     GroupsConfig,
    prevalence: f64,
}

impl DiseaseLiabilityModel {
    pub fn new(groups: GroupsConfig, prevalence: f64) -> Self {
        Self { groups, prevalence }
    }
}

impl Stage for DiseaseLiabilityModel {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&mut self, table: &mut Table, rng: &mut SimRng) -> SimResult<Vec<SimEvent>> {
        if !(0.0..=100.0).contains(&self.prevalence) {
            return Err(SimError::config(
                STAGE,
                "disease_config.prevalence",
                format!("{} is outside [0, 100]", self.prevalence),
            ));
        }

        let rows = table.row_count();
        let mut liability: Vec<f64> = rng.sample_n(&StandardNormal, rows);

        let partition = table.partition_by(GROUP_COLUMN, STAGE)?;
        for (group, params) in &self.groups {
            let shift = normal(
                params.disease_mean_shift,
                params.disease_variance_factor,
                STAGE,
                format!("groups_config.{group}.disease_variance_factor"),
            )?;
            let members = partition.get(group).map(Vec::as_slice).unwrap_or(&[]);
            let draws = rng.sample_n(&shift, members.len());
            for (&row, delta) in members.iter().zip(draws) {
                liability[row] += delta;
            }
        }

        let threshold = stats::percentile_linear(&liability, 100.0 - self.prevalence)
            .ok_or_else(|| SimError::degenerate(STAGE, DISEASE_LIABILITY_COLUMN, "has no rows"))?;
        let state: Vec<i64> = liability
            .iter()
            .map(|&l| i64::from(l >= threshold))
            .collect();
        let positives = state.iter().filter(|&&s| s == 1).count();

        table.add_column(DISEASE_LIABILITY_COLUMN, Column::dense_float(liability))?;
        table.add_column(DISEASE_STATE_COLUMN, Column::dense_int(state))?;

        log::info!(
            "disease: prevalence={:.2}% threshold={threshold:.4} positives={positives}/{rows}",
            self.prevalence
        );
        Ok(vec![SimEvent::DiseaseStateAssigned {
            threshold,
            positives,
            prevalence: self.prevalence,
        }])
    }
}
