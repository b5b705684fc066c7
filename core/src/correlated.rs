//! Correlated variable generator.
//!
//! value = liability * rho + noise * sqrt(1 - rho^2),  noise ~ Normal(mean, std)
//!
//! The realized correlation equals rho only while the liability column has
//! roughly unit variance and `std` is 1; group shifts in the disease model
//! inflate that variance and pull the realized correlation away from rho.
//! The realized value is reported in the run log.

use crate::{
    config::CorrelatedConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    rng::{normal, SimRng},
    stage::Stage,
    stats,
    table::{Column, Table},
    types::DISEASE_LIABILITY_COLUMN,
};
use rand_distr::Normal;

const STAGE: &str = "correlated";

pub struct CorrelatedVariableGenerator {
    variables: CorrelatedConfig,
}

impl CorrelatedVariableGenerator {
    pub fn new(variables: CorrelatedConfig) -> Self {
        Self { variables }
    }

    fn noise_distributions(&self) -> SimResult<Vec<(&str, f64, Normal<f64>)>> {
        self.variables
            .iter()
            .map(|(name, spec)| {
                if !(-1.0..=1.0).contains(&spec.correlation) {
                    return Err(SimError::config(
                        STAGE,
                        format!("correlated_config.{name}.correlation"),
                        format!("{} is outside [-1, 1]", spec.correlation),
                    ));
                }
                let noise =
                    normal(spec.mean, spec.std, STAGE, format!("correlated_config.{name}.std"))?;
                Ok((name.as_str(), spec.correlation, noise))
            })
            .collect()
    }
}

impl Stage for CorrelatedVariableGenerator {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&mut self, table: &mut Table, rng: &mut SimRng) -> SimResult<Vec<SimEvent>> {
        if self.variables.is_empty() {
            return Ok(vec![]);
        }

        // Validate every variable before drawing anything.
        let plans = self.noise_distributions()?;
        let liability = table.dense_numeric(DISEASE_LIABILITY_COLUMN, STAGE)?;

        let mut events = Vec::with_capacity(plans.len());
        for (name, rho, noise) in plans {
            let scale = (1.0 - rho * rho).sqrt();
            let draws = rng.sample_n(&noise, liability.len());
            let values: Vec<f64> = liability
                .iter()
                .zip(draws)
                .map(|(l, e)| l * rho + e * scale)
                .collect();
            let realized = Some(stats::pearson(&liability, &values)).filter(|r| r.is_finite());

            table.add_column(name, Column::dense_float(values))?;
            match realized {
                Some(r) => log::info!("correlated: {name} target={rho:.3} realized={r:.3}"),
                None => log::info!("correlated: {name} target={rho:.3} realized=undefined"),
            }
            events.push(SimEvent::CorrelatedVariableGenerated {
                name: name.to_string(),
                target: rho,
                realized,
            });
        }
        Ok(events)
    }
}
