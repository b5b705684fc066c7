//! Feature sampler — independent base covariates.
//!
//! numerical   ~ Normal(50, 10)
//! ordinal     ~ {1..5} with ORDINAL_WEIGHTS
//! categorical ~ {low, medium, high} with CATEGORICAL_WEIGHTS

use crate::{
    categories::{self, Level, CATEGORICAL_WEIGHTS, ORDINAL_LEVELS, ORDINAL_WEIGHTS},
    config::{FeatureKind, FeatureSpec},
    error::SimResult,
    event::SimEvent,
    rng::{normal, SimRng},
    stage::Stage,
    table::{Column, Table},
};

pub const NUMERICAL_MEAN: f64 = 50.0;
pub const NUMERICAL_STD: f64 = 10.0;

const STAGE: &str = "features";

pub struct FeatureSampler {
    features: FeatureSpec,
}

impl FeatureSampler {
    pub fn new(features: FeatureSpec) -> Self {
        Self { features }
    }

    fn sample_column(
        &self,
        name: &str,
        kind: FeatureKind,
        rows: usize,
        rng: &mut SimRng,
    ) -> SimResult<Column> {
        let key = format!("feature_details.{name}");
        let column = match kind {
            FeatureKind::Numerical => {
                let dist = normal(NUMERICAL_MEAN, NUMERICAL_STD, STAGE, key)?;
                Column::dense_float(rng.sample_n(&dist, rows))
            }
            FeatureKind::Ordinal => Column::dense_int(categories::draw(
                rng,
                &ORDINAL_LEVELS,
                &ORDINAL_WEIGHTS,
                rows,
                STAGE,
                &key,
            )?),
            FeatureKind::Categorical => {
                let levels = categories::draw(rng, &Level::ALL, &CATEGORICAL_WEIGHTS, rows, STAGE, &key)?;
                Column::dense_text(levels.iter().map(|l| l.as_str().to_string()).collect())
            }
        };
        Ok(column)
    }
}

impl Stage for FeatureSampler {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&mut self, table: &mut Table, rng: &mut SimRng) -> SimResult<Vec<SimEvent>> {
        let rows = table.row_count();
        for (name, kind) in &self.features {
            let column = self.sample_column(name, *kind, rows, rng)?;
            table.add_column(name.clone(), column)?;
            log::debug!("features: sampled {name} ({}) for {rows} rows", kind.as_str());
        }
        log::info!("features: sampled {} base covariates", self.features.len());
        Ok(vec![SimEvent::FeaturesSampled {
            columns: self.features.keys().cloned().collect(),
        }])
    }
}
