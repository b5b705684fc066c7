//! Bias injector — group-conditional derived covariates.
//!
//! For each bias type, each repetition and each group, one sparse column
//! `{bias_type}_biased_{i+1}_{group}` is written, populated only on that
//! group's rows:
//!   numerical   : base_feature + Normal(mean_shift, variance_factor)
//!   ordinal     : redraw from {1..5}, ORDINAL_WEIGHTS tilted by variance_factor
//!   categorical : redraw from {low, medium, high}, CATEGORICAL_WEIGHTS tilted
//!                 by variance_factor
//!
//! Tilting multiplies every weight by the same factor and renormalizes, so
//! a positive factor reproduces the base distribution.

use crate::{
    categories::{self, Level, CATEGORICAL_WEIGHTS, ORDINAL_LEVELS, ORDINAL_WEIGHTS},
    config::{BiasConfig, BiasSpec, FeatureKind, GroupParams, GroupsConfig},
    error::{SimError, SimResult},
    event::SimEvent,
    rng::{normal, SimRng},
    stage::Stage,
    table::{scatter, Column, Table},
    types::GROUP_COLUMN,
};
use rand_distr::Normal;

const STAGE: &str = "bias";

/// Name of the column holding repetition `index` (0-based) of `bias_type`
/// for `group`.
pub fn bias_column_name(bias_type: &str, index: usize, group: &str) -> String {
    format!("{bias_type}_biased_{}_{group}", index + 1)
}

/// Per-group sampling plan, validated before any column is written.
enum Plan {
    Shift(Normal<f64>),
    Ordinal(Vec<f64>),
    Categorical(Vec<f64>),
}

pub struct BiasInjector {
    bias:   BiasConfig,
    groups: GroupsConfig,
}

impl BiasInjector {
    pub fn new(bias: BiasConfig, groups: GroupsConfig) -> Self {
        Self { bias, groups }
    }

    fn kind_of(bias_type: &str) -> SimResult<FeatureKind> {
        FeatureKind::parse(bias_type).ok_or_else(|| {
            SimError::config(
                STAGE,
                format!("bias_config.{bias_type}"),
                "bias type must be numerical, ordinal or categorical",
            )
        })
    }

    fn plan_for(kind: FeatureKind, group: &str, params: &GroupParams) -> SimResult<Plan> {
        let factor = params.variance_factor(STAGE, group)?;
        let key = || format!("groups_config.{group}.variance_factor");
        let tilted = |base: &[f64]| {
            categories::tilt(base, factor).ok_or_else(|| {
                SimError::config(
                    STAGE,
                    key(),
                    format!("reweighted probabilities do not sum to a positive value (factor {factor})"),
                )
            })
        };
        match kind {
            FeatureKind::Numerical => {
                let mean = params.mean_shift(STAGE, group)?;
                normal(mean, factor, STAGE, key()).map(Plan::Shift)
            }
            FeatureKind::Ordinal => tilted(&ORDINAL_WEIGHTS).map(Plan::Ordinal),
            FeatureKind::Categorical => tilted(&CATEGORICAL_WEIGHTS).map(Plan::Categorical),
        }
    }

    fn base_values(
        bias_type: &str,
        spec: &BiasSpec,
        table: &Table,
    ) -> SimResult<Vec<Option<f64>>> {
        let base = spec.base_feature.as_deref().ok_or_else(|| {
            SimError::config(STAGE, format!("bias_config.{bias_type}.base_feature"), "missing required key")
        })?;
        if !table.has_column(base) {
            return Err(SimError::config(
                STAGE,
                format!("bias_config.{bias_type}.base_feature"),
                format!("base feature '{base}' is not a column of the table"),
            ));
        }
        table.numeric(base, STAGE)
    }

    fn inject(
        &self,
        bias_type: &str,
        spec: &BiasSpec,
        kind: FeatureKind,
        plans: &[(&str, Plan)],
        table: &mut Table,
        rng: &mut SimRng,
    ) -> SimResult<Vec<String>> {
        let rows = table.row_count();
        let base = match kind {
            FeatureKind::Numerical => Some(Self::base_values(bias_type, spec, table)?),
            _ => None,
        };
        let partition = table.partition_by(GROUP_COLUMN, STAGE)?;
        let key = format!("bias_config.{bias_type}");

        let mut written = Vec::new();
        for i in 0..spec.count {
            for (group, plan) in plans {
                let members = partition.get(*group).map(Vec::as_slice).unwrap_or(&[]);
                let column = match plan {
                    Plan::Shift(shift) => {
                        let base = base.as_ref().ok_or_else(|| {
                            SimError::config(STAGE, &key, "numerical bias has no base values")
                        })?;
                        let draws = rng.sample_n(shift, members.len());
                        let values: Vec<f64> = members
                            .iter()
                            .zip(draws)
                            .map(|(&row, delta)| base[row].map(|b| b + delta))
                            .collect::<Option<_>>()
                            .ok_or_else(|| {
                                SimError::config(STAGE, &key, "base feature has unset cells")
                            })?;
                        Column::Float(scatter(rows, members, values))
                    }
                    Plan::Ordinal(weights) => {
                        let values =
                            categories::draw(rng, &ORDINAL_LEVELS, weights, members.len(), STAGE, &key)?;
                        Column::Int(scatter(rows, members, values))
                    }
                    Plan::Categorical(weights) => {
                        let levels =
                            categories::draw(rng, &Level::ALL, weights, members.len(), STAGE, &key)?;
                        let values = levels.iter().map(|l| l.as_str().to_string()).collect();
                        Column::Text(scatter(rows, members, values))
                    }
                };
                let name = bias_column_name(bias_type, i, group);
                table.add_column(name.clone(), column)?;
                log::debug!("bias: {name} populated on {} rows", members.len());
                written.push(name);
            }
        }
        Ok(written)
    }
}

impl Stage for BiasInjector {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&mut self, table: &mut Table, rng: &mut SimRng) -> SimResult<Vec<SimEvent>> {
        // Resolve every bias type and group plan up front so a bad
        // configuration fails before any column is written.
        let mut resolved = Vec::with_capacity(self.bias.len());
        for (bias_type, spec) in &self.bias {
            let kind = Self::kind_of(bias_type)?;
            if kind == FeatureKind::Numerical {
                Self::base_values(bias_type, spec, table)?;
            }
            let plans = self
                .groups
                .iter()
                .map(|(group, params)| Ok((group.as_str(), Self::plan_for(kind, group, params)?)))
                .collect::<SimResult<Vec<_>>>()?;
            resolved.push((bias_type.as_str(), spec, kind, plans));
        }

        let mut events = Vec::with_capacity(resolved.len());
        for (bias_type, spec, kind, plans) in &resolved {
            let columns = self.inject(bias_type, spec, *kind, plans, table, rng)?;
            log::info!("bias: {bias_type} wrote {} columns", columns.len());
            events.push(SimEvent::BiasColumnsInjected {
                bias_type: bias_type.to_string(),
                columns,
            });
        }
        Ok(events)
    }
}
