//! The simulation pipeline — builds the full table, then censors it.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Feature sampler
//!   2. Group assigner
//!   3. Disease liability model
//!   4. Correlated variable generator
//!   5. Bias injector
//!   6. Censoring model (derives the censored table from the full one)
//!
//! RULES:
//!   - Stages execute in registration order, once per run.
//!   - Each stage reads only columns written by earlier stages.
//!   - All randomness flows through the RngBank.
//!   - Every stage outcome is recorded in the run log.

use crate::{
    bias_injector::BiasInjector,
    censoring::CensoringModel,
    config::SimConfig,
    correlated::CorrelatedVariableGenerator,
    disease_model::DiseaseLiabilityModel,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    feature_sampler::FeatureSampler,
    group_assigner::GroupAssigner,
    rng::{RngBank, StreamSlot},
    stage::Stage,
    store::SimStore,
    table::Table,
    types::RunId,
};

/// Names of the full and censored tables in the store.
pub const FULL_TABLE: &str = "full";
pub const CENSORED_TABLE: &str = "censored";

pub struct SimulationPipeline {
    pub run_id:  RunId,
    num_samples: usize,
    rng_bank:    RngBank,
    stages:      Vec<Box<dyn Stage>>,
    censoring:   CensoringModel,
}

impl SimulationPipeline {
    /// A pipeline with no generation stages; the censoring model is always
    /// present.
    pub fn new(run_id: RunId, config: &SimConfig) -> Self {
        Self {
            run_id,
            num_samples: config.num_samples,
            rng_bank: RngBank::new(config.seed),
            stages: Vec::new(),
            censoring: CensoringModel::new(
                config.groups_config.clone(),
                config.correlated_config.keys().cloned().collect(),
                config.num_samples,
            ),
        }
    }

    /// Build a fully wired pipeline with all stages registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(run_id: RunId, config: &SimConfig) -> Self {
        let mut pipeline = SimulationPipeline::new(run_id, config);

        // EXECUTION ORDER — fixed, documented, never reordered.
        pipeline.register(Box::new(FeatureSampler::new(config.feature_details.clone())));
        pipeline.register(Box::new(GroupAssigner::new(
            config.groups_config.keys().cloned().collect(),
        )));
        pipeline.register(Box::new(DiseaseLiabilityModel::new(
            config.groups_config.clone(),
            config.disease_config.prevalence,
        )));
        pipeline.register(Box::new(CorrelatedVariableGenerator::new(
            config.correlated_config.clone(),
        )));
        pipeline.register(Box::new(BiasInjector::new(
            config.bias_config.clone(),
            config.groups_config.clone(),
        )));
        pipeline
    }

    /// Register a stage. Call in the documented execution order.
    pub fn register(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Run every stage, then censoring. Any error aborts the run and no
    /// table is returned.
    pub fn run(&mut self) -> SimResult<SimulationRun> {
        if self.num_samples == 0 {
            return Err(SimError::config("pipeline", "num_samples", "must be positive"));
        }

        let seed = self.rng_bank.master_seed();
        let mut events = vec![(
            "pipeline",
            SimEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed,
                num_samples: self.num_samples,
            },
        )];
        log::info!("run={} seed={seed} num_samples={}", self.run_id, self.num_samples);

        let mut rng = self.rng_bank.for_stream(StreamSlot::Generation);
        let mut table = Table::with_rows(self.num_samples);
        for stage in &mut self.stages {
            let name = stage.name();
            let new_events = stage.apply(&mut table, &mut rng).map_err(|e| {
                log::error!("stage {name} failed: {e}");
                e
            })?;
            events.extend(new_events.into_iter().map(|e| (name, e)));
        }

        let mut resample_rng = self.rng_bank.for_stream(StreamSlot::Resample);
        let outcome = self.censoring.censor(&table, &mut rng, &mut resample_rng)?;
        events.push((self.censoring.name(), outcome.event()));

        Ok(SimulationRun {
            run_id: self.run_id.clone(),
            seed,
            full: table,
            censored: outcome.table,
            events,
        })
    }
}

/// Output of one completed run. The two tables are independent values.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub run_id: RunId,
    pub seed:   u64,
    full:       Table,
    censored:   Table,
    events:     Vec<(&'static str, SimEvent)>,
}

impl SimulationRun {
    pub fn full_table(&self) -> &Table {
        &self.full
    }

    pub fn censored_table(&self) -> &Table {
        &self.censored
    }

    pub fn events(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter().map(|(_, e)| e)
    }

    /// The run log in emission order, serialized for the store.
    pub fn event_log(&self) -> SimResult<Vec<EventLogEntry>> {
        self.events
            .iter()
            .enumerate()
            .map(|(seq, (stage, event))| {
                Ok(EventLogEntry {
                    id:         None,
                    run_id:     self.run_id.clone(),
                    seq:        seq as u64,
                    stage:      stage.to_string(),
                    event_type: event.event_type().to_string(),
                    payload:    serde_json::to_string(event)?,
                })
            })
            .collect()
    }

    /// Write both tables and the run log. The run row must already exist.
    pub fn persist(&self, store: &SimStore) -> SimResult<()> {
        store.save_table(&self.run_id, FULL_TABLE, &self.full)?;
        store.save_table(&self.run_id, CENSORED_TABLE, &self.censored)?;
        for entry in self.event_log()? {
            store.append_event(&entry)?;
        }
        log::debug!("run={} persisted", self.run_id);
        Ok(())
    }
}
