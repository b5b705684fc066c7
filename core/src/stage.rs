//! Stage trait.
//!
//! RULE: Every generation stage implements Stage.
//! The pipeline calls apply() on each registered stage in registration
//! order, exactly once per run. Execution order is fixed and documented
//! in pipeline.rs.

use crate::{error::SimResult, event::SimEvent, rng::SimRng, table::Table};

/// The contract every generation stage must fulfill.
pub trait Stage: Send {
    /// Unique stable name for this stage. Used in errors and the run log.
    fn name(&self) -> &'static str;

    /// Add this stage's columns to `table`.
    ///
    /// - `table`: owned exclusively by this stage for the duration of the call
    /// - `rng`:   the run's generation stream
    ///
    /// Returns the events describing what was produced. On error the table
    /// may hold a partial result; the pipeline discards it.
    fn apply(&mut self, table: &mut Table, rng: &mut SimRng) -> SimResult<Vec<SimEvent>>;
}
