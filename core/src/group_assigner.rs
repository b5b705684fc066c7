//! Group assigner — one uniformly drawn group label per row.

use crate::{
    error::{SimError, SimResult},
    event::SimEvent,
    rng::SimRng,
    stage::Stage,
    table::{Column, Table},
    types::GROUP_COLUMN,
};
use std::collections::BTreeMap;

const STAGE: &str = "groups";

pub struct GroupAssigner {
    groups: Vec<String>,
}

impl GroupAssigner {
    pub fn new(groups: Vec<String>) -> Self {
        Self { groups }
    }
}

impl Stage for GroupAssigner {
    fn name(&self) -> &'static str {
        STAGE
    }

    fn apply(&mut self, table: &mut Table, rng: &mut SimRng) -> SimResult<Vec<SimEvent>> {
        if self.groups.is_empty() {
            return Err(SimError::config(STAGE, "groups_config", "at least one group is required"));
        }

        let k = self.groups.len();
        let labels: Vec<String> = (0..table.row_count())
            .map(|_| self.groups[rng.pick_index(k)].clone())
            .collect();

        let mut counts: BTreeMap<String, usize> =
            self.groups.iter().map(|g| (g.clone(), 0)).collect();
        for label in &labels {
            *counts.entry(label.clone()).or_default() += 1;
        }

        table.add_column(GROUP_COLUMN, Column::dense_text(labels))?;

        for (group, count) in &counts {
            log::debug!("groups: {group} has {count} rows");
        }
        log::info!("groups: assigned {} rows across {k} groups", table.row_count());
        Ok(vec![SimEvent::GroupsAssigned { counts }])
    }
}
