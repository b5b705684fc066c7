//! The run log — one event per notable stage outcome.
//!
//! RULE: Stages report what they did ONLY through events.
//! Events are recorded in emission order; two runs with the same seed and
//! configuration must emit identical logs.

use crate::types::RunId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every event emitted during a run.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    RunInitialized {
        run_id:      RunId,
        seed:        u64,
        num_samples: usize,
    },

    // ── Generation ─────────────────────────────────
    FeaturesSampled {
        columns: Vec<String>,
    },
    GroupsAssigned {
        counts: BTreeMap<String, usize>,
    },
    DiseaseStateAssigned {
        threshold:  f64,
        positives:  usize,
        prevalence: f64,
    },
    CorrelatedVariableGenerated {
        name:        String,
        target:      f64,
        /// Pearson correlation with the liability actually realized; `None`
        /// when it is undefined (fewer than two rows, or a constant column).
        realized:    Option<f64>,
    },
    BiasColumnsInjected {
        bias_type: String,
        columns:   Vec<String>,
    },

    // ── Censoring ──────────────────────────────────
    RowsCensored {
        smooth_marked:     usize,
        correlated_marked: usize,
        dropped:           usize,
        survivors:         usize,
        final_rows:        usize,
    },
}

impl SimEvent {
    /// Stable name used for the event_type column in event_log.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }              => "run_initialized",
            Self::FeaturesSampled { .. }             => "features_sampled",
            Self::GroupsAssigned { .. }              => "groups_assigned",
            Self::DiseaseStateAssigned { .. }        => "disease_state_assigned",
            Self::CorrelatedVariableGenerated { .. } => "correlated_variable_generated",
            Self::BiasColumnsInjected { .. }         => "bias_columns_injected",
            Self::RowsCensored { .. }                => "rows_censored",
        }
    }
}

/// A persisted event_log row.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub seq:        u64,
    pub stage:      String,
    pub event_type: String,
    pub payload:    String,
}
