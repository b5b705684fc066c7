//! End-to-end runs of the full pipeline.

use healthsim_core::{
    config::SimConfig,
    error::SimError,
    event::SimEvent,
    pipeline::SimulationPipeline,
    summary::{describe, liability_histograms, ColumnSummary},
    types::{DISEASE_LIABILITY_COLUMN, GROUP_COLUMN},
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn default_run_produces_columns_in_stage_order() {
    init_logging();
    let run = SimulationPipeline::build("pipe-cols".into(), &SimConfig::default_test())
        .run()
        .expect("pipeline run");

    let expected = [
        "EducationLevel",
        "Employment",
        "Income",
        "Group",
        "DiseaseLiability",
        "DiseaseState",
        "BMI",
        "categorical_biased_1_GroupA",
        "categorical_biased_1_GroupB",
        "numerical_biased_1_GroupA",
        "numerical_biased_1_GroupB",
        "numerical_biased_2_GroupA",
        "numerical_biased_2_GroupB",
        "ordinal_biased_1_GroupA",
        "ordinal_biased_1_GroupB",
    ];
    assert_eq!(run.full_table().column_names(), expected);
    assert_eq!(run.censored_table().column_names(), expected);
    assert_eq!(run.full_table().row_count(), 2_000);
}

#[test]
fn censored_table_never_exceeds_num_samples() {
    let config = SimConfig::default_test();
    let run = SimulationPipeline::build("pipe-size".into(), &config)
        .run()
        .expect("pipeline run");

    let censored = run.censored_table();
    assert!(censored.row_count() <= config.num_samples);
    assert!(censored.row_count() > 0, "default censoring should leave survivors");
    assert!(
        censored.row_count() < run.full_table().row_count(),
        "groups with a positive censor shape should lose rows"
    );
}

#[test]
fn run_log_brackets_the_stages() {
    let run = SimulationPipeline::build("pipe-log".into(), &SimConfig::default_test())
        .run()
        .expect("pipeline run");

    let types: Vec<&str> = run.events().map(SimEvent::event_type).collect();
    assert_eq!(
        types,
        [
            "run_initialized",
            "features_sampled",
            "groups_assigned",
            "disease_state_assigned",
            "correlated_variable_generated",
            "bias_columns_injected",
            "bias_columns_injected",
            "bias_columns_injected",
            "rows_censored",
        ]
    );

    let log = run.event_log().expect("serialize run log");
    assert!(log.iter().enumerate().all(|(i, e)| e.seq == i as u64));
    assert_eq!(log[0].stage, "pipeline");
    assert_eq!(log.last().map(|e| e.stage.as_str()), Some("censoring"));

    match run.events().last() {
        Some(SimEvent::RowsCensored { final_rows, .. }) => {
            assert_eq!(*final_rows, run.censored_table().row_count())
        }
        other => panic!("expected rows_censored last, got {other:?}"),
    }
}

#[test]
fn zero_samples_is_rejected() {
    let mut config = SimConfig::default_test();
    config.num_samples = 0;
    let err = SimulationPipeline::build("pipe-zero".into(), &config)
        .run()
        .unwrap_err();
    assert!(err.is_config(), "got {err}");
}

#[test]
fn a_failing_stage_aborts_the_run() {
    let mut config = SimConfig::default_test();
    config.disease_config.prevalence = 150.0;
    let err = SimulationPipeline::build("pipe-fail".into(), &config)
        .run()
        .unwrap_err();
    assert!(matches!(err, SimError::Config { stage: "disease", .. }), "got {err}");
}

#[test]
fn json_configuration_runs_end_to_end() {
    let config = SimConfig::from_json_str(
        r#"{
            "num_samples": 500,
            "seed": 3,
            "feature_details": {"Income": "numerical", "EducationLevel": "ordinal"},
            "bias_config": {"numerical": {"count": 1, "base_feature": "Income"}},
            "groups_config": {
                "North": {"mean_shift": 1, "variance_factor": 1, "censor_shape": 0.2},
                "South": {"mean_shift": -1, "variance_factor": 1, "censor_shape": 0.2,
                          "censor_Sleep_probability": 0.1}
            },
            "disease_config": {"prevalence": 10},
            "correlated_config": {"Sleep": {"mean": 7, "std": 1, "correlation": -0.2}}
        }"#,
    )
    .expect("valid configuration");

    let run = SimulationPipeline::build("pipe-json".into(), &config)
        .run()
        .expect("pipeline run");
    assert!(run.full_table().has_column("numerical_biased_1_South"));
    assert!(run.full_table().has_column("Sleep"));
    assert!(run.censored_table().row_count() <= 500);
}

#[test]
fn summaries_and_histograms_cover_the_censored_table() {
    let run = SimulationPipeline::build("pipe-summary".into(), &SimConfig::default_test())
        .run()
        .expect("pipeline run");
    let censored = run.censored_table();

    let summaries = describe(censored);
    assert_eq!(summaries.len(), censored.column_count());
    let group = summaries
        .iter()
        .find_map(|s| match s {
            ColumnSummary::Text { name, unique, .. } if name == GROUP_COLUMN => Some(*unique),
            _ => None,
        })
        .expect("group summary");
    assert_eq!(group, 2);

    let histograms = liability_histograms(censored, 30).expect("histograms");
    assert_eq!(histograms.len(), 2);
    let binned: usize = histograms.iter().map(|h| h.counts.iter().sum::<usize>()).sum();
    assert_eq!(binned, censored.row_count());
    assert!(censored.has_column(DISEASE_LIABILITY_COLUMN));
}

#[test]
fn single_row_run_log_is_reproducible_and_decodable() {
    let mut config = SimConfig::default_test();
    config.num_samples = 1;
    let run_a = SimulationPipeline::build("pipe-one".into(), &config)
        .run()
        .expect("first run");
    let run_b = SimulationPipeline::build("pipe-one".into(), &config)
        .run()
        .expect("second run");

    let events_a: Vec<&SimEvent> = run_a.events().collect();
    let events_b: Vec<&SimEvent> = run_b.events().collect();
    assert_eq!(events_a, events_b, "identical single-row runs must log identically");

    for entry in run_a.event_log().expect("serialize run log") {
        let decoded: SimEvent = serde_json::from_str(&entry.payload)
            .unwrap_or_else(|e| panic!("payload {} does not decode: {e}", entry.payload));
        assert_eq!(decoded.event_type(), entry.event_type);
    }
    assert!(run_a.events().any(|e| matches!(
        e,
        SimEvent::CorrelatedVariableGenerated { realized: None, .. }
    )));
}
