//! Run configuration.
//!
//! Every map is a `BTreeMap`: stages iterate configuration in key order,
//! and that order is part of the reproducibility contract (it fixes the
//! sequence of RNG draws).

use crate::error::{SimError, SimResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_NUM_SAMPLES: usize = 10_000;
pub const DEFAULT_SEED: u64 = 42;

const CONFIG_STAGE: &str = "config";

/// Type tag of a base covariate (and of a bias type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Numerical,
    Ordinal,
    Categorical,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numerical => "numerical",
            Self::Ordinal => "ordinal",
            Self::Categorical => "categorical",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "numerical" => Some(Self::Numerical),
            "ordinal" => Some(Self::Ordinal),
            "categorical" => Some(Self::Categorical),
            _ => None,
        }
    }
}

/// Feature name → type tag.
pub type FeatureSpec = BTreeMap<String, FeatureKind>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasSpec {
    pub count: usize,
    /// Column the numerical bias is derived from. Unused by the other kinds.
    #[serde(default)]
    pub base_feature: Option<String>,
}

/// Bias type ("numerical" | "ordinal" | "categorical") → settings.
pub type BiasConfig = BTreeMap<String, BiasSpec>;

fn default_disease_mean_shift() -> f64 {
    0.0
}

fn default_disease_variance_factor() -> f64 {
    1.0
}

/// Per-group parameters. Fields only some stages need are optional here
/// and required by the stage that reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupParams {
    #[serde(default)]
    pub mean_shift: Option<f64>,
    #[serde(default)]
    pub variance_factor: Option<f64>,
    #[serde(default = "default_disease_mean_shift")]
    pub disease_mean_shift: f64,
    /// Standard deviation of the group's liability shift.
    #[serde(default = "default_disease_variance_factor")]
    pub disease_variance_factor: f64,
    #[serde(default)]
    pub censor_shape: Option<f64>,
    /// `censor_{var}_probability` keys and anything else not named above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for GroupParams {
    fn default() -> Self {
        Self {
            mean_shift: None,
            variance_factor: None,
            disease_mean_shift: default_disease_mean_shift(),
            disease_variance_factor: default_disease_variance_factor(),
            censor_shape: None,
            extra: BTreeMap::new(),
        }
    }
}

impl GroupParams {
    pub fn mean_shift(&self, stage: &'static str, group: &str) -> SimResult<f64> {
        require(self.mean_shift, stage, group, "mean_shift")
    }

    pub fn variance_factor(&self, stage: &'static str, group: &str) -> SimResult<f64> {
        require(self.variance_factor, stage, group, "variance_factor")
    }

    pub fn censor_shape(&self, stage: &'static str, group: &str) -> SimResult<f64> {
        require(self.censor_shape, stage, group, "censor_shape")
    }

    /// Probability of dropping a row of this group on behalf of the
    /// correlated variable `var`. Missing means 0.
    pub fn censor_probability(&self, stage: &'static str, group: &str, var: &str) -> SimResult<f64> {
        let key = censor_probability_key(var);
        match self.extra.get(&key) {
            None => Ok(0.0),
            Some(value) => {
                let p = value.as_f64().ok_or_else(|| {
                    SimError::config(stage, format!("groups_config.{group}.{key}"), "expected a number")
                })?;
                if !(0.0..=1.0).contains(&p) {
                    return Err(SimError::config(
                        stage,
                        format!("groups_config.{group}.{key}"),
                        format!("probability {p} outside [0, 1]"),
                    ));
                }
                Ok(p)
            }
        }
    }

    /// Keys outside the named fields must have the form
    /// `censor_{var}_probability`; anything else is reported, not ignored.
    pub fn check_keys(&self, group: &str) -> SimResult<()> {
        for key in self.extra.keys() {
            let var = key
                .strip_prefix("censor_")
                .and_then(|k| k.strip_suffix("_probability"));
            if !matches!(var, Some(v) if !v.is_empty()) {
                return Err(SimError::config(
                    CONFIG_STAGE,
                    format!("groups_config.{group}.{key}"),
                    "unknown key",
                ));
            }
        }
        Ok(())
    }

    pub fn with_censor_probability(mut self, var: &str, p: f64) -> Self {
        self.extra.insert(censor_probability_key(var), serde_json::Value::from(p));
        self
    }
}

fn censor_probability_key(var: &str) -> String {
    format!("censor_{var}_probability")
}

fn check_groups(groups: &GroupsConfig) -> SimResult<()> {
    groups
        .iter()
        .try_for_each(|(group, params)| params.check_keys(group))
}

fn require(value: Option<f64>, stage: &'static str, group: &str, field: &str) -> SimResult<f64> {
    value.ok_or_else(|| {
        SimError::config(stage, format!("groups_config.{group}.{field}"), "missing required key")
    })
}

pub type GroupsConfig = BTreeMap<String, GroupParams>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseConfig {
    /// Percentage of the population that is disease-positive, in [0, 100].
    pub prevalence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedSpec {
    pub mean: f64,
    pub std: f64,
    pub correlation: f64,
}

/// Variable name → target moments and correlation with the liability.
pub type CorrelatedConfig = BTreeMap<String, CorrelatedSpec>;

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub num_samples: usize,
    pub feature_details: FeatureSpec,
    #[serde(default)]
    pub bias_config: BiasConfig,
    pub groups_config: GroupsConfig,
    pub disease_config: DiseaseConfig,
    #[serde(default)]
    pub correlated_config: CorrelatedConfig,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl SimConfig {
    /// Read a complete configuration document from a JSON file.
    pub fn load(path: &str) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> SimResult<Self> {
        let config: Self = parse_section(content, "<document>")?;
        check_groups(&config.groups_config)?;
        Ok(config)
    }

    /// Build a configuration from the three JSON documents the runner takes
    /// on its command line, with the survey's default base features.
    pub fn from_cli_args(bias: &str, groups: &str, disease: &str) -> SimResult<Self> {
        let groups_config: GroupsConfig = parse_section(groups, "groups_config")?;
        check_groups(&groups_config)?;
        Ok(Self {
            num_samples: DEFAULT_NUM_SAMPLES,
            feature_details: Self::default_features(),
            bias_config: parse_section(bias, "bias_config")?,
            groups_config,
            disease_config: parse_section(disease, "disease_config")?,
            correlated_config: CorrelatedConfig::new(),
            seed: DEFAULT_SEED,
        })
    }

    /// Income, EducationLevel and Employment: the covariates the censoring
    /// model and the default bias configurations refer to.
    pub fn default_features() -> FeatureSpec {
        FeatureSpec::from([
            ("Income".to_string(), FeatureKind::Numerical),
            ("EducationLevel".to_string(), FeatureKind::Ordinal),
            ("Employment".to_string(), FeatureKind::Categorical),
        ])
    }

    /// Small two-group configuration used by tests.
    pub fn default_test() -> Self {
        let group_a = GroupParams {
            mean_shift: Some(5.0),
            variance_factor: Some(2.0),
            disease_mean_shift: 0.5,
            disease_variance_factor: 0.5,
            censor_shape: Some(1.5),
            extra: BTreeMap::new(),
        }
        .with_censor_probability("BMI", 0.05);

        let group_b = GroupParams {
            mean_shift: Some(-5.0),
            variance_factor: Some(0.5),
            disease_mean_shift: -0.5,
            disease_variance_factor: 0.5,
            censor_shape: Some(0.5),
            extra: BTreeMap::new(),
        };

        Self {
            num_samples: 2_000,
            feature_details: Self::default_features(),
            bias_config: BiasConfig::from([
                (
                    "numerical".to_string(),
                    BiasSpec { count: 2, base_feature: Some("Income".into()) },
                ),
                ("ordinal".to_string(), BiasSpec { count: 1, base_feature: None }),
                ("categorical".to_string(), BiasSpec { count: 1, base_feature: None }),
            ]),
            groups_config: GroupsConfig::from([
                ("GroupA".to_string(), group_a),
                ("GroupB".to_string(), group_b),
            ]),
            disease_config: DiseaseConfig { prevalence: 20.0 },
            correlated_config: CorrelatedConfig::from([(
                "BMI".to_string(),
                CorrelatedSpec { mean: 0.0, std: 1.0, correlation: 0.5 },
            )]),
            seed: DEFAULT_SEED,
        }
    }
}

/// Decode one JSON section, reporting failures as configuration errors
/// keyed by the section name.
pub fn parse_section<T: DeserializeOwned>(content: &str, key: &str) -> SimResult<T> {
    serde_json::from_str(content).map_err(|e| SimError::config(CONFIG_STAGE, key, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_config_reads_censor_probabilities_from_extra_keys() {
        let groups: GroupsConfig = parse_section(
            r#"{"A": {"mean_shift": 1, "variance_factor": 2, "censor_shape": 0.5,
                      "censor_BMI_probability": 0.25}}"#,
            "groups_config",
        )
        .unwrap();
        let a = &groups["A"];
        assert_eq!(a.disease_mean_shift, 0.0);
        assert_eq!(a.disease_variance_factor, 1.0);
        assert_eq!(a.censor_probability("censoring", "A", "BMI").unwrap(), 0.25);
        assert_eq!(a.censor_probability("censoring", "A", "Glucose").unwrap(), 0.0);
    }

    #[test]
    fn missing_group_key_names_group_and_field() {
        let params = GroupParams::default();
        let err = params.mean_shift("bias", "A").unwrap_err();
        match err {
            SimError::Config { stage, key, .. } => {
                assert_eq!(stage, "bias");
                assert_eq!(key, "groups_config.A.mean_shift");
            }
            other => panic!("expected config error, got {other}"),
        }
    }

    #[test]
    fn unknown_feature_tag_is_a_config_error() {
        let err = SimConfig::from_json_str(
            r#"{"num_samples": 10, "feature_details": {"Income": "continuous"},
                "groups_config": {"A": {}}, "disease_config": {"prevalence": 10}}"#,
        )
        .unwrap_err();
        assert!(err.is_config(), "expected config error, got {err}");
    }

    #[test]
    fn cli_args_use_default_features() {
        let config = SimConfig::from_cli_args(
            r#"{"numerical": {"count": 1, "base_feature": "Income"}}"#,
            r#"{"A": {"mean_shift": 1, "variance_factor": 1, "censor_shape": 1}}"#,
            r#"{"prevalence": 15}"#,
        )
        .unwrap();
        assert_eq!(config.num_samples, DEFAULT_NUM_SAMPLES);
        assert_eq!(config.feature_details.len(), 3);
        assert_eq!(config.feature_details["EducationLevel"], FeatureKind::Ordinal);
        assert_eq!(config.disease_config.prevalence, 15.0);
    }

    #[test]
    fn malformed_cli_section_is_keyed_by_section() {
        let err = SimConfig::from_cli_args("{}", "{not json", r#"{"prevalence": 1}"#).unwrap_err();
        match err {
            SimError::Config { key, .. } => assert_eq!(key, "groups_config"),
            other => panic!("expected config error, got {other}"),
        }
    }

    #[test]
    fn misspelled_group_key_is_a_config_error() {
        let err = SimConfig::from_cli_args(
            "{}",
            r#"{"A": {"censor_shape": 1, "disease_mean_shfit": 2}}"#,
            r#"{"prevalence": 10}"#,
        )
        .unwrap_err();
        match err {
            SimError::Config { key, .. } => assert_eq!(key, "groups_config.A.disease_mean_shfit"),
            other => panic!("expected config error, got {other}"),
        }

        let err = SimConfig::from_cli_args(
            "{}",
            r#"{"A": {"censor_shape": 1, "censor__probability": 0.1}}"#,
            r#"{"prevalence": 10}"#,
        )
        .unwrap_err();
        assert!(err.is_config(), "an empty variable name is not a censoring key: {err}");
    }

    #[test]
    fn load_reads_a_document_from_disk() {
        let path = std::env::temp_dir().join(format!("healthsim-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"num_samples": 250, "seed": 9,
                "feature_details": {"Income": "numerical", "EducationLevel": "ordinal"},
                "groups_config": {"A": {"censor_shape": 1, "censor_BMI_probability": 0.2}},
                "disease_config": {"prevalence": 30}}"#,
        )
        .unwrap();

        let loaded = SimConfig::load(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        let config = loaded.unwrap();
        assert_eq!((config.num_samples, config.seed), (250, 9));
        assert!(config.bias_config.is_empty());
        assert_eq!(config.groups_config["A"].censor_probability("censoring", "A", "BMI").unwrap(), 0.2);

        assert!(SimConfig::load("/nonexistent/healthsim.json").is_err());
    }
}
