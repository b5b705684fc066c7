//! Shared primitive types and well-known column names.

/// The canonical run identifier.
pub type RunId = String;

/// Group label column written by the group assigner.
pub const GROUP_COLUMN: &str = "Group";

/// Latent liability column written by the disease model.
pub const DISEASE_LIABILITY_COLUMN: &str = "DiseaseLiability";

/// Binary disease state column written by the disease model.
pub const DISEASE_STATE_COLUMN: &str = "DiseaseState";

/// Socioeconomic covariates the censoring model reads.
pub const INCOME_COLUMN: &str = "Income";
pub const EDUCATION_COLUMN: &str = "EducationLevel";
