//! Health-survey simulator core.
//!
//! Generates a survey-like table with group-conditional measurement bias,
//! a latent disease liability, covariates correlated with it, and a
//! non-random censoring pass. See `pipeline` for the stage order.

pub mod bias_injector;
pub mod categories;
pub mod censoring;
pub mod config;
pub mod correlated;
pub mod disease_model;
pub mod error;
pub mod event;
pub mod export;
pub mod feature_sampler;
pub mod group_assigner;
pub mod pipeline;
pub mod rng;
pub mod stage;
pub mod stats;
pub mod store;
pub mod summary;
pub mod table;
pub mod types;
