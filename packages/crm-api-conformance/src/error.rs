//! Error types for the conformance harness.

use thiserror::Error;

use crm_api_core::ApiError;

use crate::report::Step;

/// A conformance assertion that did not hold.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{step}: {message}")]
pub struct ConformanceFailure {
    pub step: Step,
    pub message: String,
}

impl ConformanceFailure {
    pub fn new(step: Step, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// The static entity list and the live registry disagree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriftError {
    #[error(
        "The static list of entities does not match the live list. You probably need to update the static entity list. Missing: [{}]. Extra: [{}]",
        .missing.join(", "),
        .extra.join(", ")
    )]
    Mismatch {
        /// Live entities absent from the static list
        missing: Vec<String>,
        /// Static entries with no live entity
        extra: Vec<String>,
    },

    #[error("Live entity discovery failed: {0}")]
    Api(#[from] ApiError),
}

/// Creation values could not be produced for an entity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamProviderError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Foreign keys of {entity} nest deeper than {max_depth} levels")]
    TooDeep { entity: String, max_depth: usize },

    #[error("Cannot generate a value for {entity}.{field} of type '{data_type}'")]
    UnsupportedField {
        entity: String,
        field: String,
        data_type: String,
    },

    #[error("Creating {entity} for a foreign key returned no id")]
    MissingId { entity: String },
}
