//! Conformance harness for the CRM entity API.
//!
//! Discovers every entity the registry exposes, checks that the static
//! entity list still matches, and drives each entity through metadata checks
//! and a create, get, count, delete lifecycle including rejected calls.

pub mod checks;
pub mod discovery;
pub mod error;
pub mod fixtures;
pub mod params;
pub mod report;
pub mod runner;

pub use checks::check_conformance;
pub use discovery::{
    check_entities_provider, discover_live, discover_static, to_data_provider, DataProvider,
    StaticEntityList,
};
pub use error::{ConformanceFailure, DriftError, ParamProviderError};
pub use fixtures::{DataSet, FixtureConfig};
pub use params::CreationParamProvider;
pub use report::{EntityReport, Outcome, Step, SuiteReport};
pub use runner::{ConformanceConfig, ConformanceRunner};
