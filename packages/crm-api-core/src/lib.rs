//! In-memory CRM entity API.
//!
//! Entities expose capabilities through the [`entity`] traits, the
//! [`registry`] resolves them to [`action::Api`] handles gated by
//! components, and records live in copy-on-write [`table`]s.

pub mod action;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod registry;
pub mod table;
pub mod types;

pub use action::{ActionKind, Api, ApiResult};
pub use config::{ApiConfig, Component, ComponentSetup};
pub use error::{ApiError, Result};
pub use registry::EntityRegistry;
pub use table::Record;
