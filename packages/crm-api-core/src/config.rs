//! API configuration.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Optional application component that owns a group of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    CiviCase,
    CiviContribute,
    CiviEvent,
    CiviMember,
}

impl Component {
    /// Every known component.
    pub const ALL: [Component; 4] = [
        Component::CiviCase,
        Component::CiviContribute,
        Component::CiviEvent,
        Component::CiviMember,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::CiviCase => "CiviCase",
            Component::CiviContribute => "CiviContribute",
            Component::CiviEvent => "CiviEvent",
            Component::CiviMember => "CiviMember",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ApiError::UnknownComponent(s.to_string()))
    }
}

/// Setup step applied to the registry's component state before discovery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ComponentSetup {
    /// Leave components as configured
    #[default]
    AsConfigured,
    /// Enable every known component
    EnableAll,
    /// Enable the listed components in addition to the configured ones
    Enable(Vec<Component>),
}

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Components enabled when the registry is built
    pub enabled_components: BTreeSet<Component>,
    /// Permissions granted to the acting session
    pub granted_permissions: BTreeSet<String>,
}

impl ApiConfig {
    /// Configuration with every component enabled.
    pub fn all_components() -> Self {
        Self {
            enabled_components: Component::ALL.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Adds a granted permission.
    pub fn grant(mut self, permission: impl Into<String>) -> Self {
        self.granted_permissions.insert(permission.into());
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            // CiviCase ships disabled
            enabled_components: [
                Component::CiviContribute,
                Component::CiviEvent,
                Component::CiviMember,
            ]
            .into_iter()
            .collect(),
            granted_permissions: ["access CiviCRM".to_string()].into_iter().collect(),
        }
    }
}
