//! Outcomes and reports of a conformance run.

use std::fmt;

use serde::Serialize;

/// Checks run for each entity, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Info,
    Actions,
    Fields,
    Creation,
    Get,
    GetCount,
    UpdateRejection,
    WrongParamType,
    DeleteWithoutId,
    Deletion,
    PostDelete,
}

impl Step {
    pub const ALL: [Step; 11] = [
        Step::Info,
        Step::Actions,
        Step::Fields,
        Step::Creation,
        Step::Get,
        Step::GetCount,
        Step::UpdateRejection,
        Step::WrongParamType,
        Step::DeleteWithoutId,
        Step::Deletion,
        Step::PostDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Info => "info",
            Step::Actions => "actions",
            Step::Fields => "fields",
            Step::Creation => "creation",
            Step::Get => "get",
            Step::GetCount => "get count",
            Step::UpdateRejection => "update rejection",
            Step::WrongParamType => "wrong param type",
            Step::DeleteWithoutId => "delete without id",
            Step::Deletion => "deletion",
            Step::PostDelete => "post delete",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of checking one entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step passed
    Complete,
    /// Not a CRUD entity; lifecycle steps did not run
    Skipped { reason: String },
    /// A step failed; later steps did not run
    Failed { step: Step, message: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Complete => f.write_str("ok"),
            Outcome::Skipped { reason } => write!(f, "skipped: {}", reason),
            Outcome::Failed { step, message } => write!(f, "FAILED at {}: {}", step, message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityReport {
    pub entity: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Report of a whole suite run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SuiteReport {
    /// Discovery drift, if the static list is out of date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<String>,
    pub entities: Vec<EntityReport>,
}

impl SuiteReport {
    pub fn push(&mut self, entity: impl Into<String>, outcome: Outcome) {
        self.entities.push(EntityReport {
            entity: entity.into(),
            outcome,
        });
    }

    pub fn outcome(&self, entity: &str) -> Option<&Outcome> {
        self.entities
            .iter()
            .find(|r| r.entity == entity)
            .map(|r| &r.outcome)
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Complete))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failure)
    }

    pub fn failures(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities.iter().filter(|r| r.outcome.is_failure())
    }

    /// No drift and no failed entity.
    pub fn is_success(&self) -> bool {
        self.drift.is_none() && self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.entities.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(drift) = &self.drift {
            writeln!(f, "drift: {}", drift)?;
        }
        let width = self.entities.iter().map(|r| r.entity.len()).max().unwrap_or(0);
        for report in &self.entities {
            writeln!(f, "{:<width$}  {}", report.entity, report.outcome, width = width)?;
        }
        write!(
            f,
            "{} entities: {} complete, {} skipped, {} failed",
            self.entities.len(),
            self.completed(),
            self.skipped(),
            self.failed()
        )
    }
}
