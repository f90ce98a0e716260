use thiserror::Error;
use uuid::Uuid;

use crate::integrity::violation::IntegrityViolation;

impl From<serde_json::Error> for BaselineError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<sqlx::Error> for BaselineError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError(format!("Database error: {}", err))
    }
}

impl From<config::ConfigError> for BaselineError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<IntegrityViolation> for BaselineError {
    fn from(violation: IntegrityViolation) -> Self {
        Self::IntegrityViolation(violation)
    }
}

#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {0}")]
    StateError(String),

    #[error("Budget {0} is already frozen")]
    BudgetAlreadyFrozen(Uuid),

    #[error("Budget {budget_id} has no schedule plan for project {project_id}")]
    MissingSchedule { budget_id: Uuid, project_id: Uuid },

    #[error("Schedule plan {plan_id} is frozen: {operation} rejected")]
    ScheduleFrozen { plan_id: Uuid, operation: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Concurrent modification of {entity} {id}: version {version} is stale")]
    Conflict {
        entity: &'static str,
        id: Uuid,
        version: i64,
    },

    #[error("{0}")]
    IntegrityViolation(IntegrityViolation),

    #[error("Audit sink error: {0}")]
    AuditError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected synchronously, never retried.
    Precondition,
    NotFound,
    /// Stale version on persist; the caller may reload and retry.
    Conflict,
    IntegrityViolation,
    /// Never propagated out of the audit log.
    AuditSink,
    Infrastructure,
}

impl BaselineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_)
            | Self::StateError(_)
            | Self::BudgetAlreadyFrozen(_)
            | Self::MissingSchedule { .. }
            | Self::ScheduleFrozen { .. } => ErrorKind::Precondition,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::IntegrityViolation(_) => ErrorKind::IntegrityViolation,
            Self::AuditError(_) => ErrorKind::AuditSink,
            Self::DatabaseError(_) | Self::ConfigError(_) | Self::SerializationError(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    pub fn budget_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Budget", id }
    }

    pub fn plan_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Schedule plan",
            id,
        }
    }

    pub fn schedule_frozen(plan_id: Uuid, operation: &str) -> Self {
        Self::ScheduleFrozen {
            plan_id,
            operation: operation.to_string(),
        }
    }
}
