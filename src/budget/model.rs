//! Budget aggregate root and its integrity seal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BaselineError;
use crate::integrity::violation::IntegrityViolation;

/// Cryptographic seal attached when a budget is approved.
///
/// Exists only as a whole: a frozen budget always carries the approval
/// hash, algorithm, sealer and instant together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegritySeal {
    pub approval_hash: String,
    pub execution_hash: Option<String>,
    pub algorithm: String,
    pub sealed_by: Uuid,
    pub sealed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "seal")]
pub enum BudgetState {
    Draft,
    Frozen(IntegritySeal),
}

impl BudgetState {
    /// Label mixed into the approval hash.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Frozen(_) => "FROZEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    id: Uuid,
    project_id: Uuid,
    name: String,
    contractual: bool,
    state: BudgetState,
    version: i64,
}

/// Flat persisted form of a budget, before invariants are checked.
#[derive(Debug, Clone, Default)]
pub struct BudgetRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub contractual: bool,
    pub approval_hash: Option<String>,
    pub execution_hash: Option<String>,
    pub algorithm: Option<String>,
    pub sealed_by: Option<Uuid>,
    pub sealed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

fn normalize_name(name: &str) -> Result<String, BaselineError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BaselineError::ValidationError(
            "Budget name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

impl Budget {
    pub fn new(project_id: Uuid, name: &str) -> Result<Self, BaselineError> {
        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            name: normalize_name(name)?,
            contractual: false,
            state: BudgetState::Draft,
            version: 0,
        })
    }

    /// Rebuild a budget from its persisted form.
    pub fn restore(record: BudgetRecord) -> Result<Self, BaselineError> {
        let name = normalize_name(&record.name)?;
        let state = match (
            record.approval_hash,
            record.algorithm,
            record.sealed_by,
            record.sealed_at,
        ) {
            (None, None, None, None) => {
                if record.execution_hash.is_some() {
                    return Err(BaselineError::ValidationError(format!(
                        "Budget {}: execution hash present without a seal",
                        record.id
                    )));
                }
                BudgetState::Draft
            }
            (Some(approval_hash), Some(algorithm), Some(sealed_by), Some(sealed_at)) => {
                BudgetState::Frozen(IntegritySeal {
                    approval_hash,
                    execution_hash: record.execution_hash,
                    algorithm,
                    sealed_by,
                    sealed_at,
                })
            }
            _ => {
                return Err(BaselineError::ValidationError(format!(
                    "Budget {}: partial integrity seal",
                    record.id
                )))
            }
        };

        Ok(Self {
            id: record.id,
            project_id: record.project_id,
            name,
            contractual: record.contractual,
            state,
            version: record.version,
        })
    }

    pub fn to_record(&self) -> BudgetRecord {
        let seal = self.seal();
        BudgetRecord {
            id: self.id,
            project_id: self.project_id,
            name: self.name.clone(),
            contractual: self.contractual,
            approval_hash: seal.map(|s| s.approval_hash.clone()),
            execution_hash: seal.and_then(|s| s.execution_hash.clone()),
            algorithm: seal.map(|s| s.algorithm.clone()),
            sealed_by: seal.map(|s| s.sealed_by),
            sealed_at: seal.map(|s| s.sealed_at),
            version: self.version,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_contractual(&self) -> bool {
        self.contractual
    }

    pub fn state(&self) -> &BudgetState {
        &self.state
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, BudgetState::Frozen(_))
    }

    pub fn seal(&self) -> Option<&IntegritySeal> {
        match &self.state {
            BudgetState::Frozen(seal) => Some(seal),
            BudgetState::Draft => None,
        }
    }

    pub fn approval_hash(&self) -> Option<&str> {
        self.seal().map(|s| s.approval_hash.as_str())
    }

    pub fn execution_hash(&self) -> Option<&str> {
        self.seal().and_then(|s| s.execution_hash.as_deref())
    }

    fn guard_unsealed(&self) -> Result<(), BaselineError> {
        if let Some(seal) = self.seal() {
            return Err(IntegrityViolation::structure_modification(self.id, &seal.approval_hash).into());
        }
        Ok(())
    }

    pub fn rename(&mut self, name: &str) -> Result<(), BaselineError> {
        self.guard_unsealed()?;
        self.name = normalize_name(name)?;
        Ok(())
    }

    pub fn mark_contractual(&mut self) -> Result<(), BaselineError> {
        self.guard_unsealed()?;
        self.contractual = true;
        Ok(())
    }

    /// Copy of this budget as it reads once sealed: frozen and contractual.
    /// The approval hash is computed over this form so validation can
    /// reproduce it from the persisted budget.
    pub(crate) fn as_sealed_form(&self, placeholder: IntegritySeal) -> Self {
        let mut sealed = self.clone();
        sealed.contractual = true;
        sealed.state = BudgetState::Frozen(placeholder);
        sealed
    }

    pub(crate) fn apply_seal(&mut self, seal: IntegritySeal) -> Result<(), BaselineError> {
        if self.is_frozen() {
            return Err(BaselineError::BudgetAlreadyFrozen(self.id));
        }
        self.contractual = true;
        self.state = BudgetState::Frozen(seal);
        Ok(())
    }

    pub(crate) fn set_execution_hash(&mut self, hash: String) -> Result<(), BaselineError> {
        match &mut self.state {
            BudgetState::Frozen(seal) => {
                seal.execution_hash = Some(hash);
                Ok(())
            }
            BudgetState::Draft => Err(BaselineError::StateError(format!(
                "Budget {} is not sealed",
                self.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::violation::ViolationType;

    fn seal() -> IntegritySeal {
        IntegritySeal {
            approval_hash: "a".repeat(64),
            execution_hash: None,
            algorithm: "SHA-256-v1".to_string(),
            sealed_by: Uuid::new_v4(),
            sealed_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_budget_is_draft_and_trimmed() {
        let budget = Budget::new(Uuid::new_v4(), "  Tower A  ").unwrap();
        assert_eq!(budget.name(), "Tower A");
        assert_eq!(budget.state(), &BudgetState::Draft);
        assert!(!budget.is_contractual());
        assert!(budget.approval_hash().is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(Budget::new(Uuid::new_v4(), " ").is_err());
    }

    #[test]
    fn test_sealed_budget_rejects_structure_changes() {
        let mut budget = Budget::new(Uuid::new_v4(), "Tower A").unwrap();
        budget.apply_seal(seal()).unwrap();
        assert!(budget.is_contractual());

        match budget.rename("Tower B") {
            Err(BaselineError::IntegrityViolation(v)) => {
                assert_eq!(v.violation_type, ViolationType::StructureModificationAttempted)
            }
            other => panic!("expected violation, got {:?}", other),
        }
        assert!(budget.mark_contractual().is_err());
        assert!(matches!(
            budget.apply_seal(seal()),
            Err(BaselineError::BudgetAlreadyFrozen(_))
        ));
    }

    #[test]
    fn test_record_round_trip_keeps_seal() {
        let mut budget = Budget::new(Uuid::new_v4(), "Tower A").unwrap();
        budget.apply_seal(seal()).unwrap();
        budget.set_execution_hash("b".repeat(64)).unwrap();

        let restored = Budget::restore(budget.to_record()).unwrap();
        assert_eq!(restored, budget);
    }

    #[test]
    fn test_partial_seal_rejected() {
        let record = BudgetRecord {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            name: "Tower A".to_string(),
            approval_hash: Some("a".repeat(64)),
            ..Default::default()
        };
        assert!(Budget::restore(record).is_err());
    }
}
