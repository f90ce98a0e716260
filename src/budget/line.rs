//! Budget line (work-breakdown tree node).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BaselineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub id: Uuid,
    pub budget_id: Uuid,
    pub parent_id: Option<Uuid>,
    /// WBS code, e.g. "01.02.03".
    pub item_code: String,
    pub description: String,
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub assigned_amount: Decimal,
    /// Depth in the tree, 1 for roots.
    pub level: u32,
    pub actual_spend: Decimal,
    pub pending_commitments: Decimal,
    pub version: i64,
}

impl BudgetLine {
    /// Create a top-level line.
    pub fn root(
        budget_id: Uuid,
        item_code: &str,
        description: &str,
        unit: Option<&str>,
        quantity: Decimal,
        assigned_amount: Decimal,
    ) -> Result<Self, BaselineError> {
        let line = Self {
            id: Uuid::new_v4(),
            budget_id,
            parent_id: None,
            item_code: item_code.trim().to_string(),
            description: description.trim().to_string(),
            unit: unit.map(|u| u.trim().to_string()),
            quantity,
            assigned_amount,
            level: 1,
            actual_spend: Decimal::ZERO,
            pending_commitments: Decimal::ZERO,
            version: 0,
        };
        line.validate()?;
        Ok(line)
    }

    /// Create a line nested under `parent`, one level deeper.
    pub fn child(
        parent: &BudgetLine,
        item_code: &str,
        description: &str,
        unit: Option<&str>,
        quantity: Decimal,
        assigned_amount: Decimal,
    ) -> Result<Self, BaselineError> {
        let mut line = Self::root(
            parent.budget_id,
            item_code,
            description,
            unit,
            quantity,
            assigned_amount,
        )?;
        line.parent_id = Some(parent.id);
        line.level = parent.level + 1;
        Ok(line)
    }

    /// Check the field-level invariants of a single line.
    pub fn validate(&self) -> Result<(), BaselineError> {
        if self.item_code.trim().is_empty() {
            return Err(BaselineError::ValidationError(format!(
                "Line {}: item code cannot be empty",
                self.id
            )));
        }
        if self.description.trim().is_empty() {
            return Err(BaselineError::ValidationError(format!(
                "Line {}: description cannot be empty",
                self.id
            )));
        }
        if self.level < 1 {
            return Err(BaselineError::ValidationError(format!(
                "Line {}: level must be >= 1",
                self.id
            )));
        }
        if self.parent_id.is_none() && self.level != 1 {
            return Err(BaselineError::ValidationError(format!(
                "Line {}: root lines must be at level 1, found {}",
                self.id, self.level
            )));
        }
        for (field, value) in [
            ("quantity", self.quantity),
            ("assigned amount", self.assigned_amount),
            ("actual spend", self.actual_spend),
            ("pending commitments", self.pending_commitments),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(BaselineError::ValidationError(format!(
                    "Line {}: {} cannot be negative ({})",
                    self.id, field, value
                )));
            }
        }
        Ok(())
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Assigned amount not yet spent or committed.
    pub fn remaining_balance(&self) -> Decimal {
        self.assigned_amount - self.actual_spend - self.pending_commitments
    }

    pub fn with_financials(mut self, actual_spend: Decimal, pending_commitments: Decimal) -> Self {
        self.actual_spend = actual_spend;
        self.pending_commitments = pending_commitments;
        self
    }
}

/// Check tree invariants across all lines of one budget: every parent is a
/// line of the same budget and every child sits one level below its parent.
pub fn validate_tree(budget_id: Uuid, lines: &[BudgetLine]) -> Result<(), BaselineError> {
    use std::collections::HashMap;

    let by_id: HashMap<Uuid, &BudgetLine> = lines.iter().map(|l| (l.id, l)).collect();
    if by_id.len() != lines.len() {
        return Err(BaselineError::ValidationError(format!(
            "Budget {}: duplicate line identifiers",
            budget_id
        )));
    }

    for line in lines {
        line.validate()?;
        if line.budget_id != budget_id {
            return Err(BaselineError::ValidationError(format!(
                "Line {} belongs to budget {}, not {}",
                line.id, line.budget_id, budget_id
            )));
        }
        if let Some(parent_id) = line.parent_id {
            let parent = by_id.get(&parent_id).ok_or_else(|| {
                BaselineError::ValidationError(format!(
                    "Line {}: parent {} is not part of budget {}",
                    line.id, parent_id, budget_id
                ))
            })?;
            if line.level != parent.level + 1 {
                return Err(BaselineError::ValidationError(format!(
                    "Line {}: level {} does not follow parent level {}",
                    line.id, line.level, parent.level
                )));
            }
        }
    }
    Ok(())
}
