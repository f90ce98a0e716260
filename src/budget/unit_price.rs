//! Unit-price analysis snapshot captured from an external catalog.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BaselineError;

/// One resource of the unit-price breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub external_resource_id: String,
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl InputSnapshot {
    pub fn new(
        external_resource_id: &str,
        name: &str,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Result<Self, BaselineError> {
        let input = Self {
            external_resource_id: external_resource_id.trim().to_string(),
            name: name.trim().to_string(),
            quantity,
            unit_price,
        };
        input.validate()?;
        Ok(input)
    }

    fn validate(&self) -> Result<(), BaselineError> {
        if self.external_resource_id.is_empty() || self.name.is_empty() {
            return Err(BaselineError::ValidationError(
                "Input resource id and name are required".to_string(),
            ));
        }
        if self.quantity.is_sign_negative() && !self.quantity.is_zero() {
            return Err(BaselineError::ValidationError(format!(
                "Input {}: quantity cannot be negative",
                self.external_resource_id
            )));
        }
        if self.unit_price.is_sign_negative() && !self.unit_price.is_zero() {
            return Err(BaselineError::ValidationError(format!(
                "Input {}: unit price cannot be negative",
                self.external_resource_id
            )));
        }
        self.subtotal()?;
        Ok(())
    }

    /// Always derived, never stored.
    pub fn subtotal(&self) -> Result<Decimal, BaselineError> {
        self.quantity.checked_mul(self.unit_price).ok_or_else(|| {
            BaselineError::ValidationError(format!(
                "Input {}: subtotal of {} x {} overflows",
                self.external_resource_id, self.quantity, self.unit_price
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPriceSnapshot {
    id: Uuid,
    line_id: Uuid,
    external_catalog_id: String,
    catalog_source: String,
    original_yield: Decimal,
    current_yield: Decimal,
    yield_changed: bool,
    yield_changed_by: Option<Uuid>,
    yield_changed_at: Option<DateTime<Utc>>,
    unit: String,
    captured_at: DateTime<Utc>,
    inputs: Vec<InputSnapshot>,
}

#[derive(Debug, Clone)]
pub struct UnitPriceSnapshotRecord {
    pub id: Uuid,
    pub line_id: Uuid,
    pub external_catalog_id: String,
    pub catalog_source: String,
    pub original_yield: Decimal,
    pub current_yield: Decimal,
    pub yield_changed_by: Option<Uuid>,
    pub yield_changed_at: Option<DateTime<Utc>>,
    pub unit: String,
    pub captured_at: DateTime<Utc>,
    pub inputs: Vec<InputSnapshot>,
}

fn require_positive(label: &str, value: Decimal) -> Result<(), BaselineError> {
    if value <= Decimal::ZERO {
        return Err(BaselineError::ValidationError(format!(
            "{} must be positive, got {}",
            label, value
        )));
    }
    Ok(())
}

fn require_text(label: &str, value: &str) -> Result<String, BaselineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BaselineError::ValidationError(format!(
            "{} cannot be empty",
            label
        )));
    }
    Ok(trimmed.to_string())
}

impl UnitPriceSnapshot {
    pub fn capture(
        line_id: Uuid,
        external_catalog_id: &str,
        catalog_source: &str,
        original_yield: Decimal,
        unit: &str,
        inputs: Vec<InputSnapshot>,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, BaselineError> {
        Self::restore(UnitPriceSnapshotRecord {
            id: Uuid::new_v4(),
            line_id,
            external_catalog_id: external_catalog_id.to_string(),
            catalog_source: catalog_source.to_string(),
            original_yield,
            current_yield: original_yield,
            yield_changed_by: None,
            yield_changed_at: None,
            unit: unit.to_string(),
            captured_at,
            inputs,
        })
    }

    pub fn restore(record: UnitPriceSnapshotRecord) -> Result<Self, BaselineError> {
        require_positive("Original yield", record.original_yield)?;
        require_positive("Current yield", record.current_yield)?;
        for input in &record.inputs {
            input.validate()?;
        }
        let yield_changed = record.current_yield != record.original_yield;
        Ok(Self {
            id: record.id,
            line_id: record.line_id,
            external_catalog_id: require_text("External catalog id", &record.external_catalog_id)?,
            catalog_source: require_text("Catalog source", &record.catalog_source)?,
            original_yield: record.original_yield,
            current_yield: record.current_yield,
            yield_changed,
            yield_changed_by: record.yield_changed_by,
            yield_changed_at: record.yield_changed_at,
            unit: require_text("Unit", &record.unit)?,
            captured_at: record.captured_at,
            inputs: record.inputs,
        })
    }

    pub fn to_record(&self) -> UnitPriceSnapshotRecord {
        UnitPriceSnapshotRecord {
            id: self.id,
            line_id: self.line_id,
            external_catalog_id: self.external_catalog_id.clone(),
            catalog_source: self.catalog_source.clone(),
            original_yield: self.original_yield,
            current_yield: self.current_yield,
            yield_changed_by: self.yield_changed_by,
            yield_changed_at: self.yield_changed_at,
            unit: self.unit.clone(),
            captured_at: self.captured_at,
            inputs: self.inputs.clone(),
        }
    }

    /// Override the yield used for costing. The original stays untouched.
    pub fn update_current_yield(
        &mut self,
        new_yield: Decimal,
        changed_by: Uuid,
        changed_at: DateTime<Utc>,
    ) -> Result<(), BaselineError> {
        require_positive("Current yield", new_yield)?;
        self.current_yield = new_yield;
        self.yield_changed = new_yield != self.original_yield;
        self.yield_changed_by = Some(changed_by);
        self.yield_changed_at = Some(changed_at);
        Ok(())
    }

    pub fn yield_deviation(&self) -> Decimal {
        self.current_yield - self.original_yield
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn line_id(&self) -> Uuid {
        self.line_id
    }

    pub fn external_catalog_id(&self) -> &str {
        &self.external_catalog_id
    }

    pub fn catalog_source(&self) -> &str {
        &self.catalog_source
    }

    pub fn original_yield(&self) -> Decimal {
        self.original_yield
    }

    pub fn current_yield(&self) -> Decimal {
        self.current_yield
    }

    pub fn yield_changed(&self) -> bool {
        self.yield_changed
    }

    pub fn yield_changed_by(&self) -> Option<Uuid> {
        self.yield_changed_by
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn inputs(&self) -> &[InputSnapshot] {
        &self.inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UnitPriceSnapshot {
        UnitPriceSnapshot::capture(
            Uuid::new_v4(),
            "APU-0042",
            "national-catalog",
            Decimal::from(8),
            "m2",
            vec![
                InputSnapshot::new("MAT-1", "Cement", Decimal::new(25, 1), Decimal::from(30))
                    .unwrap(),
                InputSnapshot::new("LAB-7", "Mason", Decimal::ONE, Decimal::from(45)).unwrap(),
            ],
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_subtotal_is_derived() {
        let snapshot = sample();
        assert_eq!(snapshot.inputs()[0].subtotal().unwrap(), Decimal::from(75));
        assert_eq!(snapshot.inputs()[1].subtotal().unwrap(), Decimal::from(45));
    }

    #[test]
    fn test_overflowing_subtotal_rejected() {
        let result = InputSnapshot::new("MAT-9", "Steel", Decimal::MAX, Decimal::from(2));
        assert!(matches!(result, Err(BaselineError::ValidationError(_))));

        let mut input =
            InputSnapshot::new("MAT-9", "Steel", Decimal::ONE, Decimal::from(2)).unwrap();
        input.quantity = Decimal::MAX;
        assert!(input.subtotal().is_err());
    }

    #[test]
    fn test_yield_update_records_audit_trail() {
        let mut snapshot = sample();
        let editor = Uuid::new_v4();
        let now = Utc::now();

        snapshot
            .update_current_yield(Decimal::new(95, 1), editor, now)
            .unwrap();

        assert_eq!(snapshot.original_yield(), Decimal::from(8));
        assert!(snapshot.yield_changed());
        assert_eq!(snapshot.yield_changed_by(), Some(editor));
        assert_eq!(snapshot.yield_deviation(), Decimal::new(15, 1));
    }

    #[test]
    fn test_non_positive_yield_rejected() {
        let mut snapshot = sample();
        assert!(snapshot
            .update_current_yield(Decimal::ZERO, Uuid::new_v4(), Utc::now())
            .is_err());

        let result = UnitPriceSnapshot::capture(
            Uuid::new_v4(),
            "APU-1",
            "catalog",
            Decimal::from(-1),
            "m",
            vec![],
            Utc::now(),
        );
        assert!(result.is_err());
    }
}
