//! Canonical hashing of a single budget line.
//!
//! Field order is fixed and part of the `SHA-256-v1` algorithm:
//! id, item code, description, unit, quantity, assigned amount, parent
//! (`ROOT` for top-level lines), level; then, when the line has a
//! unit-price snapshot, catalog id, catalog source, current yield, unit and
//! every input (resource id, name, quantity, unit price, subtotal) in
//! stored order.
//!
//! Each field is written as `<byte length>:<value>` and fields are joined
//! with `|`, so text containing `|` cannot shift a field boundary.

use rust_decimal::Decimal;

use crate::budget::{BudgetLine, UnitPriceSnapshot};
use crate::crypto::{merkle_root, sha256_hex};
use crate::error::BaselineError;

pub const FIELD_SEPARATOR: &str = "|";
pub const ROOT_PARENT: &str = "ROOT";
/// Minimum number of fractional digits in a canonical decimal.
pub const DECIMAL_SCALE: u32 = 4;

/// Exact decimal text, independent of how the value was entered.
///
/// Trailing zeros are stripped, then the value is padded to at least
/// `DECIMAL_SCALE` places. Nothing is ever rounded.
pub fn canonical_decimal(value: Decimal) -> String {
    let mut normalized = value.normalize();
    if normalized.scale() < DECIMAL_SCALE {
        normalized.rescale(DECIMAL_SCALE);
    }
    normalized.to_string()
}

/// Length-prefixed, `|`-joined encoding of hash pre-image fields.
pub fn encode_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|field| {
            let field = field.as_ref();
            format!("{}:{}", field.len(), field)
        })
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

/// Canonical pre-image of a line.
pub fn canonical_line(
    line: &BudgetLine,
    snapshot: Option<&UnitPriceSnapshot>,
) -> Result<String, BaselineError> {
    let mut fields: Vec<String> = vec![
        line.id.to_string(),
        line.item_code.clone(),
        line.description.clone(),
        line.unit.clone().unwrap_or_default(),
        canonical_decimal(line.quantity),
        canonical_decimal(line.assigned_amount),
        line.parent_id
            .map(|p| p.to_string())
            .unwrap_or_else(|| ROOT_PARENT.to_string()),
        line.level.to_string(),
    ];

    if let Some(snapshot) = snapshot {
        fields.push(snapshot.external_catalog_id().to_string());
        fields.push(snapshot.catalog_source().to_string());
        // Current yield: edits made after capture must change the seal.
        fields.push(canonical_decimal(snapshot.current_yield()));
        fields.push(snapshot.unit().to_string());
        for input in snapshot.inputs() {
            fields.push(input.external_resource_id.clone());
            fields.push(input.name.clone());
            fields.push(canonical_decimal(input.quantity));
            fields.push(canonical_decimal(input.unit_price));
            fields.push(canonical_decimal(input.subtotal()?));
        }
    }

    Ok(encode_fields(&fields))
}

pub fn hash_line(
    line: &BudgetLine,
    snapshot: Option<&UnitPriceSnapshot>,
) -> Result<String, BaselineError> {
    Ok(sha256_hex(canonical_line(line, snapshot)?))
}

/// Merkle root over line hashes, independent of the order they were fetched in.
pub fn lines_merkle_root(mut line_hashes: Vec<String>) -> String {
    line_hashes.sort();
    merkle_root(&line_hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::InputSnapshot;
    use chrono::Utc;
    use uuid::Uuid;

    fn line() -> BudgetLine {
        BudgetLine::root(
            Uuid::new_v4(),
            "01",
            "Foundations",
            Some("m3"),
            Decimal::from(10),
            Decimal::from(100),
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_decimal_is_exact() {
        assert_eq!(canonical_decimal(Decimal::from(100)), "100.0000");
        assert_eq!(canonical_decimal(Decimal::new(1005, 1)), "100.5000");
        assert_eq!(canonical_decimal(Decimal::new(123456789, 6)), "123.456789");
        assert_eq!(canonical_decimal(Decimal::new(15, 5)), "0.00015");
        assert_eq!(
            canonical_decimal(Decimal::new(10000, 2)),
            canonical_decimal(Decimal::from(100))
        );
        assert_eq!(
            canonical_decimal(Decimal::new(1234500, 6)),
            canonical_decimal(Decimal::new(12345, 4))
        );
    }

    #[test]
    fn test_sub_basis_point_change_alters_hash() {
        let mut line = line();
        line.quantity = Decimal::new(15, 5);
        let before = hash_line(&line, None).unwrap();
        line.quantity = Decimal::new(18, 5);
        let after = hash_line(&line, None).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_canonical_line_layout() {
        let line = line();
        let canonical = canonical_line(&line, None).unwrap();
        assert_eq!(
            canonical,
            format!(
                "36:{}|2:01|11:Foundations|2:m3|7:10.0000|8:100.0000|4:ROOT|1:1",
                line.id
            )
        );
    }

    #[test]
    fn test_separator_in_text_cannot_shift_fields() {
        let mut joined = line();
        joined.item_code = "01|Concrete".to_string();
        joined.description = "slab".to_string();

        let mut split = joined.clone();
        split.item_code = "01".to_string();
        split.description = "Concrete|slab".to_string();

        assert_ne!(
            hash_line(&joined, None).unwrap(),
            hash_line(&split, None).unwrap()
        );
    }

    #[test]
    fn test_snapshot_current_yield_changes_hash() {
        let line = line();
        let mut snapshot = UnitPriceSnapshot::capture(
            line.id,
            "APU-9",
            "catalog",
            Decimal::from(4),
            "m3",
            vec![InputSnapshot::new("R1", "Sand", Decimal::ONE, Decimal::from(12)).unwrap()],
            Utc::now(),
        )
        .unwrap();

        let bare = hash_line(&line, None).unwrap();
        let with_snapshot = hash_line(&line, Some(&snapshot)).unwrap();
        assert_ne!(bare, with_snapshot);

        snapshot
            .update_current_yield(Decimal::from(5), Uuid::new_v4(), Utc::now())
            .unwrap();
        assert_ne!(with_snapshot, hash_line(&line, Some(&snapshot)).unwrap());
    }

    #[test]
    fn test_original_yield_not_hashed() {
        let line = line();
        let snapshot = UnitPriceSnapshot::capture(
            line.id,
            "APU-9",
            "catalog",
            Decimal::from(4),
            "m3",
            Vec::new(),
            Utc::now(),
        )
        .unwrap();

        let mut record = snapshot.to_record();
        record.current_yield = Decimal::from(6);
        let adjusted = UnitPriceSnapshot::restore(record.clone()).unwrap();
        record.original_yield = Decimal::from(9);
        let other_original = UnitPriceSnapshot::restore(record).unwrap();

        assert_eq!(
            hash_line(&line, Some(&adjusted)).unwrap(),
            hash_line(&line, Some(&other_original)).unwrap()
        );
    }

    #[test]
    fn test_lines_root_ignores_input_order() {
        let hashes: Vec<String> = (0..5).map(|i| sha256_hex(format!("l{}", i))).collect();
        let mut reversed = hashes.clone();
        reversed.reverse();
        assert_eq!(lines_merkle_root(hashes), lines_merkle_root(reversed));
    }
}
