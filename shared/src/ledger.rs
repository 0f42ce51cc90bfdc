//! Ledger replay
//!
//! Every committed stock change leaves exactly one ledger entry stamped with
//! the ingredient version it produced. Replaying those entries from the
//! opening stock must land on the stored stock and version.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AdjustmentKind, Ingredient, IngredientDeduction, StockAdjustment};

/// Where a ledger entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerSource {
    Sale { sale_id: Uuid },
    Adjustment { kind: AdjustmentKind },
}

/// One stock change, signed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub source: LedgerSource,
    pub stock_version: i64,
    pub change: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
}

impl From<&IngredientDeduction> for LedgerEntry {
    fn from(deduction: &IngredientDeduction) -> Self {
        Self {
            source: LedgerSource::Sale {
                sale_id: deduction.sale_id,
            },
            stock_version: deduction.stock_version,
            change: -deduction.quantity_deducted,
            previous_stock: deduction.previous_stock,
            new_stock: deduction.new_stock,
        }
    }
}

impl From<&StockAdjustment> for LedgerEntry {
    fn from(adjustment: &StockAdjustment) -> Self {
        Self {
            source: LedgerSource::Adjustment {
                kind: adjustment.kind,
            },
            stock_version: adjustment.stock_version,
            change: adjustment.delta,
            previous_stock: adjustment.previous_stock,
            new_stock: adjustment.new_stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDiscrepancy {
    pub stock_version: i64,
    pub message: String,
}

/// Outcome of replaying an ingredient's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAudit {
    pub ingredient_id: Uuid,
    pub opening_stock: Decimal,
    pub replayed_stock: Decimal,
    pub current_stock: Decimal,
    pub current_version: i64,
    pub entries_checked: usize,
    pub discrepancies: Vec<LedgerDiscrepancy>,
    pub is_consistent: bool,
}

/// Replay `entries` in version order starting from the ingredient's opening stock
pub fn replay_ledger(ingredient: &Ingredient, mut entries: Vec<LedgerEntry>) -> LedgerAudit {
    entries.sort_by_key(|e| e.stock_version);

    let mut discrepancies = Vec::new();
    let mut running = ingredient.opening_stock;
    let mut expected_version = 1;

    for entry in &entries {
        if entry.stock_version != expected_version {
            discrepancies.push(LedgerDiscrepancy {
                stock_version: entry.stock_version,
                message: format!("expected version {}", expected_version),
            });
        }
        if entry.previous_stock != running {
            discrepancies.push(LedgerDiscrepancy {
                stock_version: entry.stock_version,
                message: format!(
                    "recorded previous stock {} but replay reached {}",
                    entry.previous_stock, running
                ),
            });
        }

        running += entry.change;
        if entry.new_stock != running {
            discrepancies.push(LedgerDiscrepancy {
                stock_version: entry.stock_version,
                message: format!(
                    "recorded new stock {} but replay reached {}",
                    entry.new_stock, running
                ),
            });
        }
        expected_version = entry.stock_version + 1;
    }

    if running != ingredient.current_stock {
        discrepancies.push(LedgerDiscrepancy {
            stock_version: ingredient.version,
            message: format!(
                "stored stock {} but replay reached {}",
                ingredient.current_stock, running
            ),
        });
    }
    if expected_version - 1 != ingredient.version {
        discrepancies.push(LedgerDiscrepancy {
            stock_version: ingredient.version,
            message: format!(
                "stored version {} but ledger ends at {}",
                ingredient.version,
                expected_version - 1
            ),
        });
    }

    LedgerAudit {
        ingredient_id: ingredient.id,
        opening_stock: ingredient.opening_stock,
        replayed_stock: running,
        current_stock: ingredient.current_stock,
        current_version: ingredient.version,
        entries_checked: entries.len(),
        is_consistent: discrepancies.is_empty(),
        discrepancies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ingredient(opening: &str, current: &str, version: i64) -> Ingredient {
        let now = Utc::now();
        Ingredient {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "Milk".to_string(),
            unit: "L".to_string(),
            current_stock: dec(current),
            min_stock_level: dec("3.0"),
            cost_per_unit: dec("1.10"),
            opening_stock: dec(opening),
            version,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn sale_entry(version: i64, previous: &str, deducted: &str) -> LedgerEntry {
        LedgerEntry {
            source: LedgerSource::Sale {
                sale_id: Uuid::new_v4(),
            },
            stock_version: version,
            change: -dec(deducted),
            previous_stock: dec(previous),
            new_stock: dec(previous) - dec(deducted),
        }
    }

    fn restock_entry(version: i64, previous: &str, delta: &str) -> LedgerEntry {
        LedgerEntry {
            source: LedgerSource::Adjustment {
                kind: AdjustmentKind::Restock,
            },
            stock_version: version,
            change: dec(delta),
            previous_stock: dec(previous),
            new_stock: dec(previous) + dec(delta),
        }
    }

    #[test]
    fn test_empty_ledger_is_consistent() {
        let audit = replay_ledger(&ingredient("5", "5", 0), vec![]);
        assert!(audit.is_consistent);
        assert_eq!(audit.entries_checked, 0);
    }

    #[test]
    fn test_entries_replayed_in_version_order() {
        let entries = vec![
            restock_entry(2, "6.4", "5"),
            sale_entry(1, "8.0", "1.6"),
            sale_entry(3, "11.4", "0.4"),
        ];
        let audit = replay_ledger(&ingredient("8.0", "11.0", 3), entries);
        assert!(audit.is_consistent, "{:?}", audit.discrepancies);
        assert_eq!(audit.replayed_stock, dec("11.0"));
    }

    #[test]
    fn test_stock_drift_is_reported() {
        let audit = replay_ledger(&ingredient("8.0", "7.0", 1), vec![sale_entry(1, "8.0", "1.6")]);
        assert!(!audit.is_consistent);
        assert_eq!(audit.discrepancies.len(), 1);
    }

    #[test]
    fn test_version_gap_is_reported() {
        let entries = vec![sale_entry(1, "8.0", "1.0"), sale_entry(3, "7.0", "1.0")];
        let audit = replay_ledger(&ingredient("8.0", "6.0", 3), entries);
        assert!(!audit.is_consistent);
        assert!(audit.discrepancies.iter().any(|d| d.stock_version == 3));
    }
}
