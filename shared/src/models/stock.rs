//! Stock movement, audit and warning models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How urgently an ingredient needs restocking.
///
/// Variants are ordered from least to most urgent so tiers can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyTier {
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Low => "low",
            UrgencyTier::Medium => "medium",
            UrgencyTier::High => "high",
            UrgencyTier::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(UrgencyTier::Low),
            "medium" => Some(UrgencyTier::Medium),
            "high" => Some(UrgencyTier::High),
            "critical" => Some(UrgencyTier::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify remaining stock against the minimum level.
///
/// Returns `None` while stock is above the minimum. Otherwise the tier follows the
/// stock-to-minimum ratio: ≤ 0.25 critical, ≤ 0.5 high, ≤ 0.75 medium, else low.
pub fn classify_urgency(new_stock: Decimal, min_stock_level: Decimal) -> Option<UrgencyTier> {
    if new_stock > min_stock_level {
        return None;
    }

    // min_stock_level is positive for every stored ingredient
    let ratio = new_stock
        .checked_div(min_stock_level)
        .unwrap_or(Decimal::ZERO);

    let tier = if ratio <= Decimal::new(25, 2) {
        UrgencyTier::Critical
    } else if ratio <= Decimal::new(50, 2) {
        UrgencyTier::High
    } else if ratio <= Decimal::new(75, 2) {
        UrgencyTier::Medium
    } else {
        UrgencyTier::Low
    };
    Some(tier)
}

/// Urgency of a deduction. A sale that could not be fully covered is always critical.
pub fn urgency_for(
    new_stock: Decimal,
    min_stock_level: Decimal,
    insufficient: bool,
) -> Option<UrgencyTier> {
    if insufficient {
        return Some(UrgencyTier::Critical);
    }
    classify_urgency(new_stock, min_stock_level)
}

/// Outcome of drawing a required quantity from the stock on hand.
///
/// Stock never goes negative: the draw is clamped to what is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDraw {
    pub required: Decimal,
    pub deducted: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
}

impl StockDraw {
    pub fn compute(required: Decimal, current_stock: Decimal) -> Self {
        let available = current_stock.max(Decimal::ZERO);
        let deducted = required.max(Decimal::ZERO).min(available);
        Self {
            required,
            deducted,
            previous_stock: current_stock,
            new_stock: current_stock - deducted,
        }
    }

    /// Whether less was deducted than the sale required
    pub fn is_short(&self) -> bool {
        self.deducted < self.required
    }

    pub fn shortfall(&self) -> Decimal {
        self.required - self.deducted
    }
}

/// Write-once audit entry of stock removed by a sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngredientDeduction {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub restaurant_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: String,
    pub quantity_required: Decimal,
    pub quantity_deducted: Decimal,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub min_stock_level: Decimal,
    pub is_low_stock: bool,
    /// Ingredient version this entry produced
    pub stock_version: i64,
    pub timestamp: DateTime<Utc>,
}

/// Warning raised when a deduction leaves an ingredient at or below its minimum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowStockWarning {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: String,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub urgency: UrgencyTier,
    /// Sale that raised the warning; `None` for live stock scans
    pub sale_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub is_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
}

/// Kind of manual stock change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Restock,
    Correction,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Restock => "restock",
            AdjustmentKind::Correction => "correction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "restock" => Some(AdjustmentKind::Restock),
            "correction" => Some(AdjustmentKind::Correction),
            _ => None,
        }
    }
}

/// Write-once audit entry of a manual stock change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub ingredient_id: Uuid,
    pub kind: AdjustmentKind,
    /// Positive for additions, negative for removals
    pub delta: Decimal,
    pub reason: String,
    pub notes: Option<String>,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    /// Ingredient version this entry produced
    pub stock_version: i64,
    pub performed_by: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_above_minimum_is_not_low() {
        assert_eq!(classify_urgency(dec("3.01"), dec("3.0")), None);
    }

    #[test]
    fn test_tier_boundaries() {
        let min = dec("4.0");
        assert_eq!(classify_urgency(dec("4.0"), min), Some(UrgencyTier::Low));
        assert_eq!(classify_urgency(dec("3.0"), min), Some(UrgencyTier::Medium));
        assert_eq!(classify_urgency(dec("2.0"), min), Some(UrgencyTier::High));
        assert_eq!(classify_urgency(dec("1.0"), min), Some(UrgencyTier::Critical));
        assert_eq!(classify_urgency(Decimal::ZERO, min), Some(UrgencyTier::Critical));
    }

    #[test]
    fn test_milk_lands_in_low_tier() {
        // 2.6 / 3.0 ≈ 0.867
        assert_eq!(classify_urgency(dec("2.6"), dec("3.0")), Some(UrgencyTier::Low));
    }

    #[test]
    fn test_shortfall_forces_critical() {
        assert_eq!(
            urgency_for(dec("9.0"), dec("10.0"), true),
            Some(UrgencyTier::Critical)
        );
        assert_eq!(urgency_for(dec("9.0"), dec("10.0"), false), Some(UrgencyTier::Low));
    }

    #[test]
    fn test_draw_is_clamped() {
        let draw = StockDraw::compute(dec("1.5"), dec("1.0"));
        assert_eq!(draw.deducted, dec("1.0"));
        assert_eq!(draw.new_stock, Decimal::ZERO);
        assert!(draw.is_short());
        assert_eq!(draw.shortfall(), dec("0.5"));
    }

    #[test]
    fn test_draw_within_stock() {
        let draw = StockDraw::compute(dec("5.4"), dec("8.0"));
        assert_eq!(draw.deducted, dec("5.4"));
        assert_eq!(draw.new_stock, dec("2.6"));
        assert!(!draw.is_short());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(UrgencyTier::Low < UrgencyTier::Medium);
        assert!(UrgencyTier::Medium < UrgencyTier::High);
        assert!(UrgencyTier::High < UrgencyTier::Critical);
    }

    #[test]
    fn test_tier_string_round_trip() {
        for tier in [
            UrgencyTier::Low,
            UrgencyTier::Medium,
            UrgencyTier::High,
            UrgencyTier::Critical,
        ] {
            assert_eq!(UrgencyTier::from_str(tier.as_str()), Some(tier));
        }
        assert_eq!(UrgencyTier::from_str("urgent"), None);
    }
}
