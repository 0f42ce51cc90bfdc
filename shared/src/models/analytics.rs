//! Sales analytics and dashboard models
//!
//! Read-only views over the sales ledger. Nothing here touches stock.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{LowStockWarning, SalesRecord, UrgencyTier, UsageReportRow};
use crate::validation::PRICE_SCALE;

/// How many items the best-seller list keeps
pub const TOP_SELLING_LIMIT: usize = 10;

/// Revenue bucket for sale lines without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopSellingItem {
    pub menu_item_id: String,
    pub menu_item_name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

/// Totals derived from the sales ledger alone
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalesSummary {
    pub sale_count: usize,
    pub total_sales: Decimal,
    pub total_items_sold: i64,
    /// Mean sale amount, rounded to cents; zero when there were no sales
    pub average_order_value: Decimal,
    /// Best sellers by quantity, at most [`TOP_SELLING_LIMIT`]
    pub top_selling_items: Vec<TopSellingItem>,
    pub revenue_by_category: BTreeMap<String, Decimal>,
}

/// Summarize a set of sales
pub fn summarize_sales<'a, I>(sales: I) -> SalesSummary
where
    I: IntoIterator<Item = &'a SalesRecord>,
{
    let mut summary = SalesSummary::default();
    let mut items: HashMap<&str, TopSellingItem> = HashMap::new();

    for sale in sales {
        summary.sale_count += 1;
        summary.total_sales += sale.total_sales_amount;
        summary.total_items_sold += sale.total_items_sold;

        for item in &sale.items {
            let entry = items
                .entry(item.menu_item_id.as_str())
                .or_insert_with(|| TopSellingItem {
                    menu_item_id: item.menu_item_id.clone(),
                    menu_item_name: item.menu_item_name.clone(),
                    quantity: 0,
                    revenue: Decimal::ZERO,
                });
            entry.quantity += item.quantity;
            entry.revenue += item.total_price;

            let category = item.category.as_deref().unwrap_or(UNCATEGORIZED);
            *summary
                .revenue_by_category
                .entry(category.to_string())
                .or_insert(Decimal::ZERO) += item.total_price;
        }
    }

    if summary.sale_count > 0 {
        summary.average_order_value = (summary.total_sales
            / Decimal::from(summary.sale_count as u64))
        .round_dp(PRICE_SCALE);
    }

    let mut top: Vec<TopSellingItem> = items.into_values().collect();
    top.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue.cmp(&a.revenue))
            .then_with(|| a.menu_item_name.cmp(&b.menu_item_name))
    });
    top.truncate(TOP_SELLING_LIMIT);
    summary.top_selling_items = top;

    summary
}

/// Sales, ingredient usage and open alerts for a reporting window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesAnalytics {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub ingredient_usage: Vec<UsageReportRow>,
    pub low_stock_alerts: Vec<LowStockWarning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DailySales {
    pub sale_count: usize,
    pub total_amount: Decimal,
    pub total_items: i64,
    /// Ingredient deductions made by the day's sales
    pub ingredients_deducted: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryOverview {
    pub total_ingredients: usize,
    pub low_stock_warnings: usize,
    pub critical_warnings: usize,
}

/// One-day snapshot of sales and inventory health
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesDashboard {
    pub restaurant_id: Uuid,
    pub date: NaiveDate,
    pub today: DailySales,
    pub inventory: InventoryOverview,
    /// Ingredients with a high or critical open warning, most urgent first
    pub low_stock_items: Vec<String>,
}

impl SalesDashboard {
    /// `warnings` are the open warnings, already ordered most urgent first
    pub fn build(
        restaurant_id: Uuid,
        date: NaiveDate,
        sales: &[SalesRecord],
        total_ingredients: usize,
        warnings: &[LowStockWarning],
    ) -> Self {
        let today = sales
            .iter()
            .filter(|s| s.date == date)
            .fold(DailySales::default(), |mut day, sale| {
                day.sale_count += 1;
                day.total_amount += sale.total_sales_amount;
                day.total_items += sale.total_items_sold;
                day.ingredients_deducted += sale.ingredients_deducted.len();
                day
            });

        let mut low_stock_items: Vec<String> = Vec::new();
        for warning in warnings.iter().filter(|w| w.urgency >= UrgencyTier::High) {
            if !low_stock_items.contains(&warning.ingredient_name) {
                low_stock_items.push(warning.ingredient_name.clone());
            }
        }

        Self {
            restaurant_id,
            date,
            today,
            inventory: InventoryOverview {
                total_ingredients,
                low_stock_warnings: warnings.len(),
                critical_warnings: warnings
                    .iter()
                    .filter(|w| w.urgency == UrgencyTier::Critical)
                    .count(),
            },
            low_stock_items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SaleItem;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn line(menu_item_id: &str, quantity: i64, unit_price: &str, category: Option<&str>) -> SaleItem {
        SaleItem {
            menu_item_id: menu_item_id.to_string(),
            menu_item_name: menu_item_id.to_string(),
            quantity,
            unit_price: dec(unit_price),
            total_price: dec(unit_price) * Decimal::from(quantity),
            category: category.map(str::to_string),
        }
    }

    fn sale(day: u32, items: Vec<SaleItem>, deducted: usize) -> SalesRecord {
        SalesRecord {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            date: date(day),
            timestamp: Utc::now(),
            total_sales_amount: items.iter().map(|i| i.total_price).sum(),
            total_items_sold: items.iter().map(|i| i.quantity).sum(),
            items,
            ingredients_deducted: (0..deducted).map(|_| (Uuid::new_v4(), dec("1"))).collect(),
            warning_ids: Vec::new(),
            notes: None,
            recorded_by: None,
        }
    }

    fn warning(name: &str, urgency: UrgencyTier) -> LowStockWarning {
        LowStockWarning {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            ingredient_id: Uuid::new_v4(),
            ingredient_name: name.to_string(),
            unit: "kg".to_string(),
            current_stock: dec("1"),
            min_stock_level: dec("5"),
            urgency,
            sale_id: None,
            timestamp: Utc::now(),
            is_resolved: false,
            resolved_at: None,
            resolved_by: None,
        }
    }

    #[test]
    fn test_summary_totals_and_average() {
        let sales = vec![
            sale(1, vec![line("latte", 2, "4.50", Some("Drinks"))], 1),
            sale(1, vec![line("bagel", 1, "3.00", None), line("latte", 1, "4.50", Some("Drinks"))], 2),
        ];

        let summary = summarize_sales(&sales);

        assert_eq!(summary.sale_count, 2);
        assert_eq!(summary.total_sales, dec("16.50"));
        assert_eq!(summary.total_items_sold, 4);
        assert_eq!(summary.average_order_value, dec("8.25"));
        assert_eq!(summary.revenue_by_category["Drinks"], dec("13.50"));
        assert_eq!(summary.revenue_by_category[UNCATEGORIZED], dec("3.00"));
        assert_eq!(summary.top_selling_items[0].menu_item_id, "latte");
        assert_eq!(summary.top_selling_items[0].quantity, 3);
    }

    #[test]
    fn test_average_is_rounded_to_cents() {
        let sales = vec![
            sale(1, vec![line("tea", 1, "1.00", None)], 0),
            sale(1, vec![line("tea", 1, "1.00", None)], 0),
            sale(1, vec![line("water", 1, "0.00", None)], 0),
        ];
        assert_eq!(summarize_sales(&sales).average_order_value, dec("0.67"));
    }

    #[test]
    fn test_top_sellers_capped() {
        let items = (1..=12)
            .map(|n| line(&format!("dish-{:02}", n), n, "1.00", None))
            .collect();
        let summary = summarize_sales(&[sale(1, items, 0)]);

        assert_eq!(summary.top_selling_items.len(), TOP_SELLING_LIMIT);
        assert_eq!(summary.top_selling_items[0].menu_item_id, "dish-12");
        assert_eq!(summary.top_selling_items[9].menu_item_id, "dish-03");
    }

    #[test]
    fn test_no_sales() {
        let summary = summarize_sales(&[]);
        assert_eq!(summary.sale_count, 0);
        assert_eq!(summary.average_order_value, Decimal::ZERO);
        assert!(summary.top_selling_items.is_empty());
    }

    #[test]
    fn test_dashboard_counts_only_the_day() {
        let sales = vec![
            sale(1, vec![line("latte", 2, "4.50", None)], 1),
            sale(2, vec![line("latte", 3, "4.50", None)], 2),
            sale(2, vec![line("bagel", 1, "3.00", None)], 1),
        ];
        let warnings = vec![
            warning("Coffee Beans", UrgencyTier::Critical),
            warning("Milk", UrgencyTier::High),
            warning("Milk", UrgencyTier::High),
            warning("Sugar", UrgencyTier::Low),
        ];

        let dashboard = SalesDashboard::build(Uuid::nil(), date(2), &sales, 6, &warnings);

        assert_eq!(dashboard.today.sale_count, 2);
        assert_eq!(dashboard.today.total_amount, dec("16.50"));
        assert_eq!(dashboard.today.total_items, 4);
        assert_eq!(dashboard.today.ingredients_deducted, 3);
        assert_eq!(dashboard.inventory.total_ingredients, 6);
        assert_eq!(dashboard.inventory.low_stock_warnings, 4);
        assert_eq!(dashboard.inventory.critical_warnings, 1);
        assert_eq!(dashboard.low_stock_items, vec!["Coffee Beans", "Milk"]);
    }
}
