use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::config::Business;
use crate::store::{MovementKind, Store};

/// Monday..Sunday of the week containing the reference date.
pub fn week_bounds(reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = reference
        - chrono::Duration::days(reference.weekday().num_days_from_monday() as i64);
    (monday, monday + chrono::Duration::days(6))
}

#[derive(Debug, Serialize)]
pub struct ProviderDeliveryTotal {
    pub provider_id: String,
    pub provider_name: String,
    pub deliveries: usize,
    pub quantity: f64,
}

/// Aggregates for one Monday..Sunday week across every collection.
#[derive(Debug, Serialize)]
pub struct WeeklyReport {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub deliveries: Vec<ProviderDeliveryTotal>,
    pub milk_received: f64,
    pub sales_count: usize,
    pub sales_gross: f64,
    /// Payments dated inside the week, down payments included.
    pub sales_collected: f64,
    pub milk_used: f64,
    pub product_out: f64,
    /// Liters of milk per unit of product over the week's runs.
    pub transformation_index: f64,
    pub stock_in: f64,
    pub stock_out: f64,
    /// Whole-milk level at the end of the week.
    pub stock_level: f64,
}

/// Complete data for rendering the weekly report PDF
#[derive(Debug, Serialize)]
pub struct WeeklyReportData {
    pub business: Business,
    pub currency_symbol: String,
    pub generated_date: String,
    pub report: WeeklyReport,
}

pub fn build_weekly_report(store: &Store, reference: NaiveDate) -> WeeklyReport {
    let (start, end) = week_bounds(reference);
    let in_week = |d: NaiveDate| d >= start && d <= end;

    // Per-provider delivery totals, providers in first-delivery order
    let mut deliveries: Vec<ProviderDeliveryTotal> = Vec::new();
    for delivery in store.deliveries.iter().filter(|d| in_week(d.date)) {
        match deliveries
            .iter_mut()
            .find(|t| t.provider_id == delivery.provider_id)
        {
            Some(total) => {
                total.deliveries += 1;
                total.quantity += delivery.quantity;
            }
            None => deliveries.push(ProviderDeliveryTotal {
                provider_id: delivery.provider_id.clone(),
                provider_name: delivery.provider_name.clone(),
                deliveries: 1,
                quantity: delivery.quantity,
            }),
        }
    }
    let milk_received: f64 = deliveries.iter().map(|t| t.quantity).sum();

    let week_sales: Vec<_> = store.sales.iter().filter(|s| in_week(s.date)).collect();
    let sales_gross: f64 = week_sales.iter().map(|s| s.total_amount).sum();
    let sales_collected: f64 = store
        .sales
        .iter()
        .flat_map(|s| s.payments.iter())
        .filter(|p| in_week(p.date))
        .map(|p| p.amount)
        .sum();

    let milk_used: f64 = store
        .production
        .iter()
        .filter(|r| in_week(r.date))
        .map(|r| r.milk_used)
        .sum();
    let product_out: f64 = store
        .production
        .iter()
        .filter(|r| in_week(r.date))
        .map(|r| r.product_out)
        .sum();
    let transformation_index = if product_out > 0.0 {
        milk_used / product_out
    } else {
        0.0
    };

    let stock_in: f64 = store
        .stock
        .iter()
        .filter(|m| in_week(m.date) && m.kind == MovementKind::Entrada)
        .map(|m| m.quantity)
        .sum();
    let stock_out: f64 = store
        .stock
        .iter()
        .filter(|m| in_week(m.date) && m.kind == MovementKind::Salida)
        .map(|m| m.quantity)
        .sum();
    let stock_level: f64 = store
        .stock
        .iter()
        .filter(|m| m.date <= end)
        .map(|m| m.signed())
        .sum();

    WeeklyReport {
        week_start: start,
        week_end: end,
        deliveries,
        milk_received,
        sales_count: week_sales.len(),
        sales_gross,
        sales_collected,
        milk_used,
        product_out,
        transformation_index,
        stock_in,
        stock_out,
        stock_level,
    }
}
