//! Debt ledger over the sale list: per-sale payments, client-level debt,
//! oldest-first lump allocation, account write-off, and the consolidated
//! statement with a running balance.
//!
//! Every mutating operation validates first and then applies its full
//! effect, or applies nothing.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{AcopioError, Result};
use crate::store::{Payment, Sale};

/// Tolerance for accumulated floating-point error in money sums.
const EPSILON: f64 = 0.001;

/// Append a payment to a single sale.
pub fn record_payment(sale: &mut Sale, amount: f64, date: NaiveDate) -> Result<()> {
    if amount <= 0.0 {
        return Err(AcopioError::NonPositiveAmount);
    }

    let remaining = sale.balance();
    if amount > remaining + EPSILON {
        return Err(AcopioError::OverPayment {
            sale: sale.id.clone(),
            max: remaining,
        });
    }

    sale.payments.push(Payment { date, amount });
    Ok(())
}

/// Total outstanding debt for one client. Settled or overpaid sales
/// contribute zero, never negative.
pub fn client_debt(sales: &[Sale], client_id: &str) -> f64 {
    sales
        .iter()
        .filter(|s| s.client_id == client_id)
        .map(|s| s.balance().max(0.0))
        .sum()
}

/// One sale's share of a lump payment, for confirmation output.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub sale_id: String,
    pub amount: f64,
}

/// Spread a lump payment across a client's outstanding sales, oldest first.
/// Sales sharing a date keep their list order. The whole amount must fit
/// within the client's debt or nothing is applied.
pub fn allocate_lump_payment(
    sales: &mut [Sale],
    client_id: &str,
    amount: f64,
    today: NaiveDate,
) -> Result<Vec<Allocation>> {
    if amount <= 0.0 {
        return Err(AcopioError::NonPositiveAmount);
    }

    let debt = client_debt(sales, client_id);
    if debt <= EPSILON {
        return Err(AcopioError::NoOutstandingDebt(client_id.to_string()));
    }
    if amount > debt + EPSILON {
        return Err(AcopioError::ExceedsClientDebt {
            client: client_id.to_string(),
            max: debt,
        });
    }

    let mut order: Vec<usize> = sales
        .iter()
        .enumerate()
        .filter(|(_, s)| s.client_id == client_id && s.balance() > EPSILON)
        .map(|(i, _)| i)
        .collect();
    // Stable by date, so equal dates fall back to list order.
    order.sort_by_key(|&i| sales[i].date);

    let mut remaining = amount;
    let mut applied = Vec::new();

    for i in order {
        if remaining <= EPSILON {
            break;
        }
        let sale = &mut sales[i];
        let share = remaining.min(sale.balance());
        sale.payments.push(Payment {
            date: today,
            amount: share,
        });
        applied.push(Allocation {
            sale_id: sale.id.clone(),
            amount: share,
        });
        remaining -= share;
    }

    Ok(applied)
}

/// Write off every outstanding balance for one client on sales dated on or
/// before the cutoff. The settlement is stored as an ordinary payment dated
/// at the cutoff. Returns how many sales were settled.
pub fn cancel_account(sales: &mut [Sale], client_id: &str, cutoff: NaiveDate) -> usize {
    let mut settled = 0;

    for sale in sales
        .iter_mut()
        .filter(|s| s.client_id == client_id && s.date <= cutoff)
    {
        let due = sale.balance();
        if due > EPSILON {
            sale.payments.push(Payment {
                date: cutoff,
                amount: due,
            });
            settled += 1;
        }
    }

    settled
}

/// One row of the consolidated client statement.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    /// Running balance after this row.
    pub balance: f64,
}

/// Chronological statement of one client's debits (sales) and credits
/// (payments) with a running balance.
///
/// A payment dated the same day as its sale is folded into the sale row as
/// the down payment; every other payment becomes its own "Abono" row. With a
/// range start, everything strictly before it collapses into a single
/// opening-balance row.
pub fn consolidated_ledger(
    sales: &[Sale],
    client_id: &str,
    range_start: Option<NaiveDate>,
) -> Vec<LedgerRow> {
    let mut rows: Vec<LedgerRow> = Vec::new();

    for sale in sales.iter().filter(|s| s.client_id == client_id) {
        let down_payment: f64 = sale
            .payments
            .iter()
            .filter(|p| p.date == sale.date)
            .map(|p| p.amount)
            .sum();

        rows.push(LedgerRow {
            date: sale.date,
            description: format!("Venta {} ({} {})", sale.id, sale.quantity, sale.unit),
            debit: sale.total_amount,
            credit: down_payment,
            balance: 0.0,
        });

        for payment in sale.payments.iter().filter(|p| p.date != sale.date) {
            rows.push(LedgerRow {
                date: payment.date,
                description: format!("Abono {}", sale.id),
                debit: 0.0,
                credit: payment.amount,
                balance: 0.0,
            });
        }
    }

    // Chronological; on equal dates larger debits come first so a same-day
    // sale renders before the payment against it. Stable, so list order is
    // the final tiebreak.
    rows.sort_by(|a, b| {
        a.date.cmp(&b.date).then(
            b.debit
                .partial_cmp(&a.debit)
                .unwrap_or(Ordering::Equal),
        )
    });

    if let Some(start) = range_start {
        let (before, in_range): (Vec<LedgerRow>, Vec<LedgerRow>) =
            rows.into_iter().partition(|r| r.date < start);

        let net: f64 = before.iter().map(|r| r.debit - r.credit).sum();
        rows = Vec::with_capacity(in_range.len() + 1);
        if !before.is_empty() {
            rows.push(LedgerRow {
                date: start,
                description: "Saldo anterior".to_string(),
                debit: net.max(0.0),
                credit: (-net).max(0.0),
                balance: 0.0,
            });
        }
        rows.extend(in_range);
    }

    let mut running = 0.0;
    for row in &mut rows {
        running += row.debit - row.credit;
        row.balance = running;
    }

    rows
}
