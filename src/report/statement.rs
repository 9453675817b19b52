use chrono::NaiveDate;
use serde::Serialize;

use crate::config::Business;
use crate::ledger::LedgerRow;
use crate::store::{Client, Sale};

/// A single row in the statement table
#[derive(Debug, Serialize)]
pub struct StatementRow {
    pub date: String,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

/// Complete data for rendering the client statement PDF
#[derive(Debug, Serialize)]
pub struct StatementData {
    pub business: Business,
    pub client_id: String,
    pub client_name: String,
    pub client_address: Option<String>,
    pub client_phone: Option<String>,
    pub rows: Vec<StatementRow>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub final_balance: f64,
    pub currency_symbol: String,
    pub generated_date: String,
    pub range_from: Option<String>,
}

/// Shape ledger rows into the statement payload. The client header falls
/// back to the name snapshot on the sales when the client record is gone.
pub fn build_statement(
    business: Business,
    client: Option<&Client>,
    client_id: &str,
    client_sales: &[&Sale],
    ledger_rows: &[LedgerRow],
    currency_symbol: &str,
    range_from: Option<NaiveDate>,
) -> StatementData {
    let client_name = client
        .map(|c| c.name.clone())
        .or_else(|| client_sales.last().map(|s| s.client_name.clone()))
        .unwrap_or_else(|| client_id.to_string());

    let rows: Vec<StatementRow> = ledger_rows
        .iter()
        .map(|r| StatementRow {
            date: r.date.format("%B %d, %Y").to_string(),
            description: r.description.clone(),
            debit: r.debit,
            credit: r.credit,
            balance: r.balance,
        })
        .collect();

    let total_debit: f64 = ledger_rows.iter().map(|r| r.debit).sum();
    let total_credit: f64 = ledger_rows.iter().map(|r| r.credit).sum();
    let final_balance = ledger_rows.last().map(|r| r.balance).unwrap_or(0.0);

    StatementData {
        business,
        client_id: client_id.to_string(),
        client_name,
        client_address: client.and_then(|c| c.address.clone()),
        client_phone: client.and_then(|c| c.phone.clone()),
        rows,
        total_debit,
        total_credit,
        final_balance,
        currency_symbol: currency_symbol.to_string(),
        generated_date: chrono::Local::now().format("%B %d, %Y").to_string(),
        range_from: range_from.map(|d| d.to_string()),
    }
}
