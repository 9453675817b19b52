use chrono::NaiveDate;

use acopio::error::AcopioError;
use acopio::ledger::{
    allocate_lump_payment, cancel_account, client_debt, consolidated_ledger, record_payment,
};
use acopio::store::{Payment, Sale, SaleUnit};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sale(id: &str, client: &str, d: NaiveDate, total: f64) -> Sale {
    Sale {
        id: id.to_string(),
        date: d,
        client_id: client.to_string(),
        client_name: client.to_string(),
        price: total,
        quantity: 1.0,
        unit: SaleUnit::Unidades,
        total_amount: total,
        payments: Vec::new(),
    }
}

fn paid_sale(id: &str, client: &str, d: NaiveDate, total: f64, payments: &[(NaiveDate, f64)]) -> Sale {
    let mut s = sale(id, client, d, total);
    s.payments = payments
        .iter()
        .map(|&(date, amount)| Payment { date, amount })
        .collect();
    s
}

#[test]
fn allocation_conserves_total() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 1), 50.0),
        sale("V-0002", "tienda", date(2026, 1, 5), 30.0),
        sale("V-0003", "tienda", date(2026, 1, 10), 20.0),
    ];

    let debt_before = client_debt(&sales, "tienda");
    allocate_lump_payment(&mut sales, "tienda", 60.0, date(2026, 1, 15)).unwrap();
    let debt_after = client_debt(&sales, "tienda");

    assert!((debt_before - debt_after - 60.0).abs() < 0.001);
}

#[test]
fn allocation_pays_oldest_first() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 1), 50.0),
        sale("V-0002", "tienda", date(2026, 1, 5), 30.0),
        sale("V-0003", "tienda", date(2026, 1, 10), 20.0),
    ];

    let allocations =
        allocate_lump_payment(&mut sales, "tienda", 60.0, date(2026, 1, 15)).unwrap();

    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0].sale_id, "V-0001");
    assert!((allocations[0].amount - 50.0).abs() < 0.001);
    assert_eq!(allocations[1].sale_id, "V-0002");
    assert!((allocations[1].amount - 10.0).abs() < 0.001);

    assert!(sales[0].is_settled());
    assert!((sales[1].balance() - 20.0).abs() < 0.001);
    assert!(sales[2].payments.is_empty());
}

#[test]
fn allocation_breaks_date_ties_by_list_order() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 5), 40.0),
        sale("V-0002", "tienda", date(2026, 1, 5), 40.0),
    ];

    let allocations =
        allocate_lump_payment(&mut sales, "tienda", 50.0, date(2026, 1, 6)).unwrap();

    assert_eq!(allocations[0].sale_id, "V-0001");
    assert!((allocations[0].amount - 40.0).abs() < 0.001);
    assert_eq!(allocations[1].sale_id, "V-0002");
    assert!((allocations[1].amount - 10.0).abs() < 0.001);
}

#[test]
fn allocation_skips_other_clients() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 1), 50.0),
        sale("V-0002", "granja", date(2026, 1, 2), 80.0),
    ];

    allocate_lump_payment(&mut sales, "tienda", 50.0, date(2026, 1, 3)).unwrap();

    assert!(sales[0].is_settled());
    assert!(sales[1].payments.is_empty());
}

#[test]
fn allocation_rejected_when_exceeding_debt() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 1), 50.0),
        sale("V-0002", "tienda", date(2026, 1, 5), 30.0),
    ];

    let err = allocate_lump_payment(&mut sales, "tienda", 100.0, date(2026, 1, 6)).unwrap_err();
    assert!(matches!(err, AcopioError::ExceedsClientDebt { .. }));

    // Nothing applied
    assert!(sales.iter().all(|s| s.payments.is_empty()));
}

#[test]
fn allocation_rejected_without_outstanding_debt() {
    let mut sales = vec![paid_sale(
        "V-0001",
        "tienda",
        date(2026, 1, 1),
        50.0,
        &[(date(2026, 1, 1), 50.0)],
    )];

    let err = allocate_lump_payment(&mut sales, "tienda", 10.0, date(2026, 1, 2)).unwrap_err();
    assert!(matches!(err, AcopioError::NoOutstandingDebt(_)));
    assert_eq!(sales[0].payments.len(), 1);
}

#[test]
fn balances_never_go_negative() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 1), 50.0),
        sale("V-0002", "tienda", date(2026, 1, 5), 30.0),
        sale("V-0003", "tienda", date(2026, 2, 1), 20.0),
    ];

    record_payment(&mut sales[0], 25.0, date(2026, 1, 2)).unwrap();
    allocate_lump_payment(&mut sales, "tienda", 40.0, date(2026, 1, 10)).unwrap();
    cancel_account(&mut sales, "tienda", date(2026, 1, 31));

    for s in &sales {
        assert!(s.balance() >= -0.001, "{} went negative", s.id);
    }
}

#[test]
fn cancel_respects_cutoff() {
    let mut sales = vec![
        sale("V-0001", "tienda", date(2026, 1, 1), 50.0),
        sale("V-0002", "tienda", date(2026, 1, 5), 30.0),
        sale("V-0003", "tienda", date(2026, 1, 10), 20.0),
    ];

    let settled = cancel_account(&mut sales, "tienda", date(2026, 1, 5));

    assert_eq!(settled, 2);
    assert!((sales[0].balance()).abs() < 0.001);
    assert!((sales[1].balance()).abs() < 0.001);
    assert!(sales[2].payments.is_empty());
    assert!((client_debt(&sales, "tienda") - 20.0).abs() < 0.001);

    // Write-offs are dated at the cutoff
    assert_eq!(sales[0].payments[0].date, date(2026, 1, 5));
}

#[test]
fn cancel_skips_settled_sales() {
    let mut sales = vec![
        paid_sale(
            "V-0001",
            "tienda",
            date(2026, 1, 1),
            50.0,
            &[(date(2026, 1, 2), 50.0)],
        ),
        sale("V-0002", "tienda", date(2026, 1, 5), 30.0),
    ];

    let settled = cancel_account(&mut sales, "tienda", date(2026, 1, 31));

    assert_eq!(settled, 1);
    assert_eq!(sales[0].payments.len(), 1);
}

#[test]
fn record_payment_rejects_overpayment() {
    let mut s = paid_sale(
        "V-0001",
        "tienda",
        date(2026, 1, 1),
        100.0,
        &[(date(2026, 1, 2), 40.0)],
    );

    let err = record_payment(&mut s, 70.0, date(2026, 1, 3)).unwrap_err();
    assert!(matches!(err, AcopioError::OverPayment { .. }));
    assert_eq!(s.payments.len(), 1);
}

#[test]
fn record_payment_rejects_non_positive_amounts() {
    let mut s = sale("V-0001", "tienda", date(2026, 1, 1), 100.0);

    assert!(matches!(
        record_payment(&mut s, 0.0, date(2026, 1, 2)),
        Err(AcopioError::NonPositiveAmount)
    ));
    assert!(matches!(
        record_payment(&mut s, -5.0, date(2026, 1, 2)),
        Err(AcopioError::NonPositiveAmount)
    ));
    assert!(s.payments.is_empty());
}

#[test]
fn record_payment_accepts_exact_balance() {
    let mut s = sale("V-0001", "tienda", date(2026, 1, 1), 100.0);

    record_payment(&mut s, 100.0, date(2026, 1, 2)).unwrap();
    assert!(s.is_settled());
}

#[test]
fn ledger_reconciles_with_client_debt() {
    let sales = vec![
        paid_sale(
            "V-0001",
            "tienda",
            date(2026, 1, 1),
            300.0,
            &[(date(2026, 1, 1), 100.0)],
        ),
        paid_sale(
            "V-0002",
            "tienda",
            date(2026, 1, 10),
            200.0,
            &[(date(2026, 1, 15), 20.0)],
        ),
    ];

    let rows = consolidated_ledger(&sales, "tienda", None);
    let final_balance = rows.last().unwrap().balance;

    assert!((final_balance - 380.0).abs() < 0.001);
    assert!((final_balance - client_debt(&sales, "tienda")).abs() < 0.001);
}

#[test]
fn ledger_folds_same_day_payment_into_sale_row() {
    let sales = vec![paid_sale(
        "V-0001",
        "tienda",
        date(2026, 1, 1),
        300.0,
        &[(date(2026, 1, 1), 100.0), (date(2026, 1, 8), 50.0)],
    )];

    let rows = consolidated_ledger(&sales, "tienda", None);

    assert_eq!(rows.len(), 2);
    assert!((rows[0].debit - 300.0).abs() < 0.001);
    assert!((rows[0].credit - 100.0).abs() < 0.001);
    assert!((rows[0].balance - 200.0).abs() < 0.001);
    assert!(rows[1].description.starts_with("Abono"));
    assert!((rows[1].balance - 150.0).abs() < 0.001);
}

#[test]
fn ledger_orders_same_day_debit_before_credit() {
    // A payment against an older sale lands on the same day as a new sale:
    // the new sale's debit must render first.
    let sales = vec![
        paid_sale(
            "V-0001",
            "tienda",
            date(2026, 1, 1),
            100.0,
            &[(date(2026, 1, 5), 30.0)],
        ),
        sale("V-0002", "tienda", date(2026, 1, 5), 80.0),
    ];

    let rows = consolidated_ledger(&sales, "tienda", None);

    assert_eq!(rows.len(), 3);
    assert!(rows[1].description.starts_with("Venta V-0002"));
    assert!(rows[2].description.starts_with("Abono V-0001"));
}

#[test]
fn ledger_opening_balance_folds_prior_transactions() {
    let sales = vec![
        paid_sale(
            "V-0001",
            "tienda",
            date(2026, 1, 1),
            300.0,
            &[(date(2026, 1, 2), 100.0)],
        ),
        sale("V-0002", "tienda", date(2026, 2, 1), 150.0),
    ];

    let rows = consolidated_ledger(&sales, "tienda", Some(date(2026, 2, 1)));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].description, "Saldo anterior");
    assert!((rows[0].debit - 200.0).abs() < 0.001);
    assert!((rows[0].balance - 200.0).abs() < 0.001);

    // Final balance matches the unranged ledger
    let full = consolidated_ledger(&sales, "tienda", None);
    assert!((rows.last().unwrap().balance - full.last().unwrap().balance).abs() < 0.001);
}

#[test]
fn ledger_without_range_starts_at_zero() {
    let sales = vec![sale("V-0001", "tienda", date(2026, 1, 1), 100.0)];

    let rows = consolidated_ledger(&sales, "tienda", Some(date(2025, 12, 1)));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "Venta V-0001 (1 unidades)");
    assert!((rows[0].balance - 100.0).abs() < 0.001);
}

#[test]
fn sale_list_round_trips_through_json() {
    let sales = vec![
        paid_sale(
            "V-0001",
            "tienda",
            date(2026, 1, 1),
            300.0,
            &[(date(2026, 1, 2), 100.0)],
        ),
        sale("V-0002", "granja", date(2026, 2, 1), 150.0),
    ];

    let json = serde_json::to_string(&sales).unwrap();
    let parsed: Vec<Sale> = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed, sales);
}
