use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaleUnit {
    Baldes,
    Unidades,
}

impl fmt::Display for SaleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleUnit::Baldes => write!(f, "baldes"),
            SaleUnit::Unidades => write!(f, "unidades"),
        }
    }
}

impl FromStr for SaleUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baldes" => Ok(SaleUnit::Baldes),
            "unidades" => Ok(SaleUnit::Unidades),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Payment {
    pub date: NaiveDate,
    pub amount: f64,
}

/// A sale to a client. `total_amount` is computed at creation (price x
/// quantity, with baldes normalized to base units) and never recomputed;
/// only payments are appended afterwards.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Sale {
    pub id: String,
    pub date: NaiveDate,
    pub client_id: String,
    /// Snapshot of the client name at sale time, kept so statements stay
    /// readable if the client record is edited or removed later.
    pub client_name: String,
    pub price: f64,
    pub quantity: f64,
    pub unit: SaleUnit,
    pub total_amount: f64,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleStatus {
    Pending,
    Partial,
    Settled,
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleStatus::Pending => write!(f, "PENDING"),
            SaleStatus::Partial => write!(f, "PARTIAL"),
            SaleStatus::Settled => write!(f, "SETTLED"),
        }
    }
}

impl Sale {
    pub fn paid_amount(&self) -> f64 {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn balance(&self) -> f64 {
        self.total_amount - self.paid_amount()
    }

    pub fn is_settled(&self) -> bool {
        self.balance() <= 0.001
    }

    pub fn status(&self) -> SaleStatus {
        if self.is_settled() {
            SaleStatus::Settled
        } else if self.paid_amount() > 0.0 {
            SaleStatus::Partial
        } else {
            SaleStatus::Pending
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Delivery {
    pub id: String,
    pub date: NaiveDate,
    pub provider_id: String,
    pub provider_name: String,
    /// Liters of raw milk received.
    pub quantity: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProductionRun {
    pub id: String,
    pub date: NaiveDate,
    /// Liters of milk consumed by the run.
    pub milk_used: f64,
    /// Units of product obtained.
    pub product_out: f64,
    pub product: String,
}

impl ProductionRun {
    /// Liters of milk per unit of product. Zero when the run produced
    /// nothing, so reports never divide by zero.
    pub fn transformation_index(&self) -> f64 {
        if self.product_out > 0.0 {
            self.milk_used / self.product_out
        } else {
            0.0
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Entrada,
    Salida,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StockMovement {
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub quantity: f64,
    #[serde(default)]
    pub note: Option<String>,
}

impl StockMovement {
    /// Signed contribution to the whole-milk stock level.
    pub fn signed(&self) -> f64 {
        match self.kind {
            MovementKind::Entrada => self.quantity,
            MovementKind::Salida => -self.quantity,
        }
    }
}
