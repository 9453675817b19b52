mod records;

pub use records::{
    Client, Delivery, MovementKind, Payment, ProductionRun, Provider, Sale, SaleStatus, SaleUnit,
    StockMovement,
};

use crate::error::{AcopioError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CLIENTS_FILE: &str = "clients.json";
const PROVIDERS_FILE: &str = "providers.json";
const SALES_FILE: &str = "sales.json";
const DELIVERIES_FILE: &str = "deliveries.json";
const PRODUCTION_FILE: &str = "production.json";
const STOCK_FILE: &str = "stock.json";

/// Owns the canonical data collections. Everything is read in full at open
/// and rewritten in full after each mutating command.
#[derive(Debug)]
pub struct Store {
    dir: PathBuf,
    pub clients: Vec<Client>,
    pub providers: Vec<Provider>,
    pub sales: Vec<Sale>,
    pub deliveries: Vec<Delivery>,
    pub production: Vec<ProductionRun>,
    pub stock: Vec<StockMovement>,
}

/// Single-document backup of every collection. All keys are required, so a
/// typed parse doubles as the shape validation for restore.
#[derive(Debug, Deserialize, Serialize)]
pub struct BackupDocument {
    pub clients: Vec<Client>,
    pub providers: Vec<Provider>,
    pub sales: Vec<Sale>,
    pub deliveries: Vec<Delivery>,
    pub production: Vec<ProductionRun>,
    pub stock: Vec<StockMovement>,
}

const BACKUP_KEYS: [&str; 6] = [
    "clients",
    "providers",
    "sales",
    "deliveries",
    "production",
    "stock",
];

/// Load one collection file. A missing file is an empty collection; a file
/// that no longer parses as the expected shape is logged and replaced by an
/// empty default rather than taking the whole application down.
fn load_collection<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<T>> {
    let path = dir.join(file);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path)?;
    match serde_json::from_str(&content) {
        Ok(records) => Ok(records),
        Err(e) => {
            eprintln!("warning: {} is corrupted ({e}), starting empty", path.display());
            fs::write(&path, "[]")?;
            Ok(Vec::new())
        }
    }
}

fn save_collection<T: Serialize>(dir: &Path, file: &str, records: &[T]) -> Result<()> {
    let content = serde_json::to_string_pretty(records).map_err(|e| {
        AcopioError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        ))
    })?;
    fs::write(dir.join(file), content)?;
    Ok(())
}

impl Store {
    pub fn open(dir: &Path) -> Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            clients: load_collection(dir, CLIENTS_FILE)?,
            providers: load_collection(dir, PROVIDERS_FILE)?,
            sales: load_collection(dir, SALES_FILE)?,
            deliveries: load_collection(dir, DELIVERIES_FILE)?,
            production: load_collection(dir, PRODUCTION_FILE)?,
            stock: load_collection(dir, STOCK_FILE)?,
        })
    }

    pub fn save(&self) -> Result<()> {
        save_collection(&self.dir, CLIENTS_FILE, &self.clients)?;
        save_collection(&self.dir, PROVIDERS_FILE, &self.providers)?;
        save_collection(&self.dir, SALES_FILE, &self.sales)?;
        save_collection(&self.dir, DELIVERIES_FILE, &self.deliveries)?;
        save_collection(&self.dir, PRODUCTION_FILE, &self.production)?;
        save_collection(&self.dir, STOCK_FILE, &self.stock)?;
        Ok(())
    }

    pub fn find_client(&self, id: &str) -> Result<&Client> {
        self.clients
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AcopioError::ClientNotFound(id.to_string()))
    }

    pub fn find_provider(&self, id: &str) -> Result<&Provider> {
        self.providers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AcopioError::ProviderNotFound(id.to_string()))
    }

    /// Sales for one client, in insertion order.
    pub fn client_sales(&self, client_id: &str) -> Vec<&Sale> {
        self.sales
            .iter()
            .filter(|s| s.client_id == client_id)
            .collect()
    }

    pub fn next_sale_id(&self) -> String {
        format!("V-{:04}", next_seq(self.sales.iter().map(|s| s.id.as_str())))
    }

    pub fn next_delivery_id(&self) -> String {
        format!(
            "E-{:04}",
            next_seq(self.deliveries.iter().map(|d| d.id.as_str()))
        )
    }

    pub fn next_production_id(&self) -> String {
        format!(
            "P-{:04}",
            next_seq(self.production.iter().map(|p| p.id.as_str()))
        )
    }

    /// Current whole-milk stock level in liters.
    pub fn stock_level(&self) -> f64 {
        self.stock.iter().map(|m| m.signed()).sum()
    }

    pub fn backup(&self, path: &Path) -> Result<()> {
        let doc = BackupDocument {
            clients: self.clients.clone(),
            providers: self.providers.clone(),
            sales: self.sales.clone(),
            deliveries: self.deliveries.clone(),
            production: self.production.clone(),
            stock: self.stock.clone(),
        };
        let content = serde_json::to_string_pretty(&doc).map_err(|e| {
            AcopioError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate the whole backup document before touching anything, then
    /// replace every collection and persist. A bad file aborts with the
    /// current data untouched.
    pub fn restore(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;

        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| AcopioError::BackupParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        for key in BACKUP_KEYS {
            if value.get(key).is_none() {
                return Err(AcopioError::BackupMissingKey(key));
            }
        }

        let doc: BackupDocument =
            serde_json::from_value(value).map_err(|e| AcopioError::BackupParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        self.clients = doc.clients;
        self.providers = doc.providers;
        self.sales = doc.sales;
        self.deliveries = doc.deliveries;
        self.production = doc.production;
        self.stock = doc.stock;
        self.save()
    }
}

/// Next sequence number for ids shaped like "V-0012".
fn next_seq<'a>(ids: impl Iterator<Item = &'a str>) -> u32 {
    ids.filter_map(|id| id.rsplit('-').next())
        .filter_map(|n| n.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1
}
