use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub business: Business,
    pub currency: CurrencySettings,
    #[serde(default)]
    pub stock: StockSettings,
    pub pdf: PdfSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Business {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CurrencySettings {
    pub symbol: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StockSettings {
    pub balde_units: f64,
}

impl Default for StockSettings {
    fn default() -> Self {
        Self { balde_units: 100.0 }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PdfSettings {
    pub output_dir: String,
}
