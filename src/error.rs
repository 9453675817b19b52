use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcopioError {
    #[error("Config directory not found at {0}. Run 'acopio init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Provider '{0}' not found")]
    ProviderNotFound(String),

    #[error("A {kind} with id '{id}' already exists")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Sale '{0}' not found")]
    SaleNotFound(String),

    #[error("Invalid sale index '{0}'. Use 'acopio sale list' to see available sales.")]
    InvalidSaleIndex(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Invalid unit '{0}'. Use 'baldes' or 'unidades'.")]
    InvalidUnit(String),

    #[error("Amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Payment would exceed the sale balance (max ${max:.2} remaining)")]
    OverPayment { sale: String, max: f64 },

    #[error("Payment exceeds the client's total debt (${max:.2} outstanding)")]
    ExceedsClientDebt { client: String, max: f64 },

    #[error("Client '{0}' has no outstanding debt")]
    NoOutstandingDebt(String),

    #[error("Not enough stock: {requested:.1} requested, {available:.1} available")]
    InsufficientStock { requested: f64, available: f64 },

    #[error("Backup file is missing the '{0}' section")]
    BackupMissingKey(&'static str),

    #[error("Failed to parse backup file {path}: {reason}")]
    BackupParse { path: PathBuf, reason: String },

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AcopioError>;
