mod config;
mod error;
mod ledger;
mod pdf;
mod report;
mod store;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use crate::config::{config_dir, load_config, resolve_output_dir, Config, CONFIG_TEMPLATE};
use crate::error::{AcopioError, Result};
use crate::ledger::{allocate_lump_payment, cancel_account, client_debt, consolidated_ledger};
use crate::pdf::{generate_statement_pdf, generate_weekly_pdf};
use crate::report::{build_statement, build_weekly_report, week_bounds, WeeklyReportData};
use crate::store::{
    Client, Delivery, MovementKind, ProductionRun, Provider, Sale, SaleUnit, StockMovement, Store,
};

#[derive(Parser)]
#[command(name = "acopio")]
#[command(version, about = "CLI operations tracker for a dairy collection business", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.acopio or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with template files
    Init,

    /// Show business status and totals
    Status,

    /// Manage clients
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Manage raw-milk providers
    Provider {
        #[command(subcommand)]
        command: ProviderCommands,
    },

    /// Record and list raw-milk deliveries
    Delivery {
        #[command(subcommand)]
        command: DeliveryCommands,
    },

    /// Record and list production runs
    Production {
        #[command(subcommand)]
        command: ProductionCommands,
    },

    /// Track whole-milk stock
    Stock {
        #[command(subcommand)]
        command: StockCommands,
    },

    /// Record and list sales
    Sale {
        #[command(subcommand)]
        command: SaleCommands,
    },

    /// Record payments against a single sale
    Payment {
        #[command(subcommand)]
        command: PaymentCommands,
    },

    /// Client debt operations
    Debt {
        #[command(subcommand)]
        command: DebtCommands,
    },

    /// Consolidated statement for a client
    Statement {
        /// Client identifier
        client: String,

        /// Fold everything before this date into an opening balance (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Also render the statement as a PDF
        #[arg(long)]
        pdf: bool,

        /// Open the generated PDF with the system default viewer
        #[arg(long)]
        open: bool,
    },

    /// Weekly reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Export all data to a single JSON file
    Backup {
        /// Destination file
        file: PathBuf,
    },

    /// Replace all data from a backup file
    Restore {
        /// Backup file to restore from
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Add a client
    Add {
        /// Short identifier (e.g. 'tienda-rosa')
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },

    /// List clients
    List,

    /// Remove a client (sales are kept, with the name snapshot)
    Remove { id: String },
}

#[derive(Subcommand)]
enum ProviderCommands {
    /// Add a provider
    Add {
        /// Short identifier (e.g. 'finca-alta')
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        phone: Option<String>,
    },

    /// List providers
    List,

    /// Remove a provider (deliveries are kept, with the name snapshot)
    Remove { id: String },
}

#[derive(Subcommand)]
enum DeliveryCommands {
    /// Record a raw-milk delivery
    Add {
        /// Provider identifier
        #[arg(long)]
        provider: String,

        /// Liters received
        #[arg(long)]
        quantity: f64,

        /// Delivery date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List deliveries
    List {
        /// Only the Monday..Sunday week containing this date (YYYY-MM-DD)
        #[arg(long)]
        week: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProductionCommands {
    /// Record a production run
    Add {
        /// Liters of milk used
        #[arg(long)]
        milk: f64,

        /// Units of product obtained
        #[arg(long)]
        out: f64,

        /// Product name (e.g. 'queso')
        #[arg(long)]
        product: String,

        /// Run date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// List production runs
    List {
        /// Only the Monday..Sunday week containing this date (YYYY-MM-DD)
        #[arg(long)]
        week: Option<String>,
    },
}

#[derive(Subcommand)]
enum StockCommands {
    /// Record a whole-milk stock replenishment
    In {
        /// Liters added
        quantity: f64,

        /// Movement date (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Record a whole-milk stock consumption
    Out {
        /// Liters consumed
        quantity: f64,

        /// Movement date (default: today)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Show current stock level and recent movements
    Status,
}

#[derive(Subcommand)]
enum SaleCommands {
    /// Record a sale
    Add {
        /// Client identifier
        #[arg(long)]
        client: String,

        /// Unit price
        #[arg(long)]
        price: f64,

        /// Quantity sold
        #[arg(long)]
        quantity: f64,

        /// Sale unit: 'baldes' or 'unidades'
        #[arg(long)]
        unit: String,

        /// Sale date (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Initial payment recorded with the sale's own date
        #[arg(long)]
        down_payment: Option<f64>,
    },

    /// List sales
    List {
        /// Only sales for this client
        #[arg(long)]
        client: Option<String>,
    },

    /// Delete a sale (irreversible)
    Remove {
        /// Sale id or index from 'sale list' (e.g. 1 or V-0001)
        sale: String,
    },
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Record a payment against a sale
    Add {
        /// Sale id or index from 'sale list' (e.g. 1 or V-0001)
        sale: String,

        /// Payment amount
        amount: f64,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show payment history for a sale
    List {
        /// Sale id or index from 'sale list' (e.g. 1 or V-0001)
        sale: String,
    },
}

#[derive(Subcommand)]
enum DebtCommands {
    /// Show outstanding debt, per client or for one client
    Show {
        /// Client identifier (omit for the all-clients summary)
        client: Option<String>,
    },

    /// Apply a lump payment across a client's outstanding sales, oldest first
    Pay {
        /// Client identifier
        client: String,

        /// Payment amount
        amount: f64,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Write off all outstanding balances up to a cutoff date
    Cancel {
        /// Client identifier
        client: String,

        /// Sales dated on or before this date are settled (YYYY-MM-DD)
        #[arg(long)]
        cutoff: String,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Aggregate deliveries, production, sales and stock for one week
    Week {
        /// Any date inside the week to report (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Also render the report as a PDF
        #[arg(long)]
        pdf: bool,

        /// Open the generated PDF with the system default viewer
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Determine config directory
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Client { command } => match command {
            ClientCommands::Add {
                id,
                name,
                address,
                phone,
            } => cmd_client_add(&cfg_dir, &id, &name, address, phone),
            ClientCommands::List => cmd_client_list(&cfg_dir),
            ClientCommands::Remove { id } => cmd_client_remove(&cfg_dir, &id),
        },
        Commands::Provider { command } => match command {
            ProviderCommands::Add { id, name, phone } => {
                cmd_provider_add(&cfg_dir, &id, &name, phone)
            }
            ProviderCommands::List => cmd_provider_list(&cfg_dir),
            ProviderCommands::Remove { id } => cmd_provider_remove(&cfg_dir, &id),
        },
        Commands::Delivery { command } => match command {
            DeliveryCommands::Add {
                provider,
                quantity,
                date,
            } => cmd_delivery_add(&cfg_dir, &provider, quantity, date),
            DeliveryCommands::List { week } => cmd_delivery_list(&cfg_dir, week),
        },
        Commands::Production { command } => match command {
            ProductionCommands::Add {
                milk,
                out,
                product,
                date,
            } => cmd_production_add(&cfg_dir, milk, out, &product, date),
            ProductionCommands::List { week } => cmd_production_list(&cfg_dir, week),
        },
        Commands::Stock { command } => match command {
            StockCommands::In {
                quantity,
                date,
                note,
            } => cmd_stock_move(&cfg_dir, MovementKind::Entrada, quantity, date, note),
            StockCommands::Out {
                quantity,
                date,
                note,
            } => cmd_stock_move(&cfg_dir, MovementKind::Salida, quantity, date, note),
            StockCommands::Status => cmd_stock_status(&cfg_dir),
        },
        Commands::Sale { command } => match command {
            SaleCommands::Add {
                client,
                price,
                quantity,
                unit,
                date,
                down_payment,
            } => cmd_sale_add(&cfg_dir, &client, price, quantity, &unit, date, down_payment),
            SaleCommands::List { client } => cmd_sale_list(&cfg_dir, client),
            SaleCommands::Remove { sale } => cmd_sale_remove(&cfg_dir, &sale),
        },
        Commands::Payment { command } => match command {
            PaymentCommands::Add { sale, amount, date } => {
                cmd_payment_add(&cfg_dir, &sale, amount, date)
            }
            PaymentCommands::List { sale } => cmd_payment_list(&cfg_dir, &sale),
        },
        Commands::Debt { command } => match command {
            DebtCommands::Show { client } => cmd_debt_show(&cfg_dir, client),
            DebtCommands::Pay {
                client,
                amount,
                date,
            } => cmd_debt_pay(&cfg_dir, &client, amount, date),
            DebtCommands::Cancel { client, cutoff } => {
                cmd_debt_cancel(&cfg_dir, &client, &cutoff)
            }
        },
        Commands::Statement {
            client,
            from,
            pdf,
            open,
        } => cmd_statement(&cfg_dir, &client, from, pdf, open),
        Commands::Report { command } => match command {
            ReportCommands::Week { date, pdf, open } => cmd_report_week(&cfg_dir, date, pdf, open),
        },
        Commands::Backup { file } => cmd_backup(&cfg_dir, &file),
        Commands::Restore { file } => cmd_restore(&cfg_dir, &file),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &PathBuf) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(AcopioError::AlreadyInitialized(cfg_dir.clone()));
    }

    // Create directories
    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("output"))?;

    // Write template config and empty data files
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;
    let store = Store::open(cfg_dir)?;
    store.save()?;

    println!("Initialized acopio config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit your business details:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Add providers:               acopio provider add <id> --name <name>");
    println!("  3. Add clients:                 acopio client add <id> --name <name>");
    println!();
    println!("Then record your first delivery:");
    println!("  acopio delivery add --provider <id> --quantity <liters>");

    Ok(())
}

/// Load config and data, failing with the init hint if the dir is missing
fn open_env(cfg_dir: &PathBuf) -> Result<(Config, Store)> {
    if !cfg_dir.exists() {
        return Err(AcopioError::ConfigNotFound(cfg_dir.clone()));
    }
    let config = load_config(cfg_dir)?;
    let store = Store::open(cfg_dir)?;
    Ok((config, store))
}

// Table row structs for tabled
#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ADDRESS")]
    address: String,
    #[tabled(rename = "PHONE")]
    phone: String,
}

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "PHONE")]
    phone: String,
}

#[derive(Tabled)]
struct DeliveryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "PROVIDER")]
    provider: String,
    #[tabled(rename = "LITERS")]
    liters: String,
}

#[derive(Tabled)]
struct ProductionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "PRODUCT")]
    product: String,
    #[tabled(rename = "MILK (L)")]
    milk: String,
    #[tabled(rename = "OUT")]
    out: String,
    #[tabled(rename = "INDEX")]
    index: String,
}

#[derive(Tabled)]
struct StockRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "LITERS")]
    liters: String,
    #[tabled(rename = "NOTE")]
    note: String,
}

#[derive(Tabled)]
struct SaleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "CLIENT")]
    client: String,
}

#[derive(Tabled)]
struct PaymentRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "AMOUNT")]
    amount: String,
}

#[derive(Tabled)]
struct DebtRow {
    #[tabled(rename = "CLIENT")]
    client: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "OPEN SALES")]
    open_sales: usize,
    #[tabled(rename = "DEBT")]
    debt: String,
}

#[derive(Tabled)]
struct OutstandingSaleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "TOTAL")]
    total: String,
    #[tabled(rename = "PAID")]
    paid: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

#[derive(Tabled)]
struct LedgerDisplayRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "DESCRIPTION")]
    description: String,
    #[tabled(rename = "DEBIT")]
    debit: String,
    #[tabled(rename = "CREDIT")]
    credit: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

fn format_whole_money(value: f64, currency_symbol: &str) -> String {
    let rounded = value.round() as i64;
    let grouped = format_grouped_int(rounded);
    format!("{}{:>6}", currency_symbol, grouped)
}

fn format_grouped_int(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut grouped: String = out.chars().rev().collect();
    if negative {
        grouped.insert(0, '-');
    }
    grouped
}

/// Format a money amount with two decimal places and thousands separators
fn format_amount(value: f64, currency_symbol: &str) -> String {
    let rounded = format!("{:.2}", value);
    let parts: Vec<&str> = rounded.split('.').collect();
    let whole = parts[0];
    let frac = parts[1];

    let negative = whole.starts_with('-');
    let digits = if negative { &whole[1..] } else { whole };
    let grouped = format_grouped_int(digits.parse::<i64>().unwrap_or(0));

    if negative {
        format!("-{}{}.{}", currency_symbol, grouped, frac)
    } else {
        format!("{}{}.{}", currency_symbol, grouped, frac)
    }
}

fn format_quantity(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.1}", value)
    }
}

fn add_financial_footer(table: &str, total: &str, paid: &str, outstanding: &str) -> String {
    let lines: Vec<&str> = table.lines().collect();
    if lines.len() < 4 {
        return table.to_string();
    }

    // Parse the top border to discover column widths
    let top = lines[0];
    let Some(inner) = top.strip_prefix('╭').and_then(|s| s.strip_suffix('╮')) else {
        return table.to_string();
    };

    let widths: Vec<usize> = inner.split('┬').map(|p| p.chars().count()).collect();
    if widths.len() < 6 {
        return table.to_string();
    }

    // Merge columns #, ID, DATE into one label cell; keep TOTAL column; drop STATUS and CLIENT
    let left_width = widths[0] + widths[1] + widths[2] + 2; // +2 for the two ┴ replaced by spaces
    let total_width = widths[3];
    let status_width = widths[4];
    let client_width = widths[5];

    let rows = [
        ("TOTAL", total),
        ("(-) PAID", paid),
        ("(=) OUTSTANDING", outstanding),
    ];

    // Strip the original bottom border and start building
    let mut out = lines[..lines.len() - 1].join("\n");
    out.push('\n');

    // First separator: merge left 3 columns, keep TOTAL, close off STATUS+CLIENT
    out.push_str(&format!(
        "├{}┴{}┴{}┼{}┼{}┴{}╯\n",
        "─".repeat(widths[0]),
        "─".repeat(widths[1]),
        "─".repeat(widths[2]),
        "─".repeat(total_width),
        "─".repeat(status_width),
        "─".repeat(client_width),
    ));

    // Summary rows with separators between them
    for (idx, (label, value)) in rows.iter().enumerate() {
        out.push_str(&format!(
            "│ {:>left$} │ {:>total$} │\n",
            label,
            value,
            left = left_width - 2,
            total = total_width - 2
        ));
        if idx < rows.len() - 1 {
            out.push_str(&format!(
                "├{}┼{}┤\n",
                "─".repeat(left_width),
                "─".repeat(total_width)
            ));
        }
    }

    // Bottom border
    out.push_str(&format!(
        "╰{}┴{}╯",
        "─".repeat(left_width),
        "─".repeat(total_width)
    ));

    out
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| AcopioError::InvalidDate(s.to_string()))
}

fn parse_date_or_today(s: Option<&str>) -> Result<NaiveDate> {
    match s {
        Some(s) => parse_date(s),
        None => Ok(Local::now().date_naive()),
    }
}

/// Resolve a sale reference to the actual sale id.
/// Accepts either an index (1-based) from 'sale list' or the full sale id.
fn resolve_sale_id(store: &Store, reference: &str) -> Result<String> {
    // Try to parse as an index first
    if let Ok(idx) = reference.parse::<usize>() {
        if idx == 0 {
            return Err(AcopioError::InvalidSaleIndex(reference.to_string()));
        }
        // Sales are displayed in reverse order (newest first), 1-indexed
        let sales: Vec<_> = store.sales.iter().rev().collect();
        if idx > sales.len() {
            return Err(AcopioError::InvalidSaleIndex(reference.to_string()));
        }
        return Ok(sales[idx - 1].id.clone());
    }

    // Otherwise, treat as sale id - verify it exists
    if store.sales.iter().any(|s| s.id == reference) {
        Ok(reference.to_string())
    } else {
        Err(AcopioError::SaleNotFound(reference.to_string()))
    }
}

/// A client id is acceptable for debt operations when the client record
/// exists or when sales still reference it (the record may have been removed).
fn ensure_known_client(store: &Store, client_id: &str) -> Result<()> {
    if store.clients.iter().any(|c| c.id == client_id)
        || store.sales.iter().any(|s| s.client_id == client_id)
    {
        Ok(())
    } else {
        Err(AcopioError::ClientNotFound(client_id.to_string()))
    }
}

fn open_path(pdf_path: &PathBuf) -> Result<()> {
    // Open with system default viewer
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(pdf_path)
            .spawn()
            .map_err(AcopioError::Io)?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(pdf_path)
            .spawn()
            .map_err(AcopioError::Io)?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", pdf_path.to_str().unwrap_or("")])
            .spawn()
            .map_err(AcopioError::Io)?;
    }
    Ok(())
}

/// Show business status and totals
fn cmd_status(cfg_dir: &PathBuf) -> Result<()> {
    let (config, store) = open_env(cfg_dir)?;

    let outstanding: f64 = store.sales.iter().map(|s| s.balance().max(0.0)).sum();

    println!("Acopio Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Business:         {}", config.business.name);
    println!("Providers:        {}", store.providers.len());
    println!("Clients:          {}", store.clients.len());
    println!("Sales:            {}", store.sales.len());
    println!(
        "Outstanding:      {}",
        format_amount(outstanding, &config.currency.symbol)
    );
    println!("Milk stock:       {} L", format_quantity(store.stock_level()));

    if !store.sales.is_empty() {
        println!();
        println!("Recent sales:");
        for sale in store.sales.iter().rev().take(5) {
            println!(
                "  {} - {} - {}",
                sale.id,
                sale.client_name,
                format_amount(sale.total_amount, &config.currency.symbol)
            );
        }
    }

    Ok(())
}

fn cmd_client_add(
    cfg_dir: &PathBuf,
    id: &str,
    name: &str,
    address: Option<String>,
    phone: Option<String>,
) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    if store.clients.iter().any(|c| c.id == id) {
        return Err(AcopioError::DuplicateId {
            kind: "client",
            id: id.to_string(),
        });
    }

    store.clients.push(Client {
        id: id.to_string(),
        name: name.to_string(),
        address,
        phone,
    });
    store.save()?;

    println!("Added client '{id}' ({name})");
    Ok(())
}

fn cmd_client_list(cfg_dir: &PathBuf) -> Result<()> {
    let (_, store) = open_env(cfg_dir)?;

    if store.clients.is_empty() {
        println!("No clients yet. Add one with 'acopio client add <id> --name <name>'.");
        return Ok(());
    }

    let rows: Vec<ClientRow> = store
        .clients
        .iter()
        .map(|c| ClientRow {
            id: c.id.clone(),
            name: c.name.clone(),
            address: c.address.clone().unwrap_or_default(),
            phone: c.phone.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

fn cmd_client_remove(cfg_dir: &PathBuf, id: &str) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    let before = store.clients.len();
    store.clients.retain(|c| c.id != id);
    if store.clients.len() == before {
        return Err(AcopioError::ClientNotFound(id.to_string()));
    }
    store.save()?;

    println!("Removed client '{id}'");
    Ok(())
}

fn cmd_provider_add(
    cfg_dir: &PathBuf,
    id: &str,
    name: &str,
    phone: Option<String>,
) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    if store.providers.iter().any(|p| p.id == id) {
        return Err(AcopioError::DuplicateId {
            kind: "provider",
            id: id.to_string(),
        });
    }

    store.providers.push(Provider {
        id: id.to_string(),
        name: name.to_string(),
        phone,
    });
    store.save()?;

    println!("Added provider '{id}' ({name})");
    Ok(())
}

fn cmd_provider_list(cfg_dir: &PathBuf) -> Result<()> {
    let (_, store) = open_env(cfg_dir)?;

    if store.providers.is_empty() {
        println!("No providers yet. Add one with 'acopio provider add <id> --name <name>'.");
        return Ok(());
    }

    let rows: Vec<ProviderRow> = store
        .providers
        .iter()
        .map(|p| ProviderRow {
            id: p.id.clone(),
            name: p.name.clone(),
            phone: p.phone.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

fn cmd_provider_remove(cfg_dir: &PathBuf, id: &str) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    let before = store.providers.len();
    store.providers.retain(|p| p.id != id);
    if store.providers.len() == before {
        return Err(AcopioError::ProviderNotFound(id.to_string()));
    }
    store.save()?;

    println!("Removed provider '{id}'");
    Ok(())
}

fn cmd_delivery_add(
    cfg_dir: &PathBuf,
    provider_id: &str,
    quantity: f64,
    date: Option<String>,
) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    if quantity <= 0.0 {
        return Err(AcopioError::NonPositiveQuantity);
    }
    let date = parse_date_or_today(date.as_deref())?;
    let provider = store.find_provider(provider_id)?;
    let provider_name = provider.name.clone();
    let id = store.next_delivery_id();

    store.deliveries.push(Delivery {
        id: id.clone(),
        date,
        provider_id: provider_id.to_string(),
        provider_name: provider_name.clone(),
        quantity,
    });
    store.save()?;

    println!(
        "Recorded {id}: {} L from {provider_name} on {date}",
        format_quantity(quantity)
    );
    Ok(())
}

fn cmd_delivery_list(cfg_dir: &PathBuf, week: Option<String>) -> Result<()> {
    let (_, store) = open_env(cfg_dir)?;

    let range = week
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(week_bounds);

    let deliveries: Vec<_> = store
        .deliveries
        .iter()
        .filter(|d| range.map_or(true, |(start, end)| d.date >= start && d.date <= end))
        .collect();

    if deliveries.is_empty() {
        println!("No deliveries recorded.");
        return Ok(());
    }

    let rows: Vec<DeliveryRow> = deliveries
        .iter()
        .map(|d| DeliveryRow {
            id: d.id.clone(),
            date: d.date.to_string(),
            provider: d.provider_name.clone(),
            liters: format_quantity(d.quantity),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    let total: f64 = deliveries.iter().map(|d| d.quantity).sum();
    println!();
    println!(
        "Total: {} deliveries, {} L",
        deliveries.len(),
        format_quantity(total)
    );

    Ok(())
}

fn cmd_production_add(
    cfg_dir: &PathBuf,
    milk: f64,
    out: f64,
    product: &str,
    date: Option<String>,
) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    if milk <= 0.0 || out < 0.0 {
        return Err(AcopioError::NonPositiveQuantity);
    }
    let date = parse_date_or_today(date.as_deref())?;
    let id = store.next_production_id();

    let run = ProductionRun {
        id: id.clone(),
        date,
        milk_used: milk,
        product_out: out,
        product: product.to_string(),
    };
    let index = run.transformation_index();
    store.production.push(run);
    store.save()?;

    println!(
        "Recorded {id}: {} L -> {} {product} ({} L/unit)",
        format_quantity(milk),
        format_quantity(out),
        format_quantity(index)
    );
    Ok(())
}

fn cmd_production_list(cfg_dir: &PathBuf, week: Option<String>) -> Result<()> {
    let (_, store) = open_env(cfg_dir)?;

    let range = week
        .as_deref()
        .map(parse_date)
        .transpose()?
        .map(week_bounds);

    let runs: Vec<_> = store
        .production
        .iter()
        .filter(|r| range.map_or(true, |(start, end)| r.date >= start && r.date <= end))
        .collect();

    if runs.is_empty() {
        println!("No production runs recorded.");
        return Ok(());
    }

    let rows: Vec<ProductionRow> = runs
        .iter()
        .map(|r| ProductionRow {
            id: r.id.clone(),
            date: r.date.to_string(),
            product: r.product.clone(),
            milk: format_quantity(r.milk_used),
            out: format_quantity(r.product_out),
            index: format!("{:.2}", r.transformation_index()),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

fn cmd_stock_move(
    cfg_dir: &PathBuf,
    kind: MovementKind,
    quantity: f64,
    date: Option<String>,
    note: Option<String>,
) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    if quantity <= 0.0 {
        return Err(AcopioError::NonPositiveQuantity);
    }
    let date = parse_date_or_today(date.as_deref())?;

    if kind == MovementKind::Salida {
        let available = store.stock_level();
        if quantity > available + 0.001 {
            return Err(AcopioError::InsufficientStock {
                requested: quantity,
                available,
            });
        }
    }

    store.stock.push(StockMovement {
        date,
        kind,
        quantity,
        note,
    });
    store.save()?;

    let verb = match kind {
        MovementKind::Entrada => "Added",
        MovementKind::Salida => "Consumed",
    };
    println!(
        "{verb} {} L ({} L in stock)",
        format_quantity(quantity),
        format_quantity(store.stock_level())
    );
    Ok(())
}

fn cmd_stock_status(cfg_dir: &PathBuf) -> Result<()> {
    let (_, store) = open_env(cfg_dir)?;

    println!("Milk stock: {} L", format_quantity(store.stock_level()));

    if store.stock.is_empty() {
        return Ok(());
    }

    println!();
    println!("Recent movements:");
    let rows: Vec<StockRow> = store
        .stock
        .iter()
        .rev()
        .take(10)
        .map(|m| StockRow {
            date: m.date.to_string(),
            kind: match m.kind {
                MovementKind::Entrada => "IN".to_string(),
                MovementKind::Salida => "OUT".to_string(),
            },
            liters: format_quantity(m.quantity),
            note: m.note.clone().unwrap_or_default(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Record a sale
fn cmd_sale_add(
    cfg_dir: &PathBuf,
    client_id: &str,
    price: f64,
    quantity: f64,
    unit: &str,
    date: Option<String>,
    down_payment: Option<f64>,
) -> Result<()> {
    let (config, mut store) = open_env(cfg_dir)?;

    if price <= 0.0 {
        return Err(AcopioError::NonPositiveAmount);
    }
    if quantity <= 0.0 {
        return Err(AcopioError::NonPositiveQuantity);
    }
    let unit: SaleUnit = unit
        .parse()
        .map_err(|s: String| AcopioError::InvalidUnit(s))?;
    let date = parse_date_or_today(date.as_deref())?;

    let client = store.find_client(client_id)?;
    let client_name = client.name.clone();

    // A balde is worth a fixed number of base units; the factor is frozen
    // into the total at creation time.
    let unit_factor = match unit {
        SaleUnit::Baldes => config.stock.balde_units,
        SaleUnit::Unidades => 1.0,
    };
    let total_amount = price * quantity * unit_factor;

    let id = store.next_sale_id();
    let mut sale = Sale {
        id: id.clone(),
        date,
        client_id: client_id.to_string(),
        client_name: client_name.clone(),
        price,
        quantity,
        unit,
        total_amount,
        payments: Vec::new(),
    };

    // Down payment is recorded with the sale's own date
    if let Some(amount) = down_payment {
        ledger::record_payment(&mut sale, amount, date)?;
    }

    let balance = sale.balance();
    store.sales.push(sale);
    store.save()?;

    println!("Recorded {id}");
    println!("  Client:  {client_name}");
    println!(
        "  Total:   {}",
        format_amount(total_amount, &config.currency.symbol)
    );
    if down_payment.is_some() {
        println!(
            "  Balance: {}",
            format_amount(balance, &config.currency.symbol)
        );
    }
    Ok(())
}

/// List sales with three-way status (PENDING / PARTIAL / SETTLED)
fn cmd_sale_list(cfg_dir: &PathBuf, client: Option<String>) -> Result<()> {
    let (config, store) = open_env(cfg_dir)?;

    if let Some(ref id) = client {
        ensure_known_client(&store, id)?;
    }

    let sales: Vec<_> = store
        .sales
        .iter()
        .rev()
        .filter(|s| client.as_deref().map_or(true, |id| s.client_id == id))
        .enumerate()
        .collect();

    if sales.is_empty() {
        println!("No sales recorded yet.");
        return Ok(());
    }

    // Derive status from payment records
    let rows: Vec<SaleRow> = sales
        .iter()
        .map(|(idx, sale)| SaleRow {
            index: idx + 1,
            id: sale.id.clone(),
            date: sale.date.to_string(),
            total: format_whole_money(sale.total_amount, &config.currency.symbol),
            status: sale.status().to_string(),
            client: sale.client_name.clone(),
        })
        .collect();

    // Financial summary uses actual payment amounts
    let shown_total: f64 = sales.iter().map(|(_, s)| s.total_amount).sum();
    let shown_paid: f64 = sales.iter().map(|(_, s)| s.paid_amount()).sum();
    let shown_outstanding: f64 = shown_total - shown_paid;

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let total_amount = format_whole_money(shown_total, &config.currency.symbol);
    let paid_amount = format_whole_money(shown_paid, &config.currency.symbol);
    let outstanding_amount = format_whole_money(shown_outstanding, &config.currency.symbol);
    let table = add_financial_footer(&table, &total_amount, &paid_amount, &outstanding_amount);

    println!("{table}");

    println!();
    println!("Total: {} sales", sales.len());
    println!("Use index number with payment/remove (e.g., 'acopio payment add 1 50')");

    Ok(())
}

/// Delete a sale (irreversible, no cascading effects)
fn cmd_sale_remove(cfg_dir: &PathBuf, sale_ref: &str) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    let sale_id = resolve_sale_id(&store, sale_ref)?;
    store.sales.retain(|s| s.id != sale_id);
    store.save()?;

    println!("Removed {sale_id}");
    Ok(())
}

/// Record a payment against a sale
fn cmd_payment_add(
    cfg_dir: &PathBuf,
    sale_ref: &str,
    amount: f64,
    date: Option<String>,
) -> Result<()> {
    let (config, mut store) = open_env(cfg_dir)?;

    let sale_id = resolve_sale_id(&store, sale_ref)?;
    let date = parse_date_or_today(date.as_deref())?;

    let sale = store
        .sales
        .iter_mut()
        .find(|s| s.id == sale_id)
        .ok_or_else(|| AcopioError::SaleNotFound(sale_id.clone()))?;

    ledger::record_payment(sale, amount, date)?;
    let new_balance = sale.balance();

    store.save()?;

    // Print confirmation
    if new_balance <= 0.001 {
        println!(
            "Recorded {} payment for {} (fully paid)",
            format_amount(amount, &config.currency.symbol),
            sale_id
        );
    } else {
        println!(
            "Recorded {} payment for {} ({} remaining)",
            format_amount(amount, &config.currency.symbol),
            sale_id,
            format_amount(new_balance, &config.currency.symbol)
        );
    }

    Ok(())
}

/// Show payment history for a sale
fn cmd_payment_list(cfg_dir: &PathBuf, sale_ref: &str) -> Result<()> {
    let (config, store) = open_env(cfg_dir)?;

    let sale_id = resolve_sale_id(&store, sale_ref)?;
    let sale = store
        .sales
        .iter()
        .find(|s| s.id == sale_id)
        .ok_or_else(|| AcopioError::SaleNotFound(sale_id.clone()))?;

    println!("Payments for {sale_id}");

    if sale.payments.is_empty() {
        println!("  No payments recorded.");
    } else {
        let rows: Vec<PaymentRow> = sale
            .payments
            .iter()
            .enumerate()
            .map(|(idx, p)| PaymentRow {
                index: idx + 1,
                date: p.date.to_string(),
                amount: format_amount(p.amount, &config.currency.symbol),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    println!(
        "Total paid: {} / {} (Status: {})",
        format_amount(sale.paid_amount(), &config.currency.symbol),
        format_amount(sale.total_amount, &config.currency.symbol),
        sale.status()
    );

    Ok(())
}

/// Show outstanding debt per client, or one client's open sales
fn cmd_debt_show(cfg_dir: &PathBuf, client: Option<String>) -> Result<()> {
    let (config, store) = open_env(cfg_dir)?;

    if let Some(client_id) = client {
        ensure_known_client(&store, &client_id)?;

        let open: Vec<_> = store
            .sales
            .iter()
            .filter(|s| s.client_id == client_id && !s.is_settled())
            .collect();

        if open.is_empty() {
            println!("Client '{client_id}' has no outstanding sales.");
            return Ok(());
        }

        let rows: Vec<OutstandingSaleRow> = open
            .iter()
            .map(|s| OutstandingSaleRow {
                id: s.id.clone(),
                date: s.date.to_string(),
                total: format_amount(s.total_amount, &config.currency.symbol),
                paid: format_amount(s.paid_amount(), &config.currency.symbol),
                balance: format_amount(s.balance(), &config.currency.symbol),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");

        let debt = client_debt(&store.sales, &client_id);
        println!();
        println!(
            "Total debt: {}",
            format_amount(debt, &config.currency.symbol)
        );
        return Ok(());
    }

    // All-clients summary, insertion order of first sale
    let mut rows: Vec<DebtRow> = Vec::new();
    for sale in &store.sales {
        if rows.iter().any(|r| r.client == sale.client_id) {
            continue;
        }
        let debt = client_debt(&store.sales, &sale.client_id);
        if debt <= 0.001 {
            continue;
        }
        let open_sales = store
            .sales
            .iter()
            .filter(|s| s.client_id == sale.client_id && !s.is_settled())
            .count();
        rows.push(DebtRow {
            client: sale.client_id.clone(),
            name: sale.client_name.clone(),
            open_sales,
            debt: format_amount(debt, &config.currency.symbol),
        });
    }

    if rows.is_empty() {
        println!("No outstanding debt.");
        return Ok(());
    }

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Apply a lump payment across a client's outstanding sales, oldest first
fn cmd_debt_pay(
    cfg_dir: &PathBuf,
    client_id: &str,
    amount: f64,
    date: Option<String>,
) -> Result<()> {
    let (config, mut store) = open_env(cfg_dir)?;

    ensure_known_client(&store, client_id)?;
    let date = parse_date_or_today(date.as_deref())?;

    let allocations = allocate_lump_payment(&mut store.sales, client_id, amount, date)?;
    store.save()?;

    println!(
        "Applied {} across {} sale(s):",
        format_amount(amount, &config.currency.symbol),
        allocations.len()
    );
    for allocation in &allocations {
        let settled = store
            .sales
            .iter()
            .find(|s| s.id == allocation.sale_id)
            .map(|s| s.is_settled())
            .unwrap_or(false);
        println!(
            "  {} {}{}",
            allocation.sale_id,
            format_amount(allocation.amount, &config.currency.symbol),
            if settled { " (settled)" } else { "" }
        );
    }

    let remaining = client_debt(&store.sales, client_id);
    println!(
        "Remaining debt: {}",
        format_amount(remaining, &config.currency.symbol)
    );

    Ok(())
}

/// Write off all outstanding balances up to a cutoff date
fn cmd_debt_cancel(cfg_dir: &PathBuf, client_id: &str, cutoff: &str) -> Result<()> {
    let (config, mut store) = open_env(cfg_dir)?;

    ensure_known_client(&store, client_id)?;
    let cutoff = parse_date(cutoff)?;

    let settled = cancel_account(&mut store.sales, client_id, cutoff);
    store.save()?;

    if settled == 0 {
        println!("Nothing to write off for '{client_id}' up to {cutoff}.");
    } else {
        let remaining = client_debt(&store.sales, client_id);
        println!("Wrote off {settled} sale(s) for '{client_id}' up to {cutoff}.");
        println!(
            "Remaining debt: {}",
            format_amount(remaining, &config.currency.symbol)
        );
    }

    Ok(())
}

/// Consolidated statement for a client, optionally as PDF
fn cmd_statement(
    cfg_dir: &PathBuf,
    client_id: &str,
    from: Option<String>,
    pdf: bool,
    open: bool,
) -> Result<()> {
    let (config, store) = open_env(cfg_dir)?;

    ensure_known_client(&store, client_id)?;
    let range_start = from.as_deref().map(parse_date).transpose()?;

    let rows = consolidated_ledger(&store.sales, client_id, range_start);
    if rows.is_empty() {
        println!("No transactions for client '{client_id}'.");
        return Ok(());
    }

    let blank_zero = |v: f64| {
        if v == 0.0 {
            String::new()
        } else {
            format_amount(v, &config.currency.symbol)
        }
    };

    let display: Vec<LedgerDisplayRow> = rows
        .iter()
        .map(|r| LedgerDisplayRow {
            date: r.date.to_string(),
            description: r.description.clone(),
            debit: blank_zero(r.debit),
            credit: blank_zero(r.credit),
            balance: format_amount(r.balance, &config.currency.symbol),
        })
        .collect();

    let table = Table::new(display).with(Style::rounded()).to_string();
    println!("{table}");

    let final_balance = rows.last().map(|r| r.balance).unwrap_or(0.0);
    println!();
    println!(
        "Balance due: {}",
        format_amount(final_balance, &config.currency.symbol)
    );

    if pdf {
        let client_sales = store.client_sales(client_id);
        let data = build_statement(
            config.business.clone(),
            store.clients.iter().find(|c| c.id == client_id),
            client_id,
            &client_sales,
            &rows,
            &config.currency.symbol,
            range_start,
        );

        let output_dir = resolve_output_dir(&config.pdf.output_dir, cfg_dir);
        std::fs::create_dir_all(&output_dir)?;

        let today_str = Local::now().format("%Y-%m-%d").to_string();
        let pdf_path = output_dir.join(format!("STATEMENT-{client_id}-{today_str}.pdf"));

        generate_statement_pdf(&data, &pdf_path)?;
        println!("Saved: {}", pdf_path.display());

        if open {
            open_path(&pdf_path)?;
        }
    }

    Ok(())
}

/// Weekly report of deliveries, production, sales and stock
fn cmd_report_week(
    cfg_dir: &PathBuf,
    date: Option<String>,
    pdf: bool,
    open: bool,
) -> Result<()> {
    let (config, store) = open_env(cfg_dir)?;

    let reference = parse_date_or_today(date.as_deref())?;
    let report = build_weekly_report(&store, reference);

    println!(
        "Week {} to {}",
        report.week_start, report.week_end
    );
    println!("{}", "-".repeat(50));

    if report.deliveries.is_empty() {
        println!("Deliveries:     none");
    } else {
        println!("Deliveries:");
        for total in &report.deliveries {
            println!(
                "  {} - {} deliveries, {} L",
                total.provider_name,
                total.deliveries,
                format_quantity(total.quantity)
            );
        }
        println!(
            "  Total milk received: {} L",
            format_quantity(report.milk_received)
        );
    }

    println!(
        "Production:     {} L -> {} units ({:.2} L/unit)",
        format_quantity(report.milk_used),
        format_quantity(report.product_out),
        report.transformation_index
    );
    println!(
        "Sales:          {} for {} ({} collected)",
        report.sales_count,
        format_amount(report.sales_gross, &config.currency.symbol),
        format_amount(report.sales_collected, &config.currency.symbol)
    );
    println!(
        "Milk stock:     +{} L / -{} L ({} L at week end)",
        format_quantity(report.stock_in),
        format_quantity(report.stock_out),
        format_quantity(report.stock_level)
    );

    if pdf {
        let data = WeeklyReportData {
            business: config.business.clone(),
            currency_symbol: config.currency.symbol.clone(),
            generated_date: Local::now().format("%B %d, %Y").to_string(),
            report,
        };

        let output_dir = resolve_output_dir(&config.pdf.output_dir, cfg_dir);
        std::fs::create_dir_all(&output_dir)?;

        let pdf_path = output_dir.join(format!("WEEK-{}.pdf", data.report.week_start));

        generate_weekly_pdf(&data, &pdf_path)?;
        println!();
        println!("Saved: {}", pdf_path.display());

        if open {
            open_path(&pdf_path)?;
        }
    }

    Ok(())
}

/// Export all data to a single JSON file
fn cmd_backup(cfg_dir: &PathBuf, file: &PathBuf) -> Result<()> {
    let (_, store) = open_env(cfg_dir)?;

    store.backup(file)?;

    println!("Backed up to {}", file.display());
    println!(
        "  {} clients, {} providers, {} sales, {} deliveries, {} production runs, {} stock movements",
        store.clients.len(),
        store.providers.len(),
        store.sales.len(),
        store.deliveries.len(),
        store.production.len(),
        store.stock.len()
    );
    Ok(())
}

/// Replace all data from a backup file
fn cmd_restore(cfg_dir: &PathBuf, file: &PathBuf) -> Result<()> {
    let (_, mut store) = open_env(cfg_dir)?;

    store.restore(file)?;

    println!("Restored from {}", file.display());
    println!(
        "  {} clients, {} providers, {} sales, {} deliveries, {} production runs, {} stock movements",
        store.clients.len(),
        store.providers.len(),
        store.sales.len(),
        store.deliveries.len(),
        store.production.len(),
        store.stock.len()
    );
    Ok(())
}
