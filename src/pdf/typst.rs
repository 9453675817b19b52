use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::error::{AcopioError, Result};
use crate::report::{StatementData, WeeklyReportData};

/// Embedded Typst template for the client statement
/// Uses a placeholder that gets replaced with the actual JSON file path
const STATEMENT_TEMPLATE: &str = r##"// Client Statement Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "us-letter",
  margin: (top: 1in, bottom: 1in, left: 1in, right: 1in),
)

#set text(font: "Helvetica", size: 10pt)

#let fmt-int(digits) = {
  let len = digits.len()
  let out = ""
  for (i, digit) in digits.clusters().enumerate() {
    if i > 0 and calc.rem(len - i, 3) == 0 {
      out += ","
    }
    out += digit
  }
  out
}

#let fmt-currency(amount) = {
  let parts = str(calc.round(amount, digits: 2)).split(".")
  let whole = fmt-int(parts.at(0))
  let frac = if parts.len() > 1 { parts.at(1) } else { "00" }
  let frac2 = if frac.len() == 1 { frac + "0" } else { frac }
  data.currency_symbol + whole + "." + frac2
}

#let fmt-cell(amount) = {
  if amount == 0 { "" } else { fmt-currency(amount) }
}

// Header with business info and statement title
#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 18pt, weight: "bold")[#data.business.name]
    #if data.business.owner != none [
      #v(0.3em)
      #data.business.owner
    ]
    #if data.business.phone != none [
      \ #data.business.phone
    ]
  ],
  [
    #text(size: 24pt, weight: "bold")[ESTADO DE CUENTA]
    #v(0.5em)
    #text(size: 10pt, fill: gray)[Generated #data.generated_date]
  ]
)

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

// Client info block
#grid(
  columns: (1fr, 1fr),
  [
    #text(weight: "bold", size: 11pt)[Client:]
    #v(0.3em)
    #text(weight: "bold")[#data.client_name]
    #if data.client_address != none [
      \ #data.client_address
    ]
    #if data.client_phone != none [
      \ #data.client_phone
    ]
  ],
  [
    #if data.range_from != none [
      #text(weight: "bold", size: 11pt)[From:]
      #v(0.3em)
      #data.range_from
    ]
  ]
)

#v(1.5em)

// Ledger table
#table(
  columns: (auto, 1fr, auto, auto, auto),
  align: (left, left, right, right, right),
  stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
  inset: 8pt,
  fill: (x, y) => if y == 0 { luma(240) } else { none },

  // Header
  [*Date*], [*Description*], [*Debit*], [*Credit*], [*Balance*],

  // Rows
  ..data.rows.map(row => (
    row.date,
    row.description,
    [#fmt-cell(row.debit)],
    [#fmt-cell(row.credit)],
    [#fmt-currency(row.balance)],
  )).flatten()
)

#v(1.5em)

// Financial summary (right-aligned)
#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 6pt,

    [Charges:], [#fmt-currency(data.total_debit)],
    [Payments:], [#fmt-currency(data.total_credit)],

    table.hline(stroke: 1pt),
    [*Balance due:*], [*#fmt-currency(data.final_balance)*],
  )
]
"##;

/// Embedded Typst template for the weekly report
const WEEKLY_TEMPLATE: &str = r##"// Weekly Report Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "us-letter",
  margin: (top: 1in, bottom: 1in, left: 1in, right: 1in),
)

#set text(font: "Helvetica", size: 10pt)

#let fmt-int(digits) = {
  let len = digits.len()
  let out = ""
  for (i, digit) in digits.clusters().enumerate() {
    if i > 0 and calc.rem(len - i, 3) == 0 {
      out += ","
    }
    out += digit
  }
  out
}

#let fmt-currency(amount) = {
  let parts = str(calc.round(amount, digits: 2)).split(".")
  let whole = fmt-int(parts.at(0))
  let frac = if parts.len() > 1 { parts.at(1) } else { "00" }
  let frac2 = if frac.len() == 1 { frac + "0" } else { frac }
  data.currency_symbol + whole + "." + frac2
}

#let fmt-qty(amount) = {
  str(calc.round(amount, digits: 1))
}

// Header with business info and report title
#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 18pt, weight: "bold")[#data.business.name]
    #if data.business.owner != none [
      #v(0.3em)
      #data.business.owner
    ]
  ],
  [
    #text(size: 24pt, weight: "bold")[REPORTE SEMANAL]
    #v(0.5em)
    #text(size: 10pt)[#data.report.week_start to #data.report.week_end]
    #v(0.3em)
    #text(size: 10pt, fill: gray)[Generated #data.generated_date]
  ]
)

#v(1em)
#line(length: 100%, stroke: 0.5pt + gray)
#v(1em)

// Deliveries per provider
#text(weight: "bold", size: 11pt)[Deliveries]
#v(0.5em)
#if data.report.deliveries.len() == 0 [
  #text(fill: gray)[No deliveries this week.]
] else [
  #table(
    columns: (1fr, auto, auto),
    align: (left, right, right),
    stroke: (x, y) => if y == 0 { (bottom: 1pt + black) } else if y > 0 { (bottom: 0.5pt + gray) },
    inset: 8pt,
    fill: (x, y) => if y == 0 { luma(240) } else { none },

    [*Provider*], [*Deliveries*], [*Liters*],

    ..data.report.deliveries.map(row => (
      row.provider_name,
      str(row.deliveries),
      [#fmt-qty(row.quantity)],
    )).flatten(),

    table.hline(stroke: 1pt),
    [*Total*], [], [*#fmt-qty(data.report.milk_received)*],
  )
]

#v(1.5em)

// Production summary
#text(weight: "bold", size: 11pt)[Production]
#v(0.5em)
#table(
  columns: (auto, auto),
  stroke: none,
  inset: 4pt,
  [Milk used:], [#fmt-qty(data.report.milk_used) L],
  [Product out:], [#fmt-qty(data.report.product_out)],
  [Transformation index:], [#fmt-qty(data.report.transformation_index) L/unit],
)

#v(1.5em)

// Sales summary
#text(weight: "bold", size: 11pt)[Sales]
#v(0.5em)
#table(
  columns: (auto, auto),
  stroke: none,
  inset: 4pt,
  [Sales:], [#str(data.report.sales_count)],
  [Gross:], [#fmt-currency(data.report.sales_gross)],
  [Collected:], [#fmt-currency(data.report.sales_collected)],
)

#v(1.5em)

// Stock summary
#text(weight: "bold", size: 11pt)[Whole-milk stock]
#v(0.5em)
#table(
  columns: (auto, auto),
  stroke: none,
  inset: 4pt,
  [In:], [#fmt-qty(data.report.stock_in) L],
  [Out:], [#fmt-qty(data.report.stock_out) L],
  [Level at week end:], [#fmt-qty(data.report.stock_level) L],
)
"##;

/// Compile an embedded template against serialized data using the Typst CLI.
fn compile_template<T: Serialize>(
    template: &str,
    template_file: &str,
    data_file: &str,
    data: &T,
    output_path: &Path,
) -> Result<()> {
    // Check if typst is available
    let typst_check = Command::new("typst").arg("--version").output();

    if typst_check.is_err() {
        return Err(AcopioError::TypstNotFound);
    }

    // Create temp directory for template
    let temp_dir = std::env::temp_dir().join("acopio-cli");
    std::fs::create_dir_all(&temp_dir)?;

    // Serialize data to JSON
    let json_data =
        serde_json::to_string(data).map_err(|e| AcopioError::PdfGeneration(e.to_string()))?;

    // Write JSON to temp file
    let json_path = temp_dir.join(data_file);
    std::fs::write(&json_path, &json_data)?;

    // Write template with relative JSON path (data file is in same directory)
    let template_content = template.replace("DATA_JSON_PATH", data_file);
    let template_path = temp_dir.join(template_file);
    std::fs::write(&template_path, &template_content)?;

    // Run typst compile with root set to temp directory
    let output = Command::new("typst")
        .args([
            "compile",
            "--root",
            temp_dir.to_str().unwrap(),
            template_path.to_str().unwrap(),
            output_path.to_str().unwrap(),
        ])
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AcopioError::PdfGeneration(stderr.to_string()));
    }

    // Clean up temp files
    let _ = std::fs::remove_file(&template_path);
    let _ = std::fs::remove_file(&json_path);

    Ok(())
}

/// Generate a client statement PDF using Typst CLI
pub fn generate_statement_pdf(data: &StatementData, output_path: &PathBuf) -> Result<()> {
    compile_template(
        STATEMENT_TEMPLATE,
        "statement.typ",
        "statement_data.json",
        data,
        output_path,
    )
}

/// Generate a weekly report PDF using Typst CLI
pub fn generate_weekly_pdf(data: &WeeklyReportData, output_path: &PathBuf) -> Result<()> {
    compile_template(
        WEEKLY_TEMPLATE,
        "weekly.typ",
        "weekly_data.json",
        data,
        output_path,
    )
}
