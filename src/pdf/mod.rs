mod typst;

pub use typst::{generate_statement_pdf, generate_weekly_pdf};
