mod statement;
mod weekly;

pub use statement::{build_statement, StatementData, StatementRow};
pub use weekly::{
    build_weekly_report, week_bounds, ProviderDeliveryTotal, WeeklyReport, WeeklyReportData,
};
