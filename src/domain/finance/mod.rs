//! Finance domain - views derived from upstream data

mod summary;

pub use summary::{
    category_color, monthly_trends, summarize, CategorySummary, FinancialSummary, TrendPoint,
    UNCATEGORIZED,
};
