//! Derived financial views computed from raw upstream payloads

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const CATEGORY_COLORS: [&str; 7] = [
    "#8884d8", "#82ca9d", "#ffc658", "#ff7300", "#8dd1e1", "#387908", "#ff6b6b",
];

const TOP_CATEGORIES: usize = 5;

/// Label for transactions whose category is unknown
pub const UNCATEGORIZED: &str = "Others";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_balance: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    pub net_income: f64,
    /// Expenses as a percentage of income, capped at 100
    pub budget_used: f64,
    pub categories_summary: Vec<CategorySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// `YYYY-MM`
    pub month: String,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

/// Builds the financial summary from the accounts, transactions and categories payloads
pub fn summarize(accounts: &Value, transactions: &Value, categories: &Value) -> FinancialSummary {
    let total_balance: f64 = items(accounts, "accounts")
        .iter()
        .map(|account| money(account, "balance"))
        .sum();

    let category_names: BTreeMap<i64, String> = items(categories, "categories")
        .iter()
        .filter_map(|category| {
            let id = category.get("id")?.as_i64()?;
            let name = category.get("name")?.as_str()?.to_string();
            Some((id, name))
        })
        .collect();

    let mut income = 0.0;
    let mut expenses = 0.0;
    let mut category_totals: BTreeMap<String, f64> = BTreeMap::new();

    for transaction in items(transactions, "transactions") {
        let amount = money(transaction, "amount");

        if amount > 0.0 {
            income += amount;
        } else {
            expenses += amount.abs();
        }

        let Some(category_id) = transaction.get("category_id").and_then(Value::as_i64) else {
            continue;
        };

        if amount != 0.0 {
            let name = category_names
                .get(&category_id)
                .cloned()
                .unwrap_or_else(|| UNCATEGORIZED.to_string());
            *category_totals.entry(name).or_insert(0.0) += amount.abs();
        }
    }

    let mut ranked: Vec<(String, f64)> = category_totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let categories_summary = ranked
        .into_iter()
        .take(TOP_CATEGORIES)
        .enumerate()
        .map(|(i, (name, value))| CategorySummary {
            name,
            value,
            color: category_color(i).to_string(),
        })
        .collect();

    FinancialSummary {
        total_balance,
        monthly_income: income,
        monthly_expenses: expenses,
        net_income: income - expenses,
        budget_used: (expenses / income.max(1.0) * 100.0).min(100.0),
        categories_summary,
    }
}

/// Groups transactions by calendar month, oldest first
///
/// Transactions without a parseable `date` are skipped.
pub fn monthly_trends(transactions: &Value) -> Vec<TrendPoint> {
    let mut months: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for transaction in items(transactions, "transactions") {
        let Some(month) = transaction
            .get("date")
            .and_then(Value::as_str)
            .and_then(month_of)
        else {
            tracing::debug!("Skipping transaction without a valid date");
            continue;
        };

        let amount = money(transaction, "amount");
        let totals = months.entry(month).or_insert((0.0, 0.0));

        if amount > 0.0 {
            totals.0 += amount;
        } else {
            totals.1 += amount.abs();
        }
    }

    months
        .into_iter()
        .map(|(month, (income, expenses))| TrendPoint {
            month,
            income,
            expenses,
            balance: income - expenses,
        })
        .collect()
}

pub fn category_color(index: usize) -> &'static str {
    CATEGORY_COLORS[index % CATEGORY_COLORS.len()]
}

/// Accepts either a bare array or an object wrapping the array under `key`
fn items<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    match payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Reads a monetary field given either in units (`field`) or cents (`field_cents`)
fn money(item: &Value, field: &str) -> f64 {
    if let Some(value) = item.get(field).and_then(number) {
        return value;
    }

    item.get(format!("{}_cents", field))
        .and_then(number)
        .map(|cents| cents / 100.0)
        .unwrap_or(0.0)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn month_of(date: &str) -> Option<String> {
    let day = date.get(..10)?;
    let parsed = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some(parsed.format("%Y-%m").to_string())
}
