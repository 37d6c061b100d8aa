//! Row shapes shared by the storage backends and their lenient decoding.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::time::Clock;
use crate::ledger::{
    Budget, Expense, ExpenseCategory, ExpenseId, Period, PeriodError, UnknownCategory,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a stored row could not be turned into a domain record.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("amount {0} is not a finite number")]
    NonFiniteAmount(f64),
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategory),
    #[error(transparent)]
    Period(#[from] PeriodError),
}

/// An `expenses` row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: ExpenseId,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_uri: Option<String>,
}

impl ExpenseRow {
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            id: expense.id,
            category: expense.category.as_str().to_string(),
            amount: expense.amount,
            description: expense.description.clone(),
            date: format_date(expense.date),
            receipt_uri: expense.receipt_uri.clone(),
        }
    }

    /// Unknown categories fall back to the catch-all and unreadable dates to today.
    pub fn into_expense(self, clock: &dyn Clock) -> Result<Expense, RowError> {
        if !self.amount.is_finite() {
            return Err(RowError::NonFiniteAmount(self.amount));
        }
        Ok(Expense {
            id: self.id,
            category: ExpenseCategory::from_stored(&self.category),
            amount: self.amount,
            description: self.description,
            date: parse_date_or_today(&self.date, clock),
            receipt_uri: self.receipt_uri,
        })
    }
}

/// A `budgets` row as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    pub category: String,
    pub amount: f64,
    pub period_key: String,
}

impl BudgetRow {
    pub fn from_budget(budget: &Budget) -> Self {
        Self {
            category: budget.category.as_str().to_string(),
            amount: budget.amount,
            period_key: budget.period.key(),
        }
    }

    pub fn into_budget(self) -> Result<Budget, RowError> {
        if !self.amount.is_finite() {
            return Err(RowError::NonFiniteAmount(self.amount));
        }
        let category: ExpenseCategory = self.category.parse()?;
        let period = Period::parse_key(&self.period_key)?;
        Ok(Budget::new(category, self.amount, period))
    }

    pub fn matches(&self, category: ExpenseCategory, period: &Period) -> bool {
        self.category.parse::<ExpenseCategory>().ok() == Some(category)
            && Period::parse_key(&self.period_key).ok().as_ref() == Some(period)
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date_or_today(raw: &str, clock: &dyn Clock) -> NaiveDate {
    match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
        Ok(date) => date,
        Err(err) => {
            let today = clock.today();
            warn!("stored date `{}` is unreadable ({}); using {}", raw, err, today);
            today
        }
    }
}

/// Maps a budget key from the old schema onto a canonical period key.
///
/// Accepts either a full period key or a `yyyy-MM` month key, which becomes that calendar
/// month's period.
pub fn legacy_period_key(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(period) = Period::parse_loose_key(raw) {
        return Some(period.key());
    }
    let (year, month) = raw.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    Period::for_calendar_month(year, month)
        .ok()
        .map(|period| period.key())
}
