use serde::{Deserialize, Serialize};

use crate::ledger::{category::ExpenseCategory, period::Period};

/// A spending cap for one category over one period.
///
/// `(category, period)` is the natural key: there is at most one budget per category per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub category: ExpenseCategory,
    pub amount: f64,
    #[serde(rename = "period_key")]
    pub period: Period,
}

impl Budget {
    pub fn new(category: ExpenseCategory, amount: f64, period: Period) -> Self {
        Self {
            category,
            amount,
            period,
        }
    }

    /// Zero-amount placeholder used to complete a period's budget set.
    pub fn zero(category: ExpenseCategory, period: Period) -> Self {
        Self::new(category, 0.0, period)
    }

    pub fn is_for(&self, category: ExpenseCategory, period: &Period) -> bool {
        self.category == category && self.period == *period
    }
}
