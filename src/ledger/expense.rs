use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ledger::category::ExpenseCategory;

/// Store-assigned expense identifier.
pub type ExpenseId = i64;

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    /// Opaque reference to an externally stored attachment, such as a receipt photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_uri: Option<String>,
}

/// An expense that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub receipt_uri: Option<String>,
}

impl NewExpense {
    pub fn new(
        category: ExpenseCategory,
        amount: f64,
        description: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            category,
            amount,
            description: description.into(),
            date,
            receipt_uri: None,
        }
    }

    pub fn with_receipt(mut self, uri: impl Into<String>) -> Self {
        self.receipt_uri = Some(uri.into());
        self
    }

    pub fn into_expense(self, id: ExpenseId) -> Expense {
        Expense {
            id,
            category: self.category,
            amount: self.amount,
            description: self.description,
            date: self.date,
            receipt_uri: self.receipt_uri,
        }
    }
}
