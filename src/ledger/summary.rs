//! Derived, read-only views of spending against budgets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ledger::{category::ExpenseCategory, period::Period};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Describes how spending compares with the budget.
pub enum BudgetStatus {
    /// No budget set and nothing spent.
    Unbudgeted,
    UnderBudget,
    OnTrack,
    OverBudget,
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BudgetStatus::Unbudgeted => "Unbudgeted",
            BudgetStatus::UnderBudget => "Under Budget",
            BudgetStatus::OnTrack => "On Track",
            BudgetStatus::OverBudget => "Over Budget",
        };
        f.write_str(label)
    }
}

/// Spending for a single category in a period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySummary {
    pub category: ExpenseCategory,
    pub spent: f64,
    pub budget: f64,
    /// `spent / budget` clamped to `[0, 1]`; zero when no budget is set.
    pub ratio: f64,
    /// `budget - spent`; negative when overspent.
    pub remaining: f64,
}

impl CategorySummary {
    pub fn from_parts(category: ExpenseCategory, spent: f64, budget: f64) -> Self {
        let ratio = if budget > 0.0 {
            (spent / budget).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            category,
            spent,
            budget,
            ratio,
            remaining: budget - spent,
        }
    }

    pub fn is_over_budget(&self) -> bool {
        self.remaining < 0.0
    }

    pub fn status(&self) -> BudgetStatus {
        if self.budget.abs() < f64::EPSILON && self.spent.abs() < f64::EPSILON {
            BudgetStatus::Unbudgeted
        } else if self.remaining.abs() < f64::EPSILON {
            BudgetStatus::OnTrack
        } else if self.remaining > 0.0 {
            BudgetStatus::UnderBudget
        } else {
            BudgetStatus::OverBudget
        }
    }
}

/// Per-category spending for a period plus the totals across categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodSummary {
    pub period: Period,
    pub total_spent: f64,
    pub total_budget: f64,
    pub categories: Vec<CategorySummary>,
}

impl PeriodSummary {
    pub fn total_remaining(&self) -> f64 {
        self.total_budget - self.total_spent
    }

    pub fn category(&self, category: ExpenseCategory) -> Option<&CategorySummary> {
        self.categories
            .iter()
            .find(|summary| summary.category == category)
    }
}
