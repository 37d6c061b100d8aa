//! Aggregates expenses and budgets into per-category spending summaries.

use std::collections::HashMap;

use crate::core::services::BudgetService;
use crate::ledger::{Budget, CategorySummary, Expense, ExpenseCategory, Period, PeriodSummary};

/// Stateless aggregation over expense and budget snapshots.
pub struct SummaryService;

impl SummaryService {
    /// Builds one [`CategorySummary`] per category, in [`ExpenseCategory::ALL`] order.
    ///
    /// Only expenses dated inside the period (both ends inclusive) are counted. Categories with no
    /// budget row for the period report a budget of zero.
    pub fn summarize(period: &Period, expenses: &[Expense], budgets: &[Budget]) -> PeriodSummary {
        let mut spent: HashMap<ExpenseCategory, f64> = HashMap::new();
        for expense in expenses.iter().filter(|expense| period.contains(expense.date)) {
            *spent.entry(expense.category).or_default() += expense.amount;
        }

        let budgeted: HashMap<ExpenseCategory, f64> =
            BudgetService::budgets_for_period(period, budgets)
                .into_iter()
                .map(|budget| (budget.category, budget.amount))
                .collect();

        let categories: Vec<CategorySummary> = ExpenseCategory::ALL
            .into_iter()
            .map(|category| {
                CategorySummary::from_parts(
                    category,
                    spent.get(&category).copied().unwrap_or(0.0),
                    budgeted.get(&category).copied().unwrap_or(0.0),
                )
            })
            .collect();

        PeriodSummary {
            period: *period,
            total_spent: categories.iter().map(|summary| summary.spent).sum(),
            total_budget: categories.iter().map(|summary| summary.budget).sum(),
            categories,
        }
    }

    /// Expenses dated inside the period, newest first.
    pub fn expenses_in_period(period: &Period, expenses: &[Expense]) -> Vec<Expense> {
        let mut selected: Vec<Expense> = expenses
            .iter()
            .filter(|expense| period.contains(expense.date))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        selected
    }

    /// Expenses of one category inside the period, newest first.
    pub fn expenses_in_category(
        period: &Period,
        category: ExpenseCategory,
        expenses: &[Expense],
    ) -> Vec<Expense> {
        let mut selected = Self::expenses_in_period(period, expenses);
        selected.retain(|expense| expense.category == category);
        selected
    }
}
