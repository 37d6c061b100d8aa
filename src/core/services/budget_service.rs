//! Keeps every category budgeted for the active period.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::errors::Result;
use crate::ledger::{Budget, ExpenseCategory, Period};
use crate::storage::ExpenseStore;

/// Stateless helpers for budget lookup, completion, and input parsing.
pub struct BudgetService;

impl BudgetService {
    /// Budgets stored for `period`, at most one per category, in category order.
    ///
    /// If the input holds duplicates for a category, the first one wins.
    pub fn budgets_for_period(period: &Period, budgets: &[Budget]) -> Vec<Budget> {
        ExpenseCategory::ALL
            .into_iter()
            .filter_map(|category| {
                budgets
                    .iter()
                    .find(|budget| budget.is_for(category, period))
                    .cloned()
            })
            .collect()
    }

    /// Zero-amount budgets for every category with no row for `period`.
    pub fn missing_defaults(period: &Period, budgets: &[Budget]) -> Vec<Budget> {
        let present: HashSet<ExpenseCategory> = budgets
            .iter()
            .filter(|budget| budget.period == *period)
            .map(|budget| budget.category)
            .collect();
        ExpenseCategory::ALL
            .into_iter()
            .filter(|category| !present.contains(category))
            .map(|category| Budget::zero(category, *period))
            .collect()
    }

    /// Exactly one budget per category for `period`, synthesizing zero rows where none exist.
    ///
    /// Does not touch storage; use [`BudgetService::reconcile`] to persist the defaults.
    pub fn complete_for_period(period: &Period, budgets: &[Budget]) -> Vec<Budget> {
        ExpenseCategory::ALL
            .into_iter()
            .map(|category| {
                budgets
                    .iter()
                    .find(|budget| budget.is_for(category, period))
                    .cloned()
                    .unwrap_or_else(|| Budget::zero(category, *period))
            })
            .collect()
    }

    /// Persists a zero budget for every category that has none for `period`.
    ///
    /// Existing rows are never overwritten, so running this repeatedly leaves storage unchanged
    /// after the first pass. The defaults go to the store as one batch. Returns the rows that
    /// were created.
    pub fn reconcile(store: &dyn ExpenseStore, period: &Period) -> Result<Vec<Budget>> {
        let existing = store.budgets_for_period(period)?;
        let missing = Self::missing_defaults(period, &existing);
        if missing.is_empty() {
            return Ok(Vec::new());
        }
        let created = store.insert_budgets_if_absent(&missing)?;
        if !created.is_empty() {
            debug!(
                "created {} default budget(s) for period {}",
                created.len(),
                period
            );
        }
        Ok(created)
    }

    /// Interprets free-form amount input. Anything that is not a finite, non-negative number
    /// becomes `0.0`.
    pub fn parse_amount_input(input: &str) -> f64 {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return 0.0;
        }
        match trimmed.parse::<f64>() {
            Ok(amount) if amount.is_finite() && amount >= 0.0 => amount,
            _ => {
                warn!("budget amount `{}` is not a valid amount; using 0", trimmed);
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn cycle() -> Period {
        Period::new(
            NaiveDate::from_ymd_opt(2024, 1, 13).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 12).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn completes_missing_categories_with_zero() {
        let budgets = vec![Budget::new(ExpenseCategory::Ntuc, 100.0, cycle())];
        let complete = BudgetService::complete_for_period(&cycle(), &budgets);
        assert_eq!(complete.len(), ExpenseCategory::ALL.len());
        assert_eq!(complete[0], budgets[0]);
        assert!(complete[1..].iter().all(|budget| budget.amount == 0.0));
        let categories: Vec<ExpenseCategory> =
            complete.iter().map(|budget| budget.category).collect();
        assert_eq!(categories, ExpenseCategory::ALL.to_vec());
    }

    #[test]
    fn completion_is_idempotent() {
        let budgets = vec![Budget::new(ExpenseCategory::Fuel, 40.0, cycle())];
        let once = BudgetService::complete_for_period(&cycle(), &budgets);
        let twice = BudgetService::complete_for_period(&cycle(), &once);
        assert_eq!(once, twice);
        assert!(BudgetService::missing_defaults(&cycle(), &once).is_empty());
    }

    #[test]
    fn other_periods_do_not_count_as_present() {
        let budgets = vec![Budget::new(
            ExpenseCategory::Meal,
            75.0,
            cycle().next_budget_cycle(),
        )];
        let missing = BudgetService::missing_defaults(&cycle(), &budgets);
        assert_eq!(missing.len(), ExpenseCategory::ALL.len());
    }

    #[test]
    fn amount_input_never_fails() {
        assert_eq!(BudgetService::parse_amount_input(""), 0.0);
        assert_eq!(BudgetService::parse_amount_input("   "), 0.0);
        assert_eq!(BudgetService::parse_amount_input("abc"), 0.0);
        assert_eq!(BudgetService::parse_amount_input("-5"), 0.0);
        assert_eq!(BudgetService::parse_amount_input("NaN"), 0.0);
        assert_eq!(BudgetService::parse_amount_input(" 250.5 "), 250.5);
    }
}
