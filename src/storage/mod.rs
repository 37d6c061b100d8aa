pub mod json_backend;
pub mod records;
pub mod sqlite_backend;

use std::sync::Arc;

use crate::{
    config::{Config, StorageKind},
    core::{errors::Result, time::Clock, utils::PathResolver},
    ledger::{Budget, Expense, ExpenseId, NewExpense, Period},
};

/// Persistence collaborator for expenses and budgets.
///
/// Batch reads are row-scoped: a row that cannot be decoded is logged and skipped rather than
/// failing the whole read.
pub trait ExpenseStore: Send {
    fn load_expenses(&self) -> Result<Vec<Expense>>;
    /// Persists a new expense and returns it with its store-assigned id.
    fn insert_expense(&self, expense: &NewExpense) -> Result<Expense>;
    fn update_expense(&self, expense: &Expense) -> Result<()>;
    fn delete_expense(&self, id: ExpenseId) -> Result<()>;

    fn load_budgets(&self) -> Result<Vec<Budget>>;

    fn budgets_for_period(&self, period: &Period) -> Result<Vec<Budget>> {
        Ok(self
            .load_budgets()?
            .into_iter()
            .filter(|budget| budget.period == *period)
            .collect())
    }

    /// Inserts or overwrites the row for `(category, period)`.
    fn upsert_budget(&self, budget: &Budget) -> Result<()>;
    /// Inserts the row unless one exists for `(category, period)`. Returns whether it was written.
    fn insert_budget_if_absent(&self, budget: &Budget) -> Result<bool>;

    /// Batch form of [`ExpenseStore::insert_budget_if_absent`], returning the rows written.
    /// Backends that can should apply the whole batch in one atomic write.
    fn insert_budgets_if_absent(&self, budgets: &[Budget]) -> Result<Vec<Budget>> {
        let mut written = Vec::new();
        for budget in budgets {
            if self.insert_budget_if_absent(budget)? {
                written.push(budget.clone());
            }
        }
        Ok(written)
    }
}

/// Opens the backend selected in `config` under its data directory.
pub fn open_store(config: &Config, clock: Arc<dyn Clock>) -> Result<Box<dyn ExpenseStore>> {
    let base = PathResolver::resolve_base(config.data_root.clone());
    let store: Box<dyn ExpenseStore> = match config.storage {
        StorageKind::Json => Box::new(json_backend::JsonStore::new(Some(base), clock)?),
        StorageKind::Sqlite => Box::new(sqlite_backend::SqliteStore::open(
            &PathResolver::database_file_in(&base),
            clock,
        )?),
    };
    Ok(store)
}

pub use json_backend::{JsonStore, BOOK_SCHEMA_VERSION};
pub use sqlite_backend::{SqliteStore, SQLITE_SCHEMA_VERSION};
