use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::warn;

use crate::{
    core::{
        errors::{Result, TrackerError},
        time::Clock,
        utils::{ensure_dir, write_atomic, PathResolver},
    },
    ledger::{Budget, Expense, ExpenseId, NewExpense},
};

use super::{
    records::{BudgetRow, ExpenseRow},
    ExpenseStore,
};

pub const BOOK_SCHEMA_VERSION: u32 = 1;

/// On-disk document. Rows are kept as raw JSON so one corrupt entry never blocks the rest,
/// and survives rewrites untouched.
#[derive(Debug, Serialize, Deserialize)]
struct BookFile {
    schema_version: u32,
    #[serde(default = "first_id")]
    next_id: ExpenseId,
    #[serde(default)]
    expenses: Vec<Value>,
    #[serde(default)]
    budgets: Vec<Value>,
}

impl Default for BookFile {
    fn default() -> Self {
        Self {
            schema_version: BOOK_SCHEMA_VERSION,
            next_id: first_id(),
            expenses: Vec::new(),
            budgets: Vec::new(),
        }
    }
}

fn first_id() -> ExpenseId {
    1
}

/// Stores the whole expense book in a single JSON document.
pub struct JsonStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl JsonStore {
    pub fn new(root: Option<PathBuf>, clock: Arc<dyn Clock>) -> Result<Self> {
        let base = PathResolver::resolve_base(root);
        ensure_dir(&base)?;
        Ok(Self::at_path(PathResolver::book_file_in(&base), clock))
    }

    pub fn at_path(path: PathBuf, clock: Arc<dyn Clock>) -> Self {
        Self { path, clock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_book(&self) -> Result<BookFile> {
        if !self.path.exists() {
            return Ok(BookFile::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let book: BookFile = serde_json::from_str(&data)?;
        if book.schema_version > BOOK_SCHEMA_VERSION {
            return Err(TrackerError::StorageError(format!(
                "expense book `{}` is from a newer schema version ({})",
                self.path.display(),
                book.schema_version
            )));
        }
        Ok(book)
    }

    fn write_book(&self, book: &BookFile) -> Result<()> {
        let json = serde_json::to_string_pretty(book)?;
        write_atomic(&self.path, &json)?;
        Ok(())
    }
}

fn row_id(value: &Value) -> Option<ExpenseId> {
    value.get("id").and_then(Value::as_i64)
}

fn budget_row(value: &Value) -> Option<BudgetRow> {
    serde_json::from_value(value.clone()).ok()
}

impl ExpenseStore for JsonStore {
    fn load_expenses(&self) -> Result<Vec<Expense>> {
        let book = self.read_book()?;
        let mut expenses = Vec::with_capacity(book.expenses.len());
        for (index, value) in book.expenses.into_iter().enumerate() {
            let decoded = serde_json::from_value::<ExpenseRow>(value)
                .map_err(|err| err.to_string())
                .and_then(|row| {
                    row.into_expense(self.clock.as_ref())
                        .map_err(|err| err.to_string())
                });
            match decoded {
                Ok(expense) => expenses.push(expense),
                Err(err) => warn!("skipping expense row {}: {}", index, err),
            }
        }
        expenses.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(expenses)
    }

    fn insert_expense(&self, expense: &NewExpense) -> Result<Expense> {
        let mut book = self.read_book()?;
        let max_existing = book.expenses.iter().filter_map(row_id).max().unwrap_or(0);
        let id = book.next_id.max(max_existing + 1);
        let stored = expense.clone().into_expense(id);
        book.expenses
            .push(serde_json::to_value(ExpenseRow::from_expense(&stored))?);
        book.next_id = id + 1;
        self.write_book(&book)?;
        Ok(stored)
    }

    fn update_expense(&self, expense: &Expense) -> Result<()> {
        let mut book = self.read_book()?;
        let slot = book
            .expenses
            .iter_mut()
            .find(|value| row_id(value) == Some(expense.id))
            .ok_or(TrackerError::ExpenseNotFound(expense.id))?;
        *slot = serde_json::to_value(ExpenseRow::from_expense(expense))?;
        self.write_book(&book)
    }

    fn delete_expense(&self, id: ExpenseId) -> Result<()> {
        let mut book = self.read_book()?;
        let before = book.expenses.len();
        book.expenses.retain(|value| row_id(value) != Some(id));
        if book.expenses.len() == before {
            return Err(TrackerError::ExpenseNotFound(id));
        }
        self.write_book(&book)
    }

    fn load_budgets(&self) -> Result<Vec<Budget>> {
        let book = self.read_book()?;
        let mut budgets = Vec::with_capacity(book.budgets.len());
        for (index, value) in book.budgets.into_iter().enumerate() {
            let decoded = serde_json::from_value::<BudgetRow>(value)
                .map_err(|err| err.to_string())
                .and_then(|row| row.into_budget().map_err(|err| err.to_string()));
            match decoded {
                Ok(budget) => budgets.push(budget),
                Err(err) => warn!("skipping budget row {}: {}", index, err),
            }
        }
        Ok(budgets)
    }

    fn upsert_budget(&self, budget: &Budget) -> Result<()> {
        let mut book = self.read_book()?;
        let value = serde_json::to_value(BudgetRow::from_budget(budget))?;
        let existing = book.budgets.iter_mut().find(|candidate| {
            budget_row(candidate)
                .map(|row| row.matches(budget.category, &budget.period))
                .unwrap_or(false)
        });
        match existing {
            Some(slot) => *slot = value,
            None => book.budgets.push(value),
        }
        self.write_book(&book)
    }

    fn insert_budget_if_absent(&self, budget: &Budget) -> Result<bool> {
        let written = self.insert_budgets_if_absent(std::slice::from_ref(budget))?;
        Ok(!written.is_empty())
    }

    fn insert_budgets_if_absent(&self, budgets: &[Budget]) -> Result<Vec<Budget>> {
        let mut book = self.read_book()?;
        let mut written: Vec<Budget> = Vec::new();
        for budget in budgets {
            let stored = book.budgets.iter().any(|candidate| {
                budget_row(candidate)
                    .map(|row| row.matches(budget.category, &budget.period))
                    .unwrap_or(false)
            });
            let queued = written
                .iter()
                .any(|pending| pending.is_for(budget.category, &budget.period));
            if !stored && !queued {
                written.push(budget.clone());
            }
        }
        if written.is_empty() {
            return Ok(written);
        }
        for budget in &written {
            book.budgets
                .push(serde_json::to_value(BudgetRow::from_budget(budget))?);
        }
        self.write_book(&book)?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use crate::ledger::{ExpenseCategory, Period};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_with_temp_dir() -> (JsonStore, TempDir) {
        let temp = tempfile::tempdir().expect("temp dir");
        let clock = Arc::new(FixedClock::on(date(2024, 3, 1)));
        let store = JsonStore::new(Some(temp.path().to_path_buf()), clock).expect("json store");
        (store, temp)
    }

    #[test]
    fn missing_file_reads_as_empty_book() {
        let (store, _dir) = store_with_temp_dir();
        assert!(store.load_expenses().unwrap().is_empty());
        assert!(store.load_budgets().unwrap().is_empty());
    }

    #[test]
    fn ids_keep_increasing_after_deletes() {
        let (store, _dir) = store_with_temp_dir();
        let first = store
            .insert_expense(&NewExpense::new(ExpenseCategory::Meal, 5.0, "a", date(2024, 1, 20)))
            .unwrap();
        store.delete_expense(first.id).unwrap();
        let second = store
            .insert_expense(&NewExpense::new(ExpenseCategory::Meal, 6.0, "b", date(2024, 1, 21)))
            .unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn corrupt_rows_are_skipped_and_preserved() {
        let (store, _dir) = store_with_temp_dir();
        let raw = serde_json::json!({
            "schema_version": 1,
            "next_id": 3,
            "expenses": [
                {"id": 1, "category": "MEAL", "amount": 4.5, "description": "kopi", "date": "2024-01-20"},
                {"id": 2, "category": "FUEL", "amount": "lots", "date": "2024-01-21"}
            ],
            "budgets": [
                {"category": "MEAL", "amount": 100.0, "period_key": "2024-01-13,2024-02-12"},
                {"category": "MEAL", "amount": 100.0, "period_key": "not a period"}
            ]
        });
        fs::write(store.path(), raw.to_string()).unwrap();

        let expenses = store.load_expenses().unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].description, "kopi");
        assert_eq!(store.load_budgets().unwrap().len(), 1);

        let period = Period::new(date(2024, 1, 13), date(2024, 2, 12)).unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Fuel, 50.0, period))
            .unwrap();
        let book = store.read_book().unwrap();
        assert_eq!(book.expenses.len(), 2);
        assert_eq!(book.budgets.len(), 3);
    }

    #[test]
    fn budget_batch_is_written_once_and_skips_present_rows() {
        let (store, _dir) = store_with_temp_dir();
        let period = Period::new(date(2024, 1, 13), date(2024, 2, 12)).unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Ntuc, 100.0, period))
            .unwrap();

        let batch = vec![
            Budget::zero(ExpenseCategory::Ntuc, period),
            Budget::zero(ExpenseCategory::Meal, period),
            Budget::zero(ExpenseCategory::Meal, period),
            Budget::zero(ExpenseCategory::Fuel, period),
        ];
        let written = store.insert_budgets_if_absent(&batch).unwrap();
        assert_eq!(
            written,
            vec![
                Budget::zero(ExpenseCategory::Meal, period),
                Budget::zero(ExpenseCategory::Fuel, period),
            ]
        );

        let budgets = store.budgets_for_period(&period).unwrap();
        assert_eq!(budgets.len(), 3);
        let ntuc = budgets
            .iter()
            .find(|budget| budget.category == ExpenseCategory::Ntuc)
            .unwrap();
        assert_eq!(ntuc.amount, 100.0);
        assert!(store.insert_budgets_if_absent(&batch).unwrap().is_empty());
    }

    #[test]
    fn failed_batch_leaves_book_unchanged() {
        let (store, _dir) = store_with_temp_dir();
        let period = Period::new(date(2024, 1, 13), date(2024, 2, 12)).unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Ntuc, 100.0, period))
            .unwrap();
        fs::create_dir_all(crate::core::utils::tmp_path(store.path())).unwrap();

        let batch: Vec<Budget> = ExpenseCategory::ALL
            .into_iter()
            .map(|category| Budget::zero(category, period))
            .collect();
        assert!(store.insert_budgets_if_absent(&batch).is_err());
        assert_eq!(store.load_budgets().unwrap().len(), 1);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let (store, _dir) = store_with_temp_dir();
        fs::write(
            store.path(),
            r#"{"schema_version": 99, "next_id": 1, "expenses": [], "budgets": []}"#,
        )
        .unwrap();
        assert!(matches!(
            store.load_expenses(),
            Err(TrackerError::StorageError(_))
        ));
    }
}
