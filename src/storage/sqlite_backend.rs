//! SQLite backend using the `expenses` / `budgets` table layout.
//!
//! Databases written by older releases kept budget keys in two columns (`month_year` and
//! `date_range`); those are folded into the single `period_key` column when the database is
//! opened.

use std::{path::Path, sync::Arc};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{info, warn};

use crate::{
    core::{
        errors::{Result, TrackerError},
        time::Clock,
        utils::ensure_dir,
    },
    ledger::{Budget, Expense, ExpenseCategory, ExpenseId, NewExpense, Period},
};

use super::{
    records::{format_date, legacy_period_key, BudgetRow, ExpenseRow},
    ExpenseStore,
};

/// Value written to `PRAGMA user_version` once the schema is current.
pub const SQLITE_SCHEMA_VERSION: i32 = 2;

const CREATE_EXPENSES: &str = "
    CREATE TABLE IF NOT EXISTS expenses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category TEXT NOT NULL,
        amount REAL NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL,
        receipt_uri TEXT
    );";

const CREATE_BUDGETS: &str = "
    CREATE TABLE IF NOT EXISTS budgets (
        category TEXT NOT NULL,
        amount REAL NOT NULL,
        period_key TEXT NOT NULL,
        PRIMARY KEY (category, period_key)
    );";

const SELECT_EXPENSES: &str = "
    SELECT id, category, amount, description, date, receipt_uri
    FROM expenses
    ORDER BY date DESC, id DESC";

pub struct SqliteStore {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        Self::from_connection(Connection::open(path)?, clock)
    }

    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, clock)
    }

    fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self { conn, clock })
    }

    fn query_budgets(&self, sql: &str, key: Option<&str>) -> Result<Vec<Budget>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match key {
            Some(key) => stmt.query_map([key], budget_row)?.collect::<Vec<_>>(),
            None => stmt.query_map([], budget_row)?.collect::<Vec<_>>(),
        };
        let mut budgets = Vec::with_capacity(rows.len());
        for row in rows {
            match row.map_err(TrackerError::from).and_then(|row| {
                row.into_budget()
                    .map_err(|err| TrackerError::StorageError(err.to_string()))
            }) {
                Ok(budget) => budgets.push(budget),
                Err(err) => warn!("skipping budget row: {}", err),
            }
        }
        Ok(budgets)
    }
}

fn expense_row(row: &Row<'_>) -> rusqlite::Result<ExpenseRow> {
    Ok(ExpenseRow {
        id: row.get(0)?,
        category: row.get(1)?,
        amount: row.get(2)?,
        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        date: row.get(4)?,
        receipt_uri: row.get(5)?,
    })
}

fn budget_row(row: &Row<'_>) -> rusqlite::Result<BudgetRow> {
    Ok(BudgetRow {
        category: row.get(0)?,
        amount: row.get(1)?,
        period_key: row.get(2)?,
    })
}

fn migrate(conn: &Connection) -> Result<()> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version > SQLITE_SCHEMA_VERSION {
        return Err(TrackerError::StorageError(format!(
            "database schema version {} is newer than supported ({})",
            version, SQLITE_SCHEMA_VERSION
        )));
    }
    let tx = conn.unchecked_transaction()?;
    let columns = budget_columns(&tx)?;
    let has = |name: &str| columns.iter().any(|column| column == name);
    if !has("period_key") && (has("month_year") || has("date_range")) {
        migrate_legacy_budgets(&tx, has("month_year"), has("date_range"))?;
    }
    tx.execute_batch(CREATE_EXPENSES)?;
    tx.execute_batch(CREATE_BUDGETS)?;
    tx.pragma_update(None, "user_version", SQLITE_SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

fn budget_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(budgets)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn migrate_legacy_budgets(conn: &Connection, month_year: bool, date_range: bool) -> Result<()> {
    let key_expr = match (date_range, month_year) {
        (true, true) => "COALESCE(NULLIF(date_range, ''), month_year)",
        (true, false) => "date_range",
        _ => "month_year",
    };
    conn.execute_batch("ALTER TABLE budgets RENAME TO budgets_legacy;")?;
    conn.execute_batch(CREATE_BUDGETS)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT category, amount, {key_expr} FROM budgets_legacy"
    ))?;
    let legacy: Vec<rusqlite::Result<(String, f64, Option<String>)>> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect();
    drop(stmt);

    let mut migrated = 0usize;
    for row in legacy {
        let (category, amount, raw_key) = match row {
            Ok(values) => values,
            Err(err) => {
                warn!("skipping legacy budget row: {}", err);
                continue;
            }
        };
        let Some(period_key) = raw_key.as_deref().and_then(legacy_period_key) else {
            warn!(
                "skipping legacy budget for `{}`: unusable key {:?}",
                category, raw_key
            );
            continue;
        };
        let Ok(category) = category.parse::<ExpenseCategory>() else {
            warn!("skipping legacy budget with unknown category `{}`", category);
            continue;
        };
        migrated += conn.execute(
            "INSERT OR IGNORE INTO budgets (category, amount, period_key) VALUES (?1, ?2, ?3)",
            params![category.as_str(), amount, period_key],
        )?;
    }
    conn.execute_batch("DROP TABLE budgets_legacy;")?;
    info!("migrated {} legacy budget row(s) to period keys", migrated);
    Ok(())
}

impl ExpenseStore for SqliteStore {
    fn load_expenses(&self) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(SELECT_EXPENSES)?;
        let rows = stmt.query_map([], expense_row)?;
        let mut expenses = Vec::new();
        for row in rows {
            let decoded = row
                .map_err(|err| err.to_string())
                .and_then(|row| {
                    row.into_expense(self.clock.as_ref())
                        .map_err(|err| err.to_string())
                });
            match decoded {
                Ok(expense) => expenses.push(expense),
                Err(err) => warn!("skipping expense row: {}", err),
            }
        }
        Ok(expenses)
    }

    fn insert_expense(&self, expense: &NewExpense) -> Result<Expense> {
        self.conn.execute(
            "INSERT INTO expenses (category, amount, description, date, receipt_uri)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                expense.category.as_str(),
                expense.amount,
                expense.description,
                format_date(expense.date),
                expense.receipt_uri,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        Ok(expense.clone().into_expense(id))
    }

    fn update_expense(&self, expense: &Expense) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE expenses
             SET category = ?1, amount = ?2, description = ?3, date = ?4, receipt_uri = ?5
             WHERE id = ?6",
            params![
                expense.category.as_str(),
                expense.amount,
                expense.description,
                format_date(expense.date),
                expense.receipt_uri,
                expense.id,
            ],
        )?;
        if changed == 0 {
            return Err(TrackerError::ExpenseNotFound(expense.id));
        }
        Ok(())
    }

    fn delete_expense(&self, id: ExpenseId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(TrackerError::ExpenseNotFound(id));
        }
        Ok(())
    }

    fn load_budgets(&self) -> Result<Vec<Budget>> {
        self.query_budgets(
            "SELECT category, amount, period_key FROM budgets ORDER BY period_key, category",
            None,
        )
    }

    fn budgets_for_period(&self, period: &Period) -> Result<Vec<Budget>> {
        self.query_budgets(
            "SELECT category, amount, period_key FROM budgets WHERE period_key = ?1",
            Some(period.key().as_str()),
        )
    }

    fn upsert_budget(&self, budget: &Budget) -> Result<()> {
        self.conn.execute(
            "INSERT INTO budgets (category, amount, period_key) VALUES (?1, ?2, ?3)
             ON CONFLICT(category, period_key) DO UPDATE SET amount = excluded.amount",
            params![budget.category.as_str(), budget.amount, budget.period.key()],
        )?;
        Ok(())
    }

    fn insert_budget_if_absent(&self, budget: &Budget) -> Result<bool> {
        let existing: Option<f64> = self
            .conn
            .query_row(
                "SELECT amount FROM budgets WHERE category = ?1 AND period_key = ?2",
                params![budget.category.as_str(), budget.period.key()],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO budgets (category, amount, period_key) VALUES (?1, ?2, ?3)",
            params![budget.category.as_str(), budget.amount, budget.period.key()],
        )?;
        Ok(inserted > 0)
    }

    fn insert_budgets_if_absent(&self, budgets: &[Budget]) -> Result<Vec<Budget>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut written = Vec::new();
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO budgets (category, amount, period_key) VALUES (?1, ?2, ?3)",
            )?;
            for budget in budgets {
                let inserted = stmt.execute(params![
                    budget.category.as_str(),
                    budget.amount,
                    budget.period.key()
                ])?;
                if inserted > 0 {
                    written.push(budget.clone());
                }
            }
        }
        tx.commit()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::FixedClock;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::on(date(2024, 3, 1)))
    }

    fn cycle() -> Period {
        Period::new(date(2024, 1, 13), date(2024, 2, 12)).unwrap()
    }

    #[test]
    fn expenses_come_back_newest_first() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        let older = store
            .insert_expense(&NewExpense::new(ExpenseCategory::Fuel, 40.0, "petrol", date(2024, 1, 14)))
            .unwrap();
        let newer = store
            .insert_expense(
                &NewExpense::new(ExpenseCategory::Meal, 8.0, "lunch", date(2024, 1, 30))
                    .with_receipt("content://receipts/1"),
            )
            .unwrap();
        let loaded = store.load_expenses().unwrap();
        assert_eq!(loaded, vec![newer, older]);
    }

    #[test]
    fn insert_if_absent_keeps_existing_amount() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Meal, 120.0, cycle()))
            .unwrap();
        let written = store
            .insert_budget_if_absent(&Budget::zero(ExpenseCategory::Meal, cycle()))
            .unwrap();
        assert!(!written);
        let budgets = store.budgets_for_period(&cycle()).unwrap();
        assert_eq!(budgets, vec![Budget::new(ExpenseCategory::Meal, 120.0, cycle())]);
    }

    #[test]
    fn upsert_overwrites_amount() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Fuel, 10.0, cycle()))
            .unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Fuel, 25.0, cycle()))
            .unwrap();
        let budgets = store.load_budgets().unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].amount, 25.0);
    }

    #[test]
    fn bad_stored_values_fall_back() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO expenses (category, amount, description, date)
                 VALUES ('SHOPPING', 3.0, 'socks', 'someday');
                 INSERT INTO budgets (category, amount, period_key)
                 VALUES ('MEAL', 10.0, 'broken');",
            )
            .unwrap();
        let expenses = store.load_expenses().unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].category, ExpenseCategory::Others);
        assert_eq!(expenses[0].date, date(2024, 3, 1));
        assert!(store.load_budgets().unwrap().is_empty());
    }

    #[test]
    fn non_canonical_keys_do_not_duplicate_budgets() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        store
            .conn
            .execute_batch(
                "INSERT INTO budgets (category, amount, period_key)
                 VALUES ('NTUC', 100.0, '2024-1-13,2024-2-12');",
            )
            .unwrap();
        assert!(store.load_budgets().unwrap().is_empty());

        let created = crate::core::services::BudgetService::reconcile(&store, &cycle()).unwrap();
        assert_eq!(created.len(), ExpenseCategory::ALL.len());

        let budgets = store.budgets_for_period(&cycle()).unwrap();
        assert_eq!(budgets.len(), ExpenseCategory::ALL.len());
        let ntuc_rows = budgets
            .iter()
            .filter(|budget| budget.category == ExpenseCategory::Ntuc)
            .count();
        assert_eq!(ntuc_rows, 1);
        assert!(store
            .load_budgets()
            .unwrap()
            .iter()
            .all(|budget| budget.period == cycle()));
    }

    #[test]
    fn budget_batch_skips_existing_rows() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        store
            .upsert_budget(&Budget::new(ExpenseCategory::Fuel, 60.0, cycle()))
            .unwrap();
        let batch = vec![
            Budget::zero(ExpenseCategory::Fuel, cycle()),
            Budget::zero(ExpenseCategory::Others, cycle()),
        ];
        let written = store.insert_budgets_if_absent(&batch).unwrap();
        assert_eq!(written, vec![Budget::zero(ExpenseCategory::Others, cycle())]);
        let fuel = store
            .budgets_for_period(&cycle())
            .unwrap()
            .into_iter()
            .find(|budget| budget.category == ExpenseCategory::Fuel)
            .unwrap();
        assert_eq!(fuel.amount, 60.0);
    }

    #[test]
    fn missing_rows_report_not_found() {
        let store = SqliteStore::open_in_memory(clock()).unwrap();
        assert!(matches!(
            store.delete_expense(42),
            Err(TrackerError::ExpenseNotFound(42))
        ));
    }
}
