#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use expense_core::{
    config::ConfigManager,
    core::{time::FixedClock, tracker::ExpenseTracker},
    ledger::{Period, PeriodKind},
    storage::{JsonStore, SqliteStore},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// The 13 Jan - 12 Feb 2024 budget cycle.
pub fn january_cycle() -> Period {
    Period::new(date(2024, 1, 13), date(2024, 2, 12)).expect("valid period")
}

/// Clock pinned inside [`january_cycle`].
pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::on(date(2024, 1, 20)))
}

/// A fresh directory that outlives the test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn json_store(base: &Path) -> JsonStore {
    JsonStore::new(Some(base.to_path_buf()), clock()).expect("create json store")
}

pub fn sqlite_store(base: &Path) -> SqliteStore {
    SqliteStore::open(&base.join("expenses.db"), clock()).expect("open sqlite store")
}

/// Creates an isolated tracker and config manager backed by a unique directory.
pub fn setup_test_env() -> (ExpenseTracker, ConfigManager, PathBuf) {
    let base = temp_base();
    let tracker = ExpenseTracker::open(
        Box::new(json_store(&base)),
        clock(),
        PeriodKind::BudgetCycle,
    )
    .expect("open tracker");
    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");
    (tracker, config_manager, base)
}
