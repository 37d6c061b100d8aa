//! Domain models: periods, categories, expenses, budgets, and derived summaries.

pub mod budget;
pub mod category;
pub mod expense;
pub mod period;
pub mod summary;

pub use budget::Budget;
pub use category::{ExpenseCategory, UnknownCategory};
pub use expense::{Expense, ExpenseId, NewExpense};
pub use period::{Period, PeriodError, PeriodKind, CYCLE_END_DAY, CYCLE_START_DAY};
pub use summary::{BudgetStatus, CategorySummary, PeriodSummary};
