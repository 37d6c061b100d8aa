//! Facade the presentation layer talks to.
//!
//! Every store call goes through one lock, so writes are applied in the order they are issued.
//! Reads are served from an in-memory copy that only changes after the store accepted a write.

use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};

use tracing::{debug, info, warn};

use crate::{
    config::Config,
    core::{
        errors::{Result, TrackerError},
        services::{BudgetService, ExpenseService, SummaryService},
        time::Clock,
    },
    ledger::{
        Budget, Expense, ExpenseCategory, ExpenseId, NewExpense, Period, PeriodKind,
        PeriodSummary,
    },
    storage::{open_store, ExpenseStore},
};

/// Everything a view needs to render the selected period.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub period: Period,
    /// Expenses inside the period, newest first.
    pub expenses: Vec<Expense>,
    /// Exactly one budget per category for the period.
    pub budgets: Vec<Budget>,
    pub summary: PeriodSummary,
}

struct TrackerState {
    store: Box<dyn ExpenseStore>,
    clock: Arc<dyn Clock>,
    period: Period,
    expenses: Vec<Expense>,
    budgets: Vec<Budget>,
}

impl TrackerState {
    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            period: self.period,
            expenses: SummaryService::expenses_in_period(&self.period, &self.expenses),
            budgets: BudgetService::complete_for_period(&self.period, &self.budgets),
            summary: SummaryService::summarize(&self.period, &self.expenses, &self.budgets),
        }
    }

    fn reload(&mut self) -> Result<()> {
        BudgetService::reconcile(self.store.as_ref(), &self.period)?;
        let expenses = self.store.load_expenses()?;
        let budgets = self.store.load_budgets()?;
        self.expenses = expenses;
        self.budgets = budgets;
        Ok(())
    }

    fn cache_budget(&mut self, budget: Budget) {
        match self
            .budgets
            .iter()
            .position(|existing| existing.is_for(budget.category, &budget.period))
        {
            Some(index) => self.budgets[index] = budget,
            None => self.budgets.push(budget),
        }
    }
}

/// Coordinates the store, the selected period, and snapshot subscribers.
pub struct ExpenseTracker {
    state: Mutex<TrackerState>,
    subscribers: Mutex<Vec<Sender<TrackerSnapshot>>>,
}

impl ExpenseTracker {
    /// Opens the tracker on the default period of `kind` for the clock's current date.
    ///
    /// Budgets for that period are reconciled before anything is read.
    pub fn open(
        store: Box<dyn ExpenseStore>,
        clock: Arc<dyn Clock>,
        kind: PeriodKind,
    ) -> Result<Self> {
        let period = Period::default_for(kind, clock.today());
        let mut state = TrackerState {
            store,
            clock,
            period,
            expenses: Vec::new(),
            budgets: Vec::new(),
        };
        state.reload()?;
        info!(
            "expense tracker opened on {} ({})",
            period.display_label(),
            period.kind()
        );
        Ok(Self {
            state: Mutex::new(state),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = open_store(config, Arc::clone(&clock))?;
        Self::open(store, clock, config.default_period)
    }

    /// Receives the current snapshot immediately and a fresh one after every change.
    pub fn subscribe(&self) -> Result<Receiver<TrackerSnapshot>> {
        let state = self.state.lock()?;
        let (tx, rx) = mpsc::channel();
        tx.send(state.snapshot())
            .map_err(|err| TrackerError::StateUnavailable(err.to_string()))?;
        self.subscribers.lock()?.push(tx);
        Ok(rx)
    }

    pub fn snapshot(&self) -> Result<TrackerSnapshot> {
        Ok(self.state.lock()?.snapshot())
    }

    pub fn period(&self) -> Result<Period> {
        Ok(self.state.lock()?.period)
    }

    pub fn summary(&self) -> Result<PeriodSummary> {
        let state = self.state.lock()?;
        Ok(SummaryService::summarize(
            &state.period,
            &state.expenses,
            &state.budgets,
        ))
    }

    pub fn expense(&self, id: ExpenseId) -> Result<Expense> {
        let state = self.state.lock()?;
        state
            .expenses
            .iter()
            .find(|expense| expense.id == id)
            .cloned()
            .ok_or(TrackerError::ExpenseNotFound(id))
    }

    /// Expenses of `category` in the selected period, newest first.
    pub fn expenses_in_category(&self, category: ExpenseCategory) -> Result<Vec<Expense>> {
        let state = self.state.lock()?;
        Ok(SummaryService::expenses_in_category(
            &state.period,
            category,
            &state.expenses,
        ))
    }

    pub fn add_expense(&self, expense: NewExpense) -> Result<Expense> {
        ExpenseService::validate_new(&expense)?;
        let mut state = self.state.lock()?;
        let stored = state.store.insert_expense(&expense)?;
        debug!("added expense {} ({})", stored.id, stored.category.as_str());
        state.expenses.push(stored.clone());
        self.publish(&state);
        Ok(stored)
    }

    pub fn update_expense(&self, expense: Expense) -> Result<()> {
        ExpenseService::validate(&expense)?;
        let mut state = self.state.lock()?;
        state.store.update_expense(&expense)?;
        debug!("updated expense {}", expense.id);
        match state
            .expenses
            .iter()
            .position(|cached| cached.id == expense.id)
        {
            Some(index) => state.expenses[index] = expense,
            None => state.expenses.push(expense),
        }
        self.publish(&state);
        Ok(())
    }

    pub fn delete_expense(&self, id: ExpenseId) -> Result<()> {
        let mut state = self.state.lock()?;
        state.store.delete_expense(id)?;
        debug!("deleted expense {}", id);
        state.expenses.retain(|expense| expense.id != id);
        self.publish(&state);
        Ok(())
    }

    /// Sets a category budget for the selected period from raw user input.
    ///
    /// Input that is empty or not a valid amount stores `0.0`.
    pub fn set_budget(&self, category: ExpenseCategory, input: &str) -> Result<Budget> {
        self.set_budget_amount(category, BudgetService::parse_amount_input(input))
    }

    pub fn set_budget_amount(&self, category: ExpenseCategory, amount: f64) -> Result<Budget> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(TrackerError::InvalidInput(format!(
                "budget amount {amount} must be a non-negative number"
            )));
        }
        let mut state = self.state.lock()?;
        let budget = Budget::new(category, amount, state.period);
        state.store.upsert_budget(&budget)?;
        debug!(
            "budget for {} in {} set to {}",
            category.as_str(),
            budget.period,
            amount
        );
        state.cache_budget(budget.clone());
        self.publish(&state);
        Ok(budget)
    }

    /// Makes `period` the active window.
    ///
    /// Missing budgets are persisted first; if that fails the previous period stays selected
    /// and nothing is published.
    pub fn select_period(&self, period: Period) -> Result<()> {
        let mut state = self.state.lock()?;
        let created = BudgetService::reconcile(state.store.as_ref(), &period)?;
        for budget in created {
            state.cache_budget(budget);
        }
        state.period = period;
        info!("selected period {}", period.display_label());
        self.publish(&state);
        Ok(())
    }

    /// Selects the default period of `kind` for today.
    pub fn select_default_period(&self, kind: PeriodKind) -> Result<Period> {
        let today = self.state.lock()?.clock.today();
        let period = Period::default_for(kind, today);
        self.select_period(period)?;
        Ok(period)
    }

    pub fn next_period(&self) -> Result<Period> {
        let period = self.period()?.successor();
        self.select_period(period)?;
        Ok(period)
    }

    pub fn previous_period(&self) -> Result<Period> {
        let period = self.period()?.predecessor();
        self.select_period(period)?;
        Ok(period)
    }

    /// Re-reads everything from the store.
    pub fn refresh(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        state.reload()?;
        self.publish(&state);
        Ok(())
    }

    /// Runs after the store accepted the change, so it never fails the command.
    fn publish(&self, state: &TrackerState) {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("subscriber list was poisoned; recovering it");
                poisoned.into_inner()
            }
        };
        if subscribers.is_empty() {
            return;
        }
        let snapshot = state.snapshot();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}
