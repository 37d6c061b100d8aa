use crate::core::errors::{Result, TrackerError};
use crate::ledger::{Expense, NewExpense};

/// Validation rules shared by every expense write path.
pub struct ExpenseService;

impl ExpenseService {
    pub fn validate_new(expense: &NewExpense) -> Result<()> {
        Self::validate_amount(expense.amount)
    }

    pub fn validate(expense: &Expense) -> Result<()> {
        Self::validate_amount(expense.amount)
    }

    fn validate_amount(amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(TrackerError::InvalidInput(format!(
                "expense amount {amount} is not a number"
            )));
        }
        if amount < 0.0 {
            return Err(TrackerError::InvalidInput(format!(
                "expense amount {amount} must not be negative"
            )));
        }
        Ok(())
    }
}
