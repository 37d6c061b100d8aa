//! Budgeting periods: inclusive date windows and the arithmetic used to move between them.
//!
//! A [`Period`] is always `start <= end`. Its [`PeriodKind`] is derived from the two dates and
//! never stored; moving to a neighbouring window always builds a fresh value.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::time::Clock;

const KEY_DATE_FORMAT: &str = "%Y-%m-%d";
const KEY_SEPARATOR: char = ',';

/// Day of month on which a budget cycle starts.
pub const CYCLE_START_DAY: u32 = 13;
/// Day of month, in the following month, on which a budget cycle ends.
pub const CYCLE_END_DAY: u32 = 12;

/// Errors raised while building or parsing a [`Period`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("period end {end} is before start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("invalid calendar month {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("malformed period key `{0}`")]
    MalformedKey(String),
}

/// Classification of a period, derived from its dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    CalendarMonth,
    #[default]
    BudgetCycle,
    Custom,
}

impl PeriodKind {
    pub fn label(self) -> &'static str {
        match self {
            PeriodKind::CalendarMonth => "Calendar Month",
            PeriodKind::BudgetCycle => "Budget Cycle",
            PeriodKind::Custom => "Custom Period",
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive `[start, end]` date window used as the unit of budgeting.
///
/// Serializes as its canonical key (`"yyyy-MM-dd,yyyy-MM-dd"`), which is also the value budgets
/// are joined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if end < start {
            return Err(PeriodError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered, counting both endpoints.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The full calendar month `[1st .. last day]`.
    pub fn for_calendar_month(year: i32, month: u32) -> Result<Self, PeriodError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(PeriodError::InvalidMonth { year, month })?;
        Ok(Self::calendar_month_containing(first))
    }

    pub fn calendar_month_containing(date: NaiveDate) -> Self {
        let start = first_of_month(date);
        let end = add_days(start, i64::from(days_in_month(start.year(), start.month())) - 1);
        Self { start, end }
    }

    /// The 13th-to-12th budget cycle containing `date`.
    ///
    /// Days 1 through 12 belong to the cycle that started on the 13th of the previous month;
    /// from the 13th onwards a new cycle is running.
    pub fn budget_cycle_containing(date: NaiveDate) -> Self {
        let month = first_of_month(date);
        let cycle_month = if date.day() >= CYCLE_START_DAY {
            month
        } else {
            shift_month(month, -1)
        };
        let start = add_days(cycle_month, i64::from(CYCLE_START_DAY) - 1);
        let end = add_days(shift_month(cycle_month, 1), i64::from(CYCLE_END_DAY) - 1);
        Self { start, end }
    }

    /// The budget cycle containing the clock's current date.
    pub fn custom_default(clock: &dyn Clock) -> Self {
        Self::budget_cycle_containing(clock.today())
    }

    pub fn current_calendar_month(clock: &dyn Clock) -> Self {
        Self::calendar_month_containing(clock.today())
    }

    /// Starting period for a preferred kind. There is no natural custom window, so `Custom`
    /// falls back to the budget cycle.
    pub fn default_for(kind: PeriodKind, today: NaiveDate) -> Self {
        match kind {
            PeriodKind::CalendarMonth => Self::calendar_month_containing(today),
            PeriodKind::BudgetCycle | PeriodKind::Custom => Self::budget_cycle_containing(today),
        }
    }

    /// The window of equal length starting the day after `end`.
    pub fn next(&self) -> Self {
        let span = (self.end - self.start).num_days();
        Self {
            start: add_days(self.end, 1),
            end: add_days(self.end, span + 1),
        }
    }

    /// The window of equal length ending the day before `start`.
    pub fn previous(&self) -> Self {
        let span = (self.end - self.start).num_days();
        Self {
            start: add_days(self.start, -(span + 1)),
            end: add_days(self.start, -1),
        }
    }

    /// Shifts both endpoints forward one calendar month, keeping day-of-month.
    pub fn next_budget_cycle(&self) -> Self {
        Self {
            start: shift_month(self.start, 1),
            end: shift_month(self.end, 1),
        }
    }

    pub fn previous_budget_cycle(&self) -> Self {
        Self {
            start: shift_month(self.start, -1),
            end: shift_month(self.end, -1),
        }
    }

    pub fn next_calendar_month(&self) -> Self {
        Self::calendar_month_containing(shift_month(first_of_month(self.start), 1))
    }

    pub fn previous_calendar_month(&self) -> Self {
        Self::calendar_month_containing(shift_month(first_of_month(self.start), -1))
    }

    /// The period a "next" navigation lands on for this kind of window.
    pub fn successor(&self) -> Self {
        match self.kind() {
            PeriodKind::BudgetCycle => self.next_budget_cycle(),
            PeriodKind::CalendarMonth => self.next_calendar_month(),
            PeriodKind::Custom => self.next(),
        }
    }

    pub fn predecessor(&self) -> Self {
        match self.kind() {
            PeriodKind::BudgetCycle => self.previous_budget_cycle(),
            PeriodKind::CalendarMonth => self.previous_calendar_month(),
            PeriodKind::Custom => self.previous(),
        }
    }

    pub fn kind(&self) -> PeriodKind {
        if self.is_budget_cycle() {
            PeriodKind::BudgetCycle
        } else if self.is_calendar_month() {
            PeriodKind::CalendarMonth
        } else {
            PeriodKind::Custom
        }
    }

    pub fn is_calendar_month(&self) -> bool {
        self.start.day() == 1
            && self.start.year() == self.end.year()
            && self.start.month() == self.end.month()
            && self.end.day() == days_in_month(self.end.year(), self.end.month())
    }

    pub fn is_budget_cycle(&self) -> bool {
        self.start.day() == CYCLE_START_DAY
            && self.end.day() == CYCLE_END_DAY
            && shift_month(self.start, 1) == add_days(self.end, 1)
    }

    /// Canonical storage key, `"yyyy-MM-dd,yyyy-MM-dd"`.
    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.start.format(KEY_DATE_FORMAT),
            KEY_SEPARATOR,
            self.end.format(KEY_DATE_FORMAT)
        )
    }

    /// Parses a canonical key. Anything [`Period::key`] would not produce, such as unpadded
    /// fields or surrounding whitespace, is rejected so one period maps to exactly one key.
    pub fn parse_key(key: &str) -> Result<Self, PeriodError> {
        let period = Self::parse_loose_key(key)?;
        if period.key() != key {
            return Err(PeriodError::MalformedKey(key.to_string()));
        }
        Ok(period)
    }

    /// Accepts whitespace and unpadded month or day fields. Only for normalising old data.
    pub fn parse_loose_key(key: &str) -> Result<Self, PeriodError> {
        let malformed = || PeriodError::MalformedKey(key.to_string());
        let (start, end) = key.split_once(KEY_SEPARATOR).ok_or_else(malformed)?;
        let start =
            NaiveDate::parse_from_str(start.trim(), KEY_DATE_FORMAT).map_err(|_| malformed())?;
        let end = NaiveDate::parse_from_str(end.trim(), KEY_DATE_FORMAT).map_err(|_| malformed())?;
        Self::new(start, end)
    }

    /// "Jan 2024" for calendar months, "13 Jan - 12 Feb 2024" otherwise.
    pub fn display_label(&self) -> String {
        if self.is_calendar_month() {
            return self.start.format("%b %Y").to_string();
        }
        format!(
            "{} - {} {}",
            self.start.format("%-d %b"),
            self.end.format("%-d %b"),
            self.end.year()
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_key(s)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.key()
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_key(&value)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.day0()))
}

// Saturates at the ends of the representable range instead of panicking.
fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

fn shift_month(date: NaiveDate, months: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
