use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Fixed set of expense classifications, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Ntuc,
    Meal,
    Fuel,
    JlJe,
    Others,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown expense category `{0}`")]
pub struct UnknownCategory(pub String);

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        ExpenseCategory::Ntuc,
        ExpenseCategory::Meal,
        ExpenseCategory::Fuel,
        ExpenseCategory::JlJe,
        ExpenseCategory::Others,
    ];

    /// Category used when a stored value cannot be recognised.
    pub const CATCH_ALL: ExpenseCategory = ExpenseCategory::Others;

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::Ntuc => "NTUC",
            ExpenseCategory::Meal => "MEAL",
            ExpenseCategory::Fuel => "FUEL",
            ExpenseCategory::JlJe => "JL_JE",
            ExpenseCategory::Others => "OTHERS",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExpenseCategory::Ntuc => "NTUC",
            ExpenseCategory::Meal => "Meal",
            ExpenseCategory::Fuel => "Fuel",
            ExpenseCategory::JlJe => "JL & JE",
            ExpenseCategory::Others => "Others",
        }
    }

    /// Lenient decoding for persisted rows: unknown values map to [`Self::CATCH_ALL`].
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|err: UnknownCategory| {
            warn!("{}; using {}", err, Self::CATCH_ALL.as_str());
            Self::CATCH_ALL
        })
    }
}

impl FromStr for ExpenseCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == trimmed)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
