#![doc(test(attr(deny(warnings))))]

//! Expense Core tracks expenses against a fixed set of categories, rolls spending up over a
//! selectable budget period, and keeps a per-category budget for every period in view.

pub mod config;
pub mod core;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    init_with_filter(None);
}

/// Like [`init`], with an extra filter directive such as the config's `log_filter`.
pub fn init_with_filter(filter: Option<&str>) {
    INIT_TRACING.call_once(|| {
        utils::init_tracing(filter);
        tracing::info!("Expense Core tracing initialized.");
    });
}

pub use crate::core::errors::{Result, TrackerError};
pub use crate::core::time::{Clock, FixedClock, SystemClock};
pub use crate::core::tracker::{ExpenseTracker, TrackerSnapshot};
