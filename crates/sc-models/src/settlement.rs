//! Settlement rules: map a delivery date to the date its cash flow settles.

use chrono::{Datelike, NaiveDate};
use sc_core::{ensure_config, errors::Result};
use std::fmt;
use std::sync::Arc;

/// A shareable `delivery date -> settlement date` function.
#[derive(Clone)]
pub struct SettlementRule {
    name: String,
    rule: Arc<dyn Fn(NaiveDate) -> NaiveDate + Send + Sync>,
}

impl SettlementRule {
    /// Wrap an arbitrary rule.
    pub fn new<F>(name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(NaiveDate) -> NaiveDate + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            rule: Arc::new(rule),
        }
    }

    /// Cash settles on the delivery date.
    pub fn same_day() -> Self {
        Self::new("same day", |d| d)
    }

    /// Cash settles on `day` of the month after delivery, e.g. the 20th.
    ///
    /// `day` must be in `1..=28` so it exists in every month.
    pub fn day_of_following_month(day: u32) -> Result<Self> {
        ensure_config!(
            (1..=28).contains(&day),
            "settlement day of month must be in 1..=28, got {day}"
        );
        Ok(Self::new(format!("day {day} of following month"), move |d| {
            let (year, month) = if d.month() == 12 {
                (d.year() + 1, 1)
            } else {
                (d.year(), d.month() + 1)
            };
            NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
        }))
    }

    /// Settlement date for a delivery on `delivery`.
    pub fn settle(&self, delivery: NaiveDate) -> NaiveDate {
        (self.rule)(delivery)
    }

    /// Descriptive name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SettlementRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettlementRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Default for SettlementRule {
    fn default() -> Self {
        Self::same_day()
    }
}
