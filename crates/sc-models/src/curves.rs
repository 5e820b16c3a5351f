//! Forward and interest-rate curves, and the discount factor convention
//! used with them.

use chrono::NaiveDate;
use sc_core::{errors::Error, errors::Result, DiscountFactor, Price, Rate, TimeSeries};

/// Forward price per delivery date.
pub type ForwardCurve = TimeSeries<NaiveDate, Price>;

/// Continuously-compounded zero rate per cash-flow date.
pub type InterestRateCurve = TimeSeries<NaiveDate, Rate>;

const DAYS_PER_YEAR: f64 = 365.0;

/// Act/365 continuously-compounded discount factor from `present` to
/// `cash_flow`, using the rate stored for `cash_flow`.
///
/// Cash flows on or before `present` are not discounted.
pub fn act365_discount_factor(
    interest_rates: &InterestRateCurve,
    present: NaiveDate,
    cash_flow: NaiveDate,
) -> Result<DiscountFactor> {
    if cash_flow <= present {
        return Ok(1.0);
    }
    let rate = interest_rates
        .get(&cash_flow)
        .copied()
        .ok_or_else(|| Error::MissingCurveValue {
            curve: "interest rate".into(),
            date: cash_flow.to_string(),
        })?;
    let t = (cash_flow - present).num_days() as f64 / DAYS_PER_YEAR;
    Ok((-rate * t).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn discount_factor_act365() {
        let rates = InterestRateCurve::from_pairs([(date(2025, 1, 1), 0.05)]);
        let df = act365_discount_factor(&rates, date(2024, 1, 1), date(2025, 1, 1)).unwrap();
        assert_abs_diff_eq!(df, (-0.05 * 366.0 / 365.0_f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn past_cash_flows_undiscounted() {
        let rates = InterestRateCurve::new();
        let today = date(2024, 6, 1);
        assert_eq!(act365_discount_factor(&rates, today, today).unwrap(), 1.0);
        assert_eq!(
            act365_discount_factor(&rates, today, date(2024, 5, 1)).unwrap(),
            1.0
        );
    }

    #[test]
    fn missing_rate_is_reported() {
        let rates = InterestRateCurve::from_pairs([(date(2024, 7, 1), 0.03)]);
        let err = act365_discount_factor(&rates, date(2024, 6, 1), date(2024, 8, 1)).unwrap_err();
        assert_eq!(
            err,
            Error::MissingCurveValue {
                curve: "interest rate".into(),
                date: "2024-08-01".into(),
            }
        );
    }
}
