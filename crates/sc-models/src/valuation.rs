//! The storage valuation boundary.
//!
//! The calibration never values storage itself.  It builds a
//! [`ValuationRequest`] per target and trial point and hands it to a
//! [`StorageValuer`], which might be a least-squares Monte Carlo engine, a
//! remote service, or a test stub.  Errors returned by the valuer are passed
//! back to the caller untouched.

use crate::curves::{act365_discount_factor, ForwardCurve, InterestRateCurve};
use crate::parameters::ThreeFactorSeasonalParams;
use crate::settlement::SettlementRule;
use chrono::NaiveDate;
use sc_core::{ensure_config, errors::Result, DiscountFactor, Price, Real, Volume};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ── Simulation controls ───────────────────────────────────────────────────────

/// Regression basis expression, e.g. `"1 + x_st + x_lt + x_sw + s**2"`.
///
/// Passed through to the valuer as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BasisFunctions(String);

impl BasisFunctions {
    /// Wrap an expression.
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// The expression as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The expression with the named factor aliases `x_st`, `x_lt` and
    /// `x_sw` replaced by the positional names `x0`, `x1`, `x2`.
    pub fn expand_factor_aliases(&self) -> String {
        self.0
            .replace("x_st", "x0")
            .replace("x_lt", "x1")
            .replace("x_sw", "x2")
    }
}

impl From<&str> for BasisFunctions {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for BasisFunctions {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for BasisFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run-wide Monte Carlo settings, shared by every valuation in a calibration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationControls {
    /// Number of simulated paths.
    pub num_sims: usize,
    /// Regression basis.
    pub basis_funcs: BasisFunctions,
    /// Seed for the regression simulation. `None` lets the valuer pick one.
    pub seed: Option<u64>,
    /// Independent seed for the forward (exercise) simulation.
    pub fwd_sim_seed: Option<u64>,
    /// Inventory grid resolution.
    pub num_inventory_grid_points: usize,
    /// Numerical tolerance used inside the valuer.
    pub numerical_tolerance: Real,
}

impl SimulationControls {
    /// Default inventory grid resolution.
    pub const DEFAULT_INVENTORY_GRID_POINTS: usize = 100;
    /// Default numerical tolerance.
    pub const DEFAULT_NUMERICAL_TOLERANCE: Real = 1e-12;

    /// Controls with the given path count and basis, default grid and tolerance, no seeds.
    pub fn new(num_sims: usize, basis_funcs: impl Into<BasisFunctions>) -> Self {
        Self {
            num_sims,
            basis_funcs: basis_funcs.into(),
            seed: None,
            fwd_sim_seed: None,
            num_inventory_grid_points: Self::DEFAULT_INVENTORY_GRID_POINTS,
            numerical_tolerance: Self::DEFAULT_NUMERICAL_TOLERANCE,
        }
    }

    /// Fix the regression simulation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fix the forward simulation seed.
    pub fn with_fwd_sim_seed(mut self, seed: u64) -> Self {
        self.fwd_sim_seed = Some(seed);
        self
    }

    /// Override the inventory grid resolution.
    pub fn with_num_inventory_grid_points(mut self, n: usize) -> Self {
        self.num_inventory_grid_points = n;
        self
    }

    /// Override the numerical tolerance.
    pub fn with_numerical_tolerance(mut self, tol: Real) -> Self {
        self.numerical_tolerance = tol;
        self
    }

    /// Check the controls are usable.
    pub fn validate(&self) -> Result<()> {
        ensure_config!(self.num_sims > 0, "num_sims must be positive");
        ensure_config!(
            self.num_inventory_grid_points > 0,
            "num_inventory_grid_points must be positive"
        );
        ensure_config!(
            self.numerical_tolerance > 0.0 && self.numerical_tolerance.is_finite(),
            "numerical_tolerance must be positive and finite, got {}",
            self.numerical_tolerance
        );
        Ok(())
    }
}

/// Which simulation arrays the valuer should return alongside the NPV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SimulationDataReturned {
    /// NPV and summary values only.
    #[default]
    None,
    /// Simulated prices, factors, inventories and decisions as well.
    All,
}

// ── Request / response ────────────────────────────────────────────────────────

/// Everything needed to value one storage facility under one parameter set.
#[derive(Debug)]
pub struct ValuationRequest<'a, S: ?Sized> {
    /// The storage contract.
    pub storage: &'a S,
    /// Valuation date.
    pub val_date: NaiveDate,
    /// Inventory at `val_date`.
    pub inventory: Volume,
    /// Forward curve.
    pub fwd_curve: &'a ForwardCurve,
    /// Interest-rate curve used for discounting.
    pub interest_rates: &'a InterestRateCurve,
    /// Delivery to settlement date mapping.
    pub settlement_rule: &'a SettlementRule,
    /// Spot price model parameters.
    pub model: ThreeFactorSeasonalParams,
    /// Monte Carlo settings.
    pub controls: &'a SimulationControls,
    /// Whether deltas should be discounted.
    pub discount_deltas: bool,
    /// Auxiliary simulation output requested.
    pub sim_data_returned: SimulationDataReturned,
}

impl<S: ?Sized> ValuationRequest<'_, S> {
    /// Discount factor from `val_date` to `cash_flow` on the request's rates.
    pub fn discount_factor(&self, cash_flow: NaiveDate) -> Result<DiscountFactor> {
        act365_discount_factor(self.interest_rates, self.val_date, cash_flow)
    }
}

/// What a valuer returns.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StorageValuation {
    /// Net present value.
    pub npv: Price,
    /// Intrinsic part of the NPV, if the valuer reports it.
    pub intrinsic_npv: Option<Price>,
}

impl StorageValuation {
    /// A valuation carrying only the NPV.
    pub fn new(npv: Price) -> Self {
        Self {
            npv,
            intrinsic_npv: None,
        }
    }

    /// Attach the intrinsic value.
    pub fn with_intrinsic(mut self, intrinsic_npv: Price) -> Self {
        self.intrinsic_npv = Some(intrinsic_npv);
        self
    }

    /// NPV minus intrinsic value, when both are known.
    pub fn extrinsic_npv(&self) -> Option<Price> {
        self.intrinsic_npv.map(|intrinsic| self.npv - intrinsic)
    }
}

/// Values storage of type `S`.
///
/// Implementations must be deterministic for a fixed request when seeds are
/// set; calibration reproducibility depends on it.
pub trait StorageValuer<S: ?Sized> {
    /// Value the storage described by `request`.
    fn value(&self, request: &ValuationRequest<'_, S>) -> Result<StorageValuation>;
}

impl<S: ?Sized, V: StorageValuer<S> + ?Sized> StorageValuer<S> for &V {
    fn value(&self, request: &ValuationRequest<'_, S>) -> Result<StorageValuation> {
        (**self).value(request)
    }
}

/// Adapter turning a closure into a [`StorageValuer`].
#[derive(Clone, Copy)]
pub struct FnValuer<F>(F);

/// Use a closure as a valuer.
///
/// ```
/// use sc_models::{valuer_fn, StorageValuation, ValuationRequest};
/// let flat = valuer_fn(|_req: &ValuationRequest<'_, ()>| Ok(StorageValuation::new(42.0)));
/// # let _ = flat;
/// ```
pub fn valuer_fn<S, F>(f: F) -> FnValuer<F>
where
    S: ?Sized,
    F: Fn(&ValuationRequest<'_, S>) -> Result<StorageValuation>,
{
    FnValuer(f)
}

impl<S, F> StorageValuer<S> for FnValuer<F>
where
    S: ?Sized,
    F: Fn(&ValuationRequest<'_, S>) -> Result<StorageValuation>,
{
    fn value(&self, request: &ValuationRequest<'_, S>) -> Result<StorageValuation> {
        (self.0)(request)
    }
}

impl<F> fmt::Debug for FnValuer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnValuer")
    }
}

/// Storage contracts that know when they end.
///
/// Lets curve coverage of `[val_date, end_date]` be checked up front.
pub trait StorageTerm {
    /// Last delivery date of the contract.
    fn end_date(&self) -> NaiveDate;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::SpotFactorParams;

    #[test]
    fn controls_defaults_and_validation() {
        let c = SimulationControls::new(1000, "1 + x_st + x_lt + x_sw")
            .with_seed(11)
            .with_fwd_sim_seed(12);
        assert_eq!(c.num_inventory_grid_points, 100);
        assert_eq!(c.numerical_tolerance, 1e-12);
        assert_eq!((c.seed, c.fwd_sim_seed), (Some(11), Some(12)));
        assert!(c.validate().is_ok());
        assert!(c.clone().with_numerical_tolerance(0.0).validate().is_err());
        assert!(c.clone().with_num_inventory_grid_points(0).validate().is_err());
        assert!(SimulationControls::new(0, "1").validate().is_err());
    }

    #[test]
    fn basis_aliases() {
        let b = BasisFunctions::from("1 + x_st + x_sw + x_lt + s**2 + s**3");
        assert_eq!(b.expand_factor_aliases(), "1 + x0 + x2 + x1 + s**2 + s**3");
        assert_eq!(b.to_string(), b.as_str());
    }

    #[test]
    fn closure_valuer_sees_request() {
        let fwd = ForwardCurve::new();
        let rates = InterestRateCurve::new();
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(10, "1");
        let model =
            ThreeFactorSeasonalParams::new(SpotFactorParams::new(0.3, 5.0), 0.1, 0.05).unwrap();
        let storage = 7_u32;
        let req = ValuationRequest {
            storage: &storage,
            val_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            inventory: 10.0,
            fwd_curve: &fwd,
            interest_rates: &rates,
            settlement_rule: &rule,
            model,
            controls: &controls,
            discount_deltas: false,
            sim_data_returned: SimulationDataReturned::None,
        };
        let valuer = valuer_fn(|r: &ValuationRequest<'_, u32>| {
            Ok(StorageValuation::new(*r.storage as Price + r.model.spot_vol()))
        });
        let v = valuer.value(&req).unwrap();
        assert!((v.npv - 7.3).abs() < 1e-12);
        assert_eq!(v.extrinsic_npv(), None);
        assert_eq!(
            StorageValuation::new(5.0).with_intrinsic(3.0).extrinsic_npv(),
            Some(2.0)
        );
    }
}
