//! One storage facility the model is calibrated against.

use crate::curves::{ForwardCurve, InterestRateCurve};
use crate::parameters::{SpotFactorParams, ThreeFactorSeasonalParams};
use crate::settlement::SettlementRule;
use crate::valuation::{SimulationControls, SimulationDataReturned, StorageTerm, ValuationRequest};
use chrono::NaiveDate;
use sc_core::{ensure_config, errors::Result, Price, Volatility, Volume};

/// A storage contract with a known present value.
///
/// `S` is whatever the valuer understands as a storage contract; the
/// calibration only borrows it.
#[derive(Debug, Clone)]
pub struct CalibrationTarget<S> {
    /// The storage contract.
    pub storage: S,
    /// Present value the model should reproduce.
    pub target_pv: Price,
    /// Volume used to turn PV differences into per-unit errors. Never zero.
    pub notional_volume: Volume,
    /// Valuation date.
    pub val_date: NaiveDate,
    /// Inventory at `val_date`.
    pub inventory: Volume,
    /// Forward curve covering at least `[val_date, storage end]`.
    pub fwd_curve: ForwardCurve,
    /// Interest-rate curve with the same coverage.
    pub interest_rates: InterestRateCurve,
    /// Fixed long-term factor volatility.
    pub long_term_vol: Volatility,
    /// Fixed seasonal factor volatility.
    pub seasonal_vol: Volatility,
}

impl<S> CalibrationTarget<S> {
    /// Create a target.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: S,
        target_pv: Price,
        notional_volume: Volume,
        val_date: NaiveDate,
        inventory: Volume,
        fwd_curve: ForwardCurve,
        interest_rates: InterestRateCurve,
        long_term_vol: Volatility,
        seasonal_vol: Volatility,
    ) -> Self {
        Self {
            storage,
            target_pv,
            notional_volume,
            val_date,
            inventory,
            fwd_curve,
            interest_rates,
            long_term_vol,
            seasonal_vol,
        }
    }

    /// Check the numeric fields and that both curves have data.
    pub fn validate(&self) -> Result<()> {
        ensure_config!(
            self.notional_volume > 0.0 && self.notional_volume.is_finite(),
            "notional_volume must be finite and positive, got {}",
            self.notional_volume
        );
        ensure_config!(
            self.target_pv.is_finite(),
            "target_pv must be finite, got {}",
            self.target_pv
        );
        ensure_config!(
            self.inventory.is_finite(),
            "inventory must be finite, got {}",
            self.inventory
        );
        ensure_config!(
            self.long_term_vol.is_finite() && self.long_term_vol >= 0.0,
            "long_term_vol must be finite and non-negative, got {}",
            self.long_term_vol
        );
        ensure_config!(
            self.seasonal_vol.is_finite() && self.seasonal_vol >= 0.0,
            "seasonal_vol must be finite and non-negative, got {}",
            self.seasonal_vol
        );
        ensure_config!(!self.fwd_curve.is_empty(), "forward curve is empty");
        ensure_config!(!self.interest_rates.is_empty(), "interest rate curve is empty");
        Ok(())
    }

    /// Model parameters for a trial spot factor.
    pub fn model_params(&self, spot: SpotFactorParams) -> Result<ThreeFactorSeasonalParams> {
        ThreeFactorSeasonalParams::new(spot, self.long_term_vol, self.seasonal_vol)
    }

    /// Build the valuation request for a trial spot factor.
    ///
    /// Deltas are left undiscounted and no simulation arrays are requested.
    pub fn request<'a>(
        &'a self,
        spot: SpotFactorParams,
        settlement_rule: &'a SettlementRule,
        controls: &'a SimulationControls,
    ) -> Result<ValuationRequest<'a, S>> {
        Ok(ValuationRequest {
            storage: &self.storage,
            val_date: self.val_date,
            inventory: self.inventory,
            fwd_curve: &self.fwd_curve,
            interest_rates: &self.interest_rates,
            settlement_rule,
            model: self.model_params(spot)?,
            controls,
            discount_deltas: false,
            sim_data_returned: SimulationDataReturned::None,
        })
    }
}

impl<S: StorageTerm> CalibrationTarget<S> {
    /// Check both curves span `[val_date, storage end]`.
    pub fn validate_curve_coverage(&self) -> Result<()> {
        let end = self.storage.end_date();
        ensure_config!(
            self.fwd_curve.covers(&self.val_date, &end),
            "forward curve does not cover {} to {}",
            self.val_date,
            end
        );
        ensure_config!(
            self.interest_rates.covers(&self.val_date, &end),
            "interest rate curve does not cover {} to {}",
            self.val_date,
            end
        );
        Ok(())
    }
}
