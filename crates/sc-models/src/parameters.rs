//! Seasonal three-factor spot model parameters.
//!
//! ```text
//! dS/S = σ_s e^{-α(T-t)} dz_s + σ_lt dz_lt + σ_sw [cos 2πt dz_sw^c + sin 2πt dz_sw^s]
//! ```
//!
//! Only the short-term factor `(σ_s, α)` is calibrated; the long-term and
//! seasonal volatilities are fixed per target.

use sc_core::{ensure, ensure_config, errors::Error, errors::Result, fail, Real, Volatility};
use sc_math::{Array, Bounds};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The calibrated pair `(spot_factor_vol, spot_factor_mean_reversion_rate)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotFactorParams {
    /// Short-term factor volatility σ_s.
    pub vol: Volatility,
    /// Short-term factor mean-reversion rate α.
    pub mean_reversion: Real,
}

impl SpotFactorParams {
    /// Number of free parameters.
    pub const DIMENSION: usize = 2;

    /// Create a parameter pair.
    pub fn new(vol: Volatility, mean_reversion: Real) -> Self {
        Self {
            vol,
            mean_reversion,
        }
    }

    /// Pack into an optimizer vector `[vol, mean_reversion]`.
    pub fn to_array(self) -> Array {
        Array::from_slice(&[self.vol, self.mean_reversion])
    }

    /// Unpack an optimizer vector.
    pub fn from_array(x: &Array) -> Result<Self> {
        if x.size() != Self::DIMENSION {
            fail!(
                "spot factor parameters need {} values, got {}",
                Self::DIMENSION,
                x.size()
            );
        }
        Ok(Self::new(x[0], x[1]))
    }
}

impl fmt::Display for SpotFactorParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spot_factor_vol={}, spot_factor_mean_reversion={}",
            self.vol, self.mean_reversion
        )
    }
}

/// Search box for [`SpotFactorParams`].
///
/// Both parameters must stay non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpotFactorBounds {
    vol: (Real, Real),
    mean_reversion: (Real, Real),
}

impl SpotFactorBounds {
    /// Create bounds from `(low, high)` pairs for vol and mean reversion.
    pub fn new(vol: (Real, Real), mean_reversion: (Real, Real)) -> Result<Self> {
        check_pair("spot_factor_vol", vol)?;
        check_pair("spot_factor_mean_reversion", mean_reversion)?;
        Ok(Self {
            vol,
            mean_reversion,
        })
    }

    /// `(low, high)` for the volatility.
    pub fn vol(&self) -> (Real, Real) {
        self.vol
    }

    /// `(low, high)` for the mean-reversion rate.
    pub fn mean_reversion(&self) -> (Real, Real) {
        self.mean_reversion
    }

    /// Whether `params` lies inside the box.
    pub fn contains(&self, params: &SpotFactorParams) -> bool {
        (self.vol.0..=self.vol.1).contains(&params.vol)
            && (self.mean_reversion.0..=self.mean_reversion.1).contains(&params.mean_reversion)
    }

    /// Centre of the box.
    pub fn center(&self) -> SpotFactorParams {
        SpotFactorParams::new(
            0.5 * (self.vol.0 + self.vol.1),
            0.5 * (self.mean_reversion.0 + self.mean_reversion.1),
        )
    }

    /// Optimizer box in `[vol, mean_reversion]` order.
    pub fn to_bounds(&self) -> Result<Bounds> {
        Bounds::new(
            vec![self.vol.0, self.mean_reversion.0],
            vec![self.vol.1, self.mean_reversion.1],
        )
    }
}

impl TryFrom<((Real, Real), (Real, Real))> for SpotFactorBounds {
    type Error = Error;

    fn try_from((vol, mean_reversion): ((Real, Real), (Real, Real))) -> Result<Self> {
        Self::new(vol, mean_reversion)
    }
}

impl TryFrom<&Bounds> for SpotFactorBounds {
    type Error = Error;

    fn try_from(bounds: &Bounds) -> Result<Self> {
        ensure_config!(
            bounds.dimension() == SpotFactorParams::DIMENSION,
            "spot factor bounds need {} dimensions, got {}",
            SpotFactorParams::DIMENSION,
            bounds.dimension()
        );
        Self::new(
            (bounds.lower()[0], bounds.upper()[0]),
            (bounds.lower()[1], bounds.upper()[1]),
        )
    }
}

fn check_pair(name: &str, (lo, hi): (Real, Real)) -> Result<()> {
    ensure_config!(
        lo.is_finite() && hi.is_finite(),
        "{name} bounds must be finite, got ({lo}, {hi})"
    );
    ensure_config!(lo <= hi, "{name} lower bound {lo} exceeds upper bound {hi}");
    ensure_config!(lo >= 0.0, "{name} lower bound must be non-negative, got {lo}");
    Ok(())
}

/// Full parameter set handed to the valuation engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThreeFactorSeasonalParams {
    spot_mean_reversion: Real,
    spot_vol: Volatility,
    long_term_vol: Volatility,
    seasonal_vol: Volatility,
}

impl ThreeFactorSeasonalParams {
    /// Combine a trial spot factor with fixed long-term and seasonal vols.
    pub fn new(
        spot: SpotFactorParams,
        long_term_vol: Volatility,
        seasonal_vol: Volatility,
    ) -> Result<Self> {
        for (name, v) in [
            ("spot_vol", spot.vol),
            ("spot_mean_reversion", spot.mean_reversion),
            ("long_term_vol", long_term_vol),
            ("seasonal_vol", seasonal_vol),
        ] {
            ensure!(
                v.is_finite() && v >= 0.0,
                "{name} must be finite and non-negative, got {v}"
            );
        }
        Ok(Self {
            spot_mean_reversion: spot.mean_reversion,
            spot_vol: spot.vol,
            long_term_vol,
            seasonal_vol,
        })
    }

    /// Short-term factor mean-reversion rate.
    pub fn spot_mean_reversion(&self) -> Real {
        self.spot_mean_reversion
    }

    /// Short-term factor volatility.
    pub fn spot_vol(&self) -> Volatility {
        self.spot_vol
    }

    /// Long-term (random walk) factor volatility.
    pub fn long_term_vol(&self) -> Volatility {
        self.long_term_vol
    }

    /// Seasonal factor volatility.
    pub fn seasonal_vol(&self) -> Volatility {
        self.seasonal_vol
    }

    /// The calibrated part.
    pub fn spot_factor(&self) -> SpotFactorParams {
        SpotFactorParams::new(self.spot_vol, self.spot_mean_reversion)
    }
}
