//! Penalty weighting policy.
//!
//! Weights are normalised once per calibration run and read by every
//! objective evaluation afterwards.

use sc_core::{ensure_config, errors::Result, Diagnostics, Real};
use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Non-negative per-target weights summing to one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightVector(Vec<Real>);

impl WeightVector {
    /// `n` equal weights of `1/n`.
    pub fn equal(n: usize) -> Result<Self> {
        ensure_config!(n > 0, "cannot weight an empty target list");
        Ok(Self(vec![1.0 / n as Real; n]))
    }

    /// Number of weights.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a constructed vector.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The weights as a slice.
    pub fn as_slice(&self) -> &[Real] {
        &self.0
    }

    /// Iterator over the weights.
    pub fn iter(&self) -> impl Iterator<Item = &Real> {
        self.0.iter()
    }
}

impl Index<usize> for WeightVector {
    type Output = Real;

    fn index(&self, i: usize) -> &Real {
        &self.0[i]
    }
}

/// Normalise user weights, or default to equal weighting.
///
/// Supplied weights must have `n` finite, non-negative entries with a
/// positive sum; each is divided by the sum and the result is reported as an
/// info diagnostic.  `None` gives `n` weights of `1/n`.
pub fn normalize(
    weights: Option<&[Real]>,
    n: usize,
    diagnostics: &dyn Diagnostics,
) -> Result<WeightVector> {
    let Some(weights) = weights else {
        return WeightVector::equal(n);
    };
    ensure_config!(
        weights.len() == n,
        "expected {n} penalty weights, got {}",
        weights.len()
    );
    ensure_config!(n > 0, "cannot weight an empty target list");
    for (i, w) in weights.iter().enumerate() {
        ensure_config!(
            w.is_finite() && *w >= 0.0,
            "penalty weight {i} must be finite and non-negative, got {w}"
        );
    }
    let sum: Real = weights.iter().sum();
    ensure_config!(sum > 0.0, "penalty weights must have a positive sum, got {sum}");

    let normalized: Vec<Real> = weights.iter().map(|w| w / sum).collect();
    diagnostics.info(&format!("Normalised penalty weights: {normalized:?}"));
    Ok(WeightVector(normalized))
}
