//! Multi-year production degradation.
//!
//! Two mutually exclusive modes are supported. In AC mode the engine runs a
//! single physical year and later years are derived by scaling the year-1
//! outputs with a cumulative factor. In DC mode the per-year fractions are
//! handed to the engine, which re-simulates every year itself.

use crate::error::{Error, Result};
use crate::sim::params::ParamGroup;

/// Degradation mode, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationMode {
    /// Post-scale year-1 outputs; `compounding` applies each fraction to the
    /// running factor instead of the nameplate.
    Ac { compounding: bool },
    /// Let the engine degrade DC inputs and re-simulate each year.
    Dc,
}

impl Default for DegradationMode {
    fn default() -> Self {
        Self::Ac { compounding: false }
    }
}

/// Per-year degradation schedule over the analysis horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct Lifetime {
    analysis_period: usize,
    mode: DegradationMode,
    ac_factors: Vec<f64>,
    dc_degradation: Vec<f64>,
}

impl Lifetime {
    /// Builds the schedule for `years` from one degradation fraction per year.
    ///
    /// The first fraction is ignored in AC mode: year 1 is always at full
    /// production.
    ///
    /// # Errors
    ///
    /// * `InvalidRequest` if `years` is zero
    /// * `LengthMismatch` if `fractions.len() != years`
    /// * `FullyDegraded` if a cumulative AC factor would reach zero
    pub fn new(years: usize, fractions: &[f64], mode: DegradationMode) -> Result<Self> {
        if years < 1 {
            return Err(Error::InvalidRequest(
                "analysis period must be at least 1 year".to_string(),
            ));
        }
        if fractions.len() != years {
            return Err(Error::LengthMismatch {
                expected: years,
                actual: fractions.len(),
            });
        }

        match mode {
            DegradationMode::Ac { compounding } => Ok(Self {
                analysis_period: years,
                mode,
                ac_factors: ac_factors(fractions, compounding)?,
                dc_degradation: vec![0.0; years],
            }),
            DegradationMode::Dc => Ok(Self {
                analysis_period: years,
                mode,
                ac_factors: vec![1.0; years],
                dc_degradation: fractions.to_vec(),
            }),
        }
    }

    /// Constant yearly fraction for every year of the horizon.
    pub fn uniform_fractions(years: usize, fraction: f64) -> Vec<f64> {
        vec![fraction; years]
    }

    pub fn analysis_period(&self) -> usize {
        self.analysis_period
    }

    pub fn mode(&self) -> DegradationMode {
        self.mode
    }

    /// True when the engine itself simulates every year.
    pub fn uses_lifetime_output(&self) -> bool {
        self.mode == DegradationMode::Dc
    }

    /// Cumulative scale factors, one per year, starting at 1.0.
    ///
    /// All ones in DC mode.
    pub fn ac_factors(&self) -> &[f64] {
        &self.ac_factors
    }

    /// Per-year DC degradation input. All zeros in AC mode.
    pub fn dc_degradation(&self) -> &[f64] {
        &self.dc_degradation
    }

    /// Engine `Lifetime` group.
    pub fn to_params(&self) -> ParamGroup {
        let mut group = ParamGroup::new();
        group.insert("analysis_period", self.analysis_period as f64);
        group.insert(
            "system_use_lifetime_output",
            if self.uses_lifetime_output() { 1.0 } else { 0.0 },
        );
        group.insert("dc_degradation", self.dc_degradation.clone());
        group
    }
}

fn ac_factors(fractions: &[f64], compounding: bool) -> Result<Vec<f64>> {
    let mut value = 1.0_f64;
    let mut factors = Vec::with_capacity(fractions.len());
    factors.push(value);

    for (offset, fraction) in fractions.iter().skip(1).enumerate() {
        let reduction = if compounding { value } else { 1.0 };
        value -= reduction * fraction;
        if value <= 0.0 {
            return Err(Error::FullyDegraded { year: offset + 2 });
        }
        factors.push(value);
    }

    Ok(factors)
}
