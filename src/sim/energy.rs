//! Monthly and annual energy queries over the analysis horizon.

use super::engine::EngineOutputs;
use crate::error::{Error, Result};
use crate::lifetime::Lifetime;

pub const HOURS_PER_YEAR: usize = 8760;
pub const DAYS_PER_MONTH: [usize; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Reads degraded energy out of one execution's outputs.
///
/// In DC mode the engine's hourly series already spans every year and is
/// sliced by calendar month; in AC mode the year-1 monthly energy is scaled
/// by the year's cumulative factor.
#[derive(Debug, Clone, Copy)]
pub struct EnergyQueries<'a> {
    outputs: &'a EngineOutputs,
    lifetime: &'a Lifetime,
}

impl<'a> EnergyQueries<'a> {
    pub fn new(outputs: &'a EngineOutputs, lifetime: &'a Lifetime) -> Self {
        Self { outputs, lifetime }
    }

    pub fn years(&self) -> usize {
        self.lifetime.analysis_period()
    }

    fn check_year(&self, year: usize) -> Result<()> {
        if year == 0 || year > self.years() {
            return Err(Error::OutOfRange(format!(
                "invalid year {year}; must be in [1, {}]",
                self.years()
            )));
        }
        Ok(())
    }

    /// Energy for `month` (1-12) of `year` (1-based), kWh.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for an invalid year or month, or when the engine
    /// outputs do not cover the requested period.
    pub fn month(&self, year: usize, month: usize) -> Result<f64> {
        self.check_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(Error::OutOfRange(format!(
                "invalid month {month}; must be in [1, 12]"
            )));
        }

        if self.lifetime.uses_lifetime_output() {
            let start = (year - 1) * HOURS_PER_YEAR
                + 24 * DAYS_PER_MONTH[..month - 1].iter().sum::<usize>();
            let end = start + 24 * DAYS_PER_MONTH[month - 1];
            let slice = self.outputs.hourly_gen.get(start..end).ok_or_else(|| {
                Error::OutOfRange(format!(
                    "engine series has {} steps; year {year} month {month} needs {end}",
                    self.outputs.hourly_gen.len()
                ))
            })?;
            Ok(slice.iter().sum())
        } else {
            let monthly = self.outputs.monthly_energy.get(month - 1).ok_or_else(|| {
                Error::OutOfRange(format!(
                    "engine reported {} monthly values",
                    self.outputs.monthly_energy.len()
                ))
            })?;
            Ok(monthly * self.lifetime.ac_factors()[year - 1])
        }
    }

    /// Twelve monthly values for `year`.
    pub fn months_of_year(&self, year: usize) -> Result<Vec<f64>> {
        self.check_year(year)?;
        (1..=12).map(|month| self.month(year, month)).collect()
    }

    /// Every month of every year, year-major.
    pub fn all_months(&self) -> Result<Vec<f64>> {
        let mut all = Vec::with_capacity(12 * self.years());
        for year in 1..=self.years() {
            all.extend(self.months_of_year(year)?);
        }
        Ok(all)
    }

    /// Annual energy: the sum of the year's months.
    pub fn year(&self, year: usize) -> Result<f64> {
        Ok(self.months_of_year(year)?.iter().sum())
    }

    pub fn all_years(&self) -> Result<Vec<f64>> {
        (1..=self.years()).map(|year| self.year(year)).collect()
    }
}
