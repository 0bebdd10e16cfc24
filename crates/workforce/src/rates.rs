//! Turnover and retention rates.
//!
//! ```text
//! turnover_rate[p]  = terminations[p] / max(avg_headcount[p], 1) * 100
//! retention_rate[p] = 100 - turnover_rate[p]
//! ```
//!
//! The denominator is floored at one head so periods without population
//! still produce a finite rate.

use crate::period::PeriodSeries;
use serde::{Deserialize, Serialize};

/// Smallest average head count used as a denominator.
pub const MIN_HEADCOUNT: f64 = 1.0;

/// Configuration for [`RateCalculator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Clamp retention into `[0, 100]`.
    ///
    /// Off by default: turnover above 100% yields negative retention.
    pub clamp_retention: bool,
}

/// Derives per-period rates from aggregated counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateCalculator {
    config: RateConfig,
}

impl RateCalculator {
    /// Create a calculator with the default (unclamped) configuration.
    pub const fn new() -> Self {
        Self {
            config: RateConfig {
                clamp_retention: false,
            },
        }
    }

    /// Create a calculator with a custom configuration.
    pub const fn with_config(config: RateConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &RateConfig {
        &self.config
    }

    /// Turnover rate in percent for every period of `avg_headcount`.
    ///
    /// Periods missing from `terminations` count as zero terminations.
    pub fn turnover_rate(
        &self,
        terminations: &PeriodSeries<u32>,
        avg_headcount: &PeriodSeries<f64>,
    ) -> PeriodSeries<f64> {
        let mut rates = PeriodSeries::new(avg_headcount.granularity());
        for (period, headcount) in avg_headcount.iter() {
            let leavers = f64::from(terminations.get(period).unwrap_or(0));
            let rate = leavers / headcount.max(MIN_HEADCOUNT) * 100.0;
            rates.insert(period, finite_or_zero(rate));
        }
        rates
    }

    /// Retention rate in percent: the complement of turnover.
    pub fn retention_rate(&self, turnover: &PeriodSeries<f64>) -> PeriodSeries<f64> {
        turnover.map(|rate| {
            let retention = finite_or_zero(100.0 - rate);
            if self.config.clamp_retention {
                retention.clamp(0.0, 100.0)
            } else {
                retention
            }
        })
    }
}

const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
