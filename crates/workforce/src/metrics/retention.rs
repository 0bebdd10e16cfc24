//! Retention rate metric.

use crate::{
    Result,
    aggregate::PeriodAggregator,
    period::{Granularity, PeriodSeries},
    rates::{RateCalculator, RateConfig},
    registry::MetricCategory,
    roster::EmployeeRecord,
    traits::{ConfigurableMetric, PeriodMetric},
};

/// Retention rate per period: `100 - turnover_rate`.
///
/// Unclamped unless [`RateConfig::clamp_retention`] is set, so periods with
/// more departures than average head count report negative retention.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionRate {
    config: RateConfig,
}

impl RetentionRate {
    /// Creates a retention metric with the default (unclamped) configuration.
    pub const fn new() -> Self {
        Self {
            config: RateConfig {
                clamp_retention: false,
            },
        }
    }
}

impl PeriodMetric for RetentionRate {
    fn name(&self) -> &str {
        "retention_rate"
    }

    fn description(&self) -> &str {
        "Complement of the turnover rate, in percent"
    }

    fn category(&self) -> MetricCategory {
        MetricCategory::Rate
    }

    fn compute(
        &self,
        records: &[EmployeeRecord],
        granularity: Granularity,
    ) -> Result<PeriodSeries<f64>> {
        let agg = PeriodAggregator::new(records, granularity);
        let calc = RateCalculator::with_config(self.config);
        let turnover = calc.turnover_rate(&agg.terminations_by_period(), &agg.average_headcount());
        Ok(calc.retention_rate(&turnover))
    }
}

impl ConfigurableMetric for RetentionRate {
    type Config = RateConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
