//! Turnover rate metric.
//!
//! Terminations relative to the average head count of the period, in percent.

use crate::{
    Result,
    aggregate::PeriodAggregator,
    period::{Granularity, PeriodSeries},
    rates::RateCalculator,
    registry::MetricCategory,
    roster::EmployeeRecord,
    traits::PeriodMetric,
};

/// Turnover rate per period.
///
/// # Computation
///
/// 1. Count terminations per period
/// 2. Average the head counts at the period's start and end boundaries
/// 3. `terminations / max(average, 1) * 100`
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnoverRate;

impl PeriodMetric for TurnoverRate {
    fn name(&self) -> &str {
        "turnover_rate"
    }

    fn description(&self) -> &str {
        "Terminations as a percentage of average head count"
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
        Ok(RateCalculator::new()
            .turnover_rate(&agg.terminations_by_period(), &agg.average_headcount()))
    }
}
