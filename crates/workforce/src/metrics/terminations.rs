//! Terminations per period.

use crate::{
    Result, aggregate::PeriodAggregator, period::Granularity, period::PeriodSeries,
    registry::MetricCategory, roster::EmployeeRecord, traits::PeriodMetric,
};

/// Number of employees whose termination date falls in each period.
///
/// Employees without a termination date never count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminations;

impl PeriodMetric for Terminations {
    fn name(&self) -> &str {
        "terminations"
    }

    fn description(&self) -> &str {
        "Employees who left during the period"
    }

    fn category(&self) -> MetricCategory {
        MetricCategory::Flow
    }

    fn compute(
        &self,
        records: &[EmployeeRecord],
        granularity: Granularity,
    ) -> Result<PeriodSeries<f64>> {
        Ok(PeriodAggregator::new(records, granularity)
            .terminations_by_period()
            .as_f64())
    }
}
