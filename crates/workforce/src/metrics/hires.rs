//! Hires per period.

use crate::{
    Result, aggregate::PeriodAggregator, period::Granularity, period::PeriodSeries,
    registry::MetricCategory, roster::EmployeeRecord, traits::PeriodMetric,
};

/// Number of employees whose hire date falls in each period.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hires;

impl PeriodMetric for Hires {
    fn name(&self) -> &str {
        "hires"
    }

    fn description(&self) -> &str {
        "Employees hired during the period"
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
            .hires_by_period()
            .as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::record;
    use chrono::NaiveDate;

    #[test]
    fn test_hires_metadata() {
        let metric = Hires;
        assert_eq!(metric.name(), "hires");
        assert_eq!(metric.category(), MetricCategory::Flow);
    }

    #[test]
    fn test_hires_by_quarter() {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = vec![
            record("1", "2022-01-15", None, "A", as_of),
            record("2", "2022-03-31", None, "A", as_of),
            record("3", "2022-07-01", None, "A", as_of),
        ];
        let series = Hires.compute(&records, Granularity::Quarter).unwrap();
        assert_eq!(series.values().collect::<Vec<_>>(), vec![2.0, 0.0, 1.0]);
    }
}
