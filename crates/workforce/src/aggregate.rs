//! Period aggregation of hires, terminations and head count.

use crate::{
    period::{Granularity, PeriodSeries},
    roster::EmployeeRecord,
};
use chrono::NaiveDate;

/// Buckets roster events into calendar periods.
///
/// The period range runs from the period holding the earliest hire or
/// termination date to the period holding the latest one. Every series the
/// aggregator produces covers exactly that range.
#[derive(Debug, Clone, Copy)]
pub struct PeriodAggregator<'a> {
    records: &'a [EmployeeRecord],
    granularity: Granularity,
}

impl<'a> PeriodAggregator<'a> {
    /// Create an aggregator over `records`.
    pub const fn new(records: &'a [EmployeeRecord], granularity: Granularity) -> Self {
        Self {
            records,
            granularity,
        }
    }

    /// Granularity of the periods.
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Earliest and latest observed event date.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let dates = self
            .records
            .iter()
            .flat_map(|r| std::iter::once(r.hire_date).chain(r.termination_date));
        dates.fold(None, |acc, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })
    }

    /// Period starts covering the observed span.
    pub fn periods(&self) -> Vec<NaiveDate> {
        self.span()
            .map(|(first, last)| self.granularity.range(first, last))
            .unwrap_or_default()
    }

    /// Number of hires per period.
    pub fn hires_by_period(&self) -> PeriodSeries<u32> {
        self.count_by_period(|r| Some(r.hire_date))
    }

    /// Number of terminations per period.
    pub fn terminations_by_period(&self) -> PeriodSeries<u32> {
        self.count_by_period(|r| r.termination_date)
    }

    fn count_by_period(
        &self,
        event: impl Fn(&EmployeeRecord) -> Option<NaiveDate>,
    ) -> PeriodSeries<u32> {
        let mut series = PeriodSeries::filled(self.granularity, &self.periods(), 0);
        for date in self.records.iter().filter_map(event) {
            if let Some(count) = series.get_mut(self.granularity.period_start(date)) {
                *count += 1;
            }
        }
        series
    }

    /// Head count as of `date`: hired on or before it and not yet terminated.
    pub fn employees_at_boundary(&self, date: NaiveDate) -> u32 {
        let count = self.records.iter().filter(|r| r.is_employed_on(date)).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Head count at the start of every period.
    pub fn employees_at_start(&self) -> PeriodSeries<u32> {
        let mut series = PeriodSeries::new(self.granularity);
        for period in self.periods() {
            series.insert(period, self.employees_at_boundary(period));
        }
        series
    }

    /// Mean of the head counts at the start and at the end of every period.
    ///
    /// A period ends where the next one starts.
    pub fn average_headcount(&self) -> PeriodSeries<f64> {
        let mut series = PeriodSeries::new(self.granularity);
        for period in self.periods() {
            let end = self.granularity.next_period_start(period);
            let at_start = f64::from(self.employees_at_boundary(period));
            let at_end = f64::from(self.employees_at_boundary(end));
            series.insert(period, (at_start + at_end) / 2.0);
        }
        series
    }
}
