//! Calendar periods and period-indexed series.
//!
//! Every aggregate in the pipeline is keyed by the first day of a calendar
//! period. A [`PeriodSeries`] always covers a contiguous range: periods with no
//! events are present with a zero value.

use crate::{Result, WorkforceError};
use chrono::{Datelike, Days, Months, NaiveDate};
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Date format used for period keys in frames and reports.
pub const PERIOD_FORMAT: &str = "%Y-%m-%d";

/// Name of the period column in every frame produced by this crate.
pub const PERIOD_COLUMN: &str = "period";

/// Calendar bucket size used for aggregation.
#[derive(
    Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Calendar months
    #[default]
    #[display("month")]
    Month,
    /// Calendar quarters starting in January, April, July and October
    #[display("quarter")]
    Quarter,
    /// Calendar years
    #[display("year")]
    Year,
}

impl Granularity {
    /// Number of calendar months spanned by one period.
    pub const fn months(self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Quarter => 3,
            Self::Year => 12,
        }
    }

    /// First day of the period containing `date`.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        let first_of_month = date - Days::new(u64::from(date.day0()));
        let months_into_period = date.month0() % self.months();
        first_of_month - Months::new(months_into_period)
    }

    /// First day of the period following the one starting at `start`.
    pub fn next_period_start(self, start: NaiveDate) -> NaiveDate {
        self.period_start(start) + Months::new(self.months())
    }

    /// All period starts from the period containing `first` through the one
    /// containing `last`, inclusive. Empty when `last < first`.
    pub fn range(self, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
        let end = self.period_start(last);
        let mut current = self.period_start(first);
        let mut periods = Vec::new();
        while current <= end {
            periods.push(current);
            current = self.next_period_start(current);
        }
        periods
    }
}

impl FromStr for Granularity {
    type Err = WorkforceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "month" | "monthly" => Ok(Self::Month),
            "q" | "quarter" | "quarterly" => Ok(Self::Quarter),
            "y" | "a" | "year" | "yearly" | "annual" => Ok(Self::Year),
            other => Err(WorkforceError::UnknownGranularity(other.to_string())),
        }
    }
}

/// Ordered mapping from period start to a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSeries<V> {
    granularity: Granularity,
    points: BTreeMap<NaiveDate, V>,
}

impl<V: Copy> PeriodSeries<V> {
    /// Create an empty series.
    pub const fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            points: BTreeMap::new(),
        }
    }

    /// Create a series with `fill` at every period in `periods`.
    pub fn filled(granularity: Granularity, periods: &[NaiveDate], fill: V) -> Self {
        Self {
            granularity,
            points: periods.iter().map(|p| (*p, fill)).collect(),
        }
    }

    /// Granularity of the periods in this series.
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Set the value for the period starting at `period`.
    pub fn insert(&mut self, period: NaiveDate, value: V) {
        self.points.insert(period, value);
    }

    /// Value at the period starting at `period`.
    pub fn get(&self, period: NaiveDate) -> Option<V> {
        self.points.get(&period).copied()
    }

    /// Mutable access to the value at `period`.
    pub fn get_mut(&mut self, period: NaiveDate) -> Option<&mut V> {
        self.points.get_mut(&period)
    }

    /// Value for the period containing `date`.
    pub fn at_date(&self, date: NaiveDate) -> Option<V> {
        self.get(self.granularity.period_start(date))
    }

    /// Iterate `(period_start, value)` in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, V)> + '_ {
        self.points.iter().map(|(p, v)| (*p, *v))
    }

    /// Period starts in chronological order.
    pub fn periods(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.keys().copied()
    }

    /// Values in chronological order.
    pub fn values(&self) -> impl Iterator<Item = V> + '_ {
        self.points.values().copied()
    }

    /// Last `(period_start, value)` pair.
    pub fn last(&self) -> Option<(NaiveDate, V)> {
        self.points.iter().next_back().map(|(p, v)| (*p, *v))
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no periods.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Apply `f` to every value, keeping the period index.
    pub fn map<U: Copy>(&self, mut f: impl FnMut(V) -> U) -> PeriodSeries<U> {
        PeriodSeries {
            granularity: self.granularity,
            points: self.points.iter().map(|(p, v)| (*p, f(*v))).collect(),
        }
    }

    /// Convert into a two-column frame: `period` and `value_column`.
    pub fn to_frame(&self, value_column: &str) -> Result<DataFrame>
    where
        Series: NamedFrom<Vec<V>, [V]>,
    {
        let values: Vec<V> = self.values().collect();
        let frame = DataFrame::new(vec![
            period_column(self.periods()),
            Column::new(value_column.into(), values),
        ])?;
        Ok(frame)
    }
}

impl PeriodSeries<u32> {
    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.values().map(u64::from).sum()
    }

    /// Counts widened to floating point.
    pub fn as_f64(&self) -> PeriodSeries<f64> {
        self.map(f64::from)
    }
}

/// Render a period start the way it appears in frames and reports.
pub fn format_period(period: NaiveDate) -> String {
    period.format(PERIOD_FORMAT).to_string()
}

/// The `period` key column for a run of period starts.
pub(crate) fn period_column(periods: impl IntoIterator<Item = NaiveDate>) -> Column {
    let labels: Vec<String> = periods.into_iter().map(format_period).collect();
    Column::new(PERIOD_COLUMN.into(), labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(Granularity::Month, date(2022, 2, 20), date(2022, 2, 1))]
    #[case(Granularity::Month, date(2022, 12, 31), date(2022, 12, 1))]
    #[case(Granularity::Quarter, date(2022, 2, 20), date(2022, 1, 1))]
    #[case(Granularity::Quarter, date(2022, 6, 30), date(2022, 4, 1))]
    #[case(Granularity::Quarter, date(2022, 12, 1), date(2022, 10, 1))]
    #[case(Granularity::Year, date(2022, 8, 15), date(2022, 1, 1))]
    fn test_period_start(
        #[case] granularity: Granularity,
        #[case] input: NaiveDate,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(granularity.period_start(input), expected);
    }

    #[test]
    fn test_next_period_start_crosses_year() {
        assert_eq!(
            Granularity::Month.next_period_start(date(2022, 12, 1)),
            date(2023, 1, 1)
        );
        assert_eq!(
            Granularity::Quarter.next_period_start(date(2022, 10, 1)),
            date(2023, 1, 1)
        );
        assert_eq!(
            Granularity::Year.next_period_start(date(2022, 1, 1)),
            date(2023, 1, 1)
        );
    }

    #[test]
    fn test_range_is_contiguous_and_inclusive() {
        let periods = Granularity::Month.range(date(2022, 1, 15), date(2022, 4, 2));
        assert_eq!(
            periods,
            vec![
                date(2022, 1, 1),
                date(2022, 2, 1),
                date(2022, 3, 1),
                date(2022, 4, 1)
            ]
        );

        let quarters = Granularity::Quarter.range(date(2022, 2, 1), date(2023, 1, 10));
        assert_eq!(quarters.len(), 5);

        assert!(Granularity::Year.range(date(2023, 1, 1), date(2022, 1, 1)).is_empty());
    }

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("M".parse::<Granularity>().unwrap(), Granularity::Month);
        assert_eq!("quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert_eq!(" Y ".parse::<Granularity>().unwrap(), Granularity::Year);
        assert!("week".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Quarter.to_string(), "quarter");
    }

    #[test]
    fn test_series_to_frame() {
        let periods = Granularity::Month.range(date(2022, 1, 1), date(2022, 3, 1));
        let mut series = PeriodSeries::filled(Granularity::Month, &periods, 0u32);
        series.insert(date(2022, 2, 1), 4);

        assert_eq!(series.total(), 4);
        assert_eq!(series.at_date(date(2022, 2, 17)), Some(4));

        let frame = series.to_frame("hires").unwrap();
        assert_eq!(frame.height(), 3);
        let labels = frame.column(PERIOD_COLUMN).unwrap().str().unwrap();
        assert_eq!(labels.get(1), Some("2022-02-01"));
        let counts = frame.column("hires").unwrap().u32().unwrap();
        assert_eq!(counts.get(1), Some(4));
    }
}
