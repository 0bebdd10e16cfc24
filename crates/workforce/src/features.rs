//! Lag-feature table and company-status labelling.
//!
//! Each row describes one period: its raw counts, turnover rate, head count
//! at the start, and the hires/terminations of the three preceding periods.
//! The first [`LAG_DEPTH`] periods have no complete history and are dropped.

use crate::{
    Result, WorkforceError,
    aggregate::PeriodAggregator,
    period::{Granularity, PERIOD_COLUMN, format_period},
    rates::RateCalculator,
    roster::EmployeeRecord,
};
use chrono::NaiveDate;
use derive_more::Display;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Number of lagged periods carried by every row.
pub const LAG_DEPTH: usize = 3;

/// Number of model input features per row.
pub const FEATURE_COUNT: usize = 4 + 2 * LAG_DEPTH;

/// Model input columns, in the order of [`FeatureRow::features`].
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "hires",
    "terminations",
    "turnover_rate",
    "employees_at_start",
    "hires_lag_1",
    "terminations_lag_1",
    "hires_lag_2",
    "terminations_lag_2",
    "hires_lag_3",
    "terminations_lag_3",
];

/// Label column of the feature frame.
pub const STATUS_COLUMN: &str = "status";

/// Coarse organizational state of a period.
#[derive(
    Debug,
    Display,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    /// Hiring clearly outpaces departures
    #[display("expansion")]
    Expansion,
    /// Departures clearly outpace hiring
    #[display("contraction")]
    Contraction,
    /// Balanced flows but with a notable departure ratio
    #[display("at_risk")]
    AtRisk,
    /// Balanced flows with few departures
    #[display("stable")]
    Stable,
}

impl CompanyStatus {
    /// Every status, in label order.
    pub const ALL: [Self; 4] = [Self::Expansion, Self::Contraction, Self::AtRisk, Self::Stable];
}

impl FromStr for CompanyStatus {
    type Err = WorkforceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.to_string() == s.trim())
            .ok_or_else(|| WorkforceError::Model(format!("unknown status label: {s}")))
    }
}

/// Thresholds of the status rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    /// One flow must exceed the other by this factor to count as expansion
    /// or contraction
    pub growth_multiplier: f64,
    /// `terminations / (hires + 1)` above this marks a balanced period at risk
    pub risk_ratio: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            growth_multiplier: 1.05,
            risk_ratio: 0.05,
        }
    }
}

impl StatusThresholds {
    /// Label a period from its hires and terminations.
    ///
    /// Expansion and contraction are checked before the risk ratio, so a
    /// period is only at risk when neither fired.
    pub fn classify(&self, hires: f64, terminations: f64) -> CompanyStatus {
        if hires > terminations * self.growth_multiplier {
            CompanyStatus::Expansion
        } else if terminations > hires * self.growth_multiplier {
            CompanyStatus::Contraction
        } else if terminations / (hires + 1.0) > self.risk_ratio {
            CompanyStatus::AtRisk
        } else {
            CompanyStatus::Stable
        }
    }
}

/// One period of model input plus its label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    /// Period start
    pub period: NaiveDate,
    /// Hires in the period
    pub hires: u32,
    /// Terminations in the period
    pub terminations: u32,
    /// Turnover rate in percent
    pub turnover_rate: f64,
    /// Head count on the first day of the period
    pub employees_at_start: u32,
    /// Hires of periods t-1, t-2, t-3
    pub hires_lag: [u32; LAG_DEPTH],
    /// Terminations of periods t-1, t-2, t-3
    pub terminations_lag: [u32; LAG_DEPTH],
    /// Status label
    pub status: CompanyStatus,
}

impl FeatureRow {
    /// Model inputs in [`FEATURE_COLUMNS`] order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        out[0] = f64::from(self.hires);
        out[1] = f64::from(self.terminations);
        out[2] = self.turnover_rate;
        out[3] = f64::from(self.employees_at_start);
        for lag in 0..LAG_DEPTH {
            out[4 + 2 * lag] = f64::from(self.hires_lag[lag]);
            out[5 + 2 * lag] = f64::from(self.terminations_lag[lag]);
        }
        out
    }
}

/// Feature rows in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTable {
    /// Granularity the rows were built at
    pub granularity: Granularity,
    /// Rows with a complete lag history
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent row.
    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Model inputs, one row per period.
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut matrix = Array2::zeros((self.rows.len(), FEATURE_COUNT));
        for (mut out, row) in matrix.outer_iter_mut().zip(&self.rows) {
            for (cell, value) in out.iter_mut().zip(row.features()) {
                *cell = value;
            }
        }
        matrix
    }

    /// Labels, one per row.
    pub fn labels(&self) -> Vec<CompanyStatus> {
        self.rows.iter().map(|r| r.status).collect()
    }

    /// Frame with `period`, every feature column and `status`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let rows = &self.rows;
        let mut columns = vec![
            Column::new(
                PERIOD_COLUMN.into(),
                rows.iter().map(|r| format_period(r.period)).collect::<Vec<_>>(),
            ),
            Column::new(
                FEATURE_COLUMNS[0].into(),
                rows.iter().map(|r| r.hires).collect::<Vec<_>>(),
            ),
            Column::new(
                FEATURE_COLUMNS[1].into(),
                rows.iter().map(|r| r.terminations).collect::<Vec<_>>(),
            ),
            Column::new(
                FEATURE_COLUMNS[2].into(),
                rows.iter().map(|r| r.turnover_rate).collect::<Vec<_>>(),
            ),
            Column::new(
                FEATURE_COLUMNS[3].into(),
                rows.iter().map(|r| r.employees_at_start).collect::<Vec<_>>(),
            ),
        ];
        for k in 0..LAG_DEPTH {
            columns.push(Column::new(
                FEATURE_COLUMNS[4 + 2 * k].into(),
                rows.iter().map(|r| r.hires_lag[k]).collect::<Vec<_>>(),
            ));
            columns.push(Column::new(
                FEATURE_COLUMNS[5 + 2 * k].into(),
                rows.iter().map(|r| r.terminations_lag[k]).collect::<Vec<_>>(),
            ));
        }
        columns.push(Column::new(
            STATUS_COLUMN.into(),
            rows.iter().map(|r| r.status.to_string()).collect::<Vec<_>>(),
        ));

        Ok(DataFrame::new(columns)?)
    }
}

/// Configuration for [`FeatureBuilder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Period size
    pub granularity: Granularity,
    /// Status rule thresholds
    pub thresholds: StatusThresholds,
}

/// Builds the [`FeatureTable`] from processed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
    rates: RateCalculator,
}

impl FeatureBuilder {
    /// Create a builder with default thresholds.
    pub fn new(granularity: Granularity) -> Self {
        Self::with_config(FeatureConfig {
            granularity,
            ..Default::default()
        })
    }

    /// Create a builder with a custom configuration.
    pub const fn with_config(config: FeatureConfig) -> Self {
        Self {
            config,
            rates: RateCalculator::new(),
        }
    }

    /// Active configuration.
    pub const fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Build the table. Fewer than `LAG_DEPTH + 1` periods yield no rows.
    pub fn build(&self, records: &[EmployeeRecord]) -> FeatureTable {
        let granularity = self.config.granularity;
        let agg = PeriodAggregator::new(records, granularity);

        let hires: Vec<u32> = agg.hires_by_period().values().collect();
        let terminations_series = agg.terminations_by_period();
        let terminations: Vec<u32> = terminations_series.values().collect();
        let turnover: Vec<f64> = self
            .rates
            .turnover_rate(&terminations_series, &agg.average_headcount())
            .values()
            .collect();
        let at_start = agg.employees_at_start();

        let rows: Vec<FeatureRow> = at_start
            .iter()
            .enumerate()
            .skip(LAG_DEPTH)
            .map(|(i, (period, employees_at_start))| {
                let hires_lag = std::array::from_fn(|k| hires[i - k - 1]);
                let terminations_lag = std::array::from_fn(|k| terminations[i - k - 1]);
                FeatureRow {
                    period,
                    hires: hires[i],
                    terminations: terminations[i],
                    turnover_rate: turnover[i],
                    employees_at_start,
                    hires_lag,
                    terminations_lag,
                    status: self
                        .config
                        .thresholds
                        .classify(f64::from(hires[i]), f64::from(terminations[i])),
                }
            })
            .collect();

        debug!(
            granularity = %granularity,
            periods = hires.len(),
            rows = rows.len(),
            "built feature table"
        );
        FeatureTable { granularity, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::record;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Six months of activity, January through June 2022.
    fn roster() -> Vec<EmployeeRecord> {
        vec![
            record("1", "2022-01-05", None, "A", as_of()),
            record("2", "2022-01-20", Some("2022-04-15"), "A", as_of()),
            record("3", "2022-02-10", None, "A", as_of()),
            record("4", "2022-03-01", Some("2022-05-01"), "A", as_of()),
            record("5", "2022-04-01", None, "A", as_of()),
            record("6", "2022-04-02", None, "A", as_of()),
            record("7", "2022-05-15", Some("2022-06-30"), "B", as_of()),
        ]
    }

    #[rstest]
    #[case(100.0, 50.0, CompanyStatus::Expansion)]
    #[case(50.0, 100.0, CompanyStatus::Contraction)]
    #[case(100.0, 104.0, CompanyStatus::AtRisk)]
    #[case(100.0, 100.0, CompanyStatus::AtRisk)]
    #[case(100.0, 106.0, CompanyStatus::Contraction)]
    #[case(0.0, 0.0, CompanyStatus::Stable)]
    #[case(1.0, 0.0, CompanyStatus::Expansion)]
    fn test_default_status_rule(
        #[case] hires: f64,
        #[case] terminations: f64,
        #[case] expected: CompanyStatus,
    ) {
        assert_eq!(StatusThresholds::default().classify(hires, terminations), expected);
    }

    #[test]
    fn test_status_rule_with_loose_risk_ratio() {
        let thresholds = StatusThresholds {
            growth_multiplier: 1.05,
            risk_ratio: 2.0,
        };
        assert_eq!(thresholds.classify(100.0, 100.0), CompanyStatus::Stable);
        assert_eq!(thresholds.classify(100.0, 104.0), CompanyStatus::Stable);
    }

    #[test]
    fn test_status_labels_round_trip_through_text() {
        assert_eq!(CompanyStatus::AtRisk.to_string(), "at_risk");
        assert_eq!("stable".parse::<CompanyStatus>().unwrap(), CompanyStatus::Stable);
        assert!("booming".parse::<CompanyStatus>().is_err());
    }

    #[test]
    fn test_first_three_periods_are_dropped() {
        let records = roster();
        let table = FeatureBuilder::new(Granularity::Month).build(&records);

        assert_eq!(table.len(), 3);
        let periods: Vec<NaiveDate> = table.rows.iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![date(2022, 4, 1), date(2022, 5, 1), date(2022, 6, 1)]);
    }

    #[test]
    fn test_lag_values_and_counts() {
        let records = roster();
        let table = FeatureBuilder::new(Granularity::Month).build(&records);

        // Monthly hires Jan..Jun: 2, 1, 1, 2, 1, 0; terminations: 0, 0, 0, 1, 1, 1.
        let april = &table.rows[0];
        assert_eq!(april.hires, 2);
        assert_eq!(april.terminations, 1);
        assert_eq!(april.hires_lag, [1, 1, 2]);
        assert_eq!(april.terminations_lag, [0, 0, 0]);
        assert_eq!(april.employees_at_start, 5);
        assert_eq!(april.status, CompanyStatus::Expansion);

        let june = &table.rows[2];
        assert_eq!(june.hires, 0);
        assert_eq!(june.terminations, 1);
        assert_eq!(june.hires_lag, [1, 2, 1]);
        assert_eq!(june.terminations_lag, [1, 1, 0]);
        assert_eq!(june.status, CompanyStatus::Contraction);
    }

    #[test]
    fn test_turnover_matches_rate_calculator() {
        let records = roster();
        let table = FeatureBuilder::new(Granularity::Month).build(&records);

        // April: 5 employed on Apr 1, 4 on May 1 -> avg 4.5.
        assert_relative_eq!(table.rows[0].turnover_rate, 1.0 / 4.5 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_range_yields_empty_table() {
        let records = vec![
            record("1", "2022-01-05", None, "A", as_of()),
            record("2", "2022-03-20", Some("2022-03-25"), "A", as_of()),
        ];
        let table = FeatureBuilder::new(Granularity::Month).build(&records);
        assert!(table.is_empty());
        assert_eq!(table.feature_matrix().nrows(), 0);

        assert!(FeatureBuilder::new(Granularity::Year).build(&[]).is_empty());
    }

    #[test]
    fn test_feature_matrix_and_frame() {
        let records = roster();
        let table = FeatureBuilder::new(Granularity::Month).build(&records);

        let matrix = table.feature_matrix();
        assert_eq!(matrix.dim(), (3, FEATURE_COUNT));
        assert_relative_eq!(matrix[[0, 0]], 2.0);
        assert_relative_eq!(matrix[[0, 4]], 1.0);
        assert_relative_eq!(matrix[[0, 9]], 0.0);

        let frame = table.to_frame().unwrap();
        assert_eq!(frame.width(), FEATURE_COUNT + 2);
        assert_eq!(frame.height(), 3);
        let status = frame.column(STATUS_COLUMN).unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("expansion"));
        let lag3 = frame.column("hires_lag_3").unwrap().u32().unwrap();
        assert_eq!(lag3.get(0), Some(2));
    }
}
