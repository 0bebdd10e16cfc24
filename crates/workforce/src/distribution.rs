//! Tenure and termination-reason distributions, and per-group breakdowns.

use crate::{
    Result, WorkforceError,
    period::{PERIOD_COLUMN, PeriodSeries, period_column},
    roster::EmployeeRecord,
};
use chrono::NaiveDate;
use derive_more::Display;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Tenure in days of every terminated employee, in roster order.
pub fn tenure_distribution(records: &[EmployeeRecord]) -> Vec<i64> {
    records
        .iter()
        .filter(|r| r.is_terminated())
        .map(|r| r.tenure_days)
        .collect()
}

/// Mean tenure in days over all records, active ones included.
pub fn average_tenure(records: &[EmployeeRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.tenure_days as f64).sum();
    Some(total / records.len() as f64)
}

/// Count of terminated employees per recorded termination reason.
pub fn termination_reason_distribution(records: &[EmployeeRecord]) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for reason in records
        .iter()
        .filter(|r| r.is_terminated())
        .filter_map(|r| r.termination_reason.as_ref())
    {
        *counts.entry(reason.clone()).or_insert(0) += 1;
    }
    counts
}

/// Summary statistics of a tenure distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TenureSummary {
    /// Number of observations
    pub count: usize,
    /// Mean tenure in days
    pub mean: f64,
    /// Median tenure in days
    pub median: f64,
    /// Shortest tenure in days
    pub min: i64,
    /// Longest tenure in days
    pub max: i64,
}

impl TenureSummary {
    /// Summarize `tenures`; `None` when empty.
    pub fn from_values(tenures: &[i64]) -> Option<Self> {
        let mut sorted = tenures.to_vec();
        sorted.sort_unstable();
        let (&min, &max) = (sorted.first()?, sorted.last()?);

        let count = sorted.len();
        let mean = sorted.iter().map(|&t| t as f64).sum::<f64>() / count as f64;
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };

        Some(Self {
            count,
            mean,
            median,
            min,
            max,
        })
    }
}

/// Hire and termination counts for one calendar month, summed over years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyActivity {
    /// Calendar month (1-12)
    pub month: u32,
    /// Hires in this month
    pub hires: u32,
    /// Terminations in this month
    pub terminations: u32,
}

/// Hires and terminations by calendar month, January first.
///
/// Always twelve rows; months without events count zero.
pub fn monthly_seasonality(records: &[EmployeeRecord]) -> Vec<MonthlyActivity> {
    let mut months: Vec<MonthlyActivity> = (1..=12)
        .map(|month| MonthlyActivity {
            month,
            hires: 0,
            terminations: 0,
        })
        .collect();

    for record in records {
        if let Some(slot) = month_index(record.hire_month) {
            months[slot].hires += 1;
        }
        if let Some(slot) = record.termination_month.and_then(month_index) {
            months[slot].terminations += 1;
        }
    }
    months
}

fn month_index(month: u32) -> Option<usize> {
    (1..=12).contains(&month).then(|| month as usize - 1)
}

/// Terminations per group value and exit month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationHeatmap {
    /// Key the roster was partitioned by
    pub key: GroupKey,
    /// Exit counts per group value, index 0 is January
    pub rows: BTreeMap<String, [u32; 12]>,
}

impl TerminationHeatmap {
    /// Exits from `group` in calendar `month` (1-12).
    pub fn get(&self, group: &str, month: u32) -> u32 {
        self.rows
            .get(group)
            .zip(month_index(month))
            .map_or(0, |(counts, slot)| counts[slot])
    }

    /// Total exits of one group.
    pub fn group_total(&self, group: &str) -> u32 {
        self.rows.get(group).map_or(0, |counts| counts.iter().sum())
    }

    /// Frame with the group column followed by one column per month `1`..`12`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new(
            self.key.to_string().into(),
            self.rows.keys().cloned().collect::<Vec<_>>(),
        )];
        for slot in 0..12 {
            let counts: Vec<u32> = self.rows.values().map(|counts| counts[slot]).collect();
            columns.push(Column::new((slot + 1).to_string().into(), counts));
        }
        Ok(DataFrame::new(columns)?)
    }
}

/// Count terminated employees by `key` and exit month.
///
/// Only groups with at least one exit appear.
pub fn termination_heatmap(records: &[EmployeeRecord], key: GroupKey) -> TerminationHeatmap {
    let mut rows: BTreeMap<String, [u32; 12]> = BTreeMap::new();
    for record in records {
        if let Some(slot) = record.termination_month.and_then(month_index) {
            rows.entry(key.value_of(record).to_string()).or_insert([0; 12])[slot] += 1;
        }
    }
    TerminationHeatmap { key, rows }
}

/// One step of a Kaplan-Meier survival curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurvivalPoint {
    /// Tenure in days
    pub tenure_days: i64,
    /// Employees still observed just before this tenure
    pub at_risk: usize,
    /// Terminations at exactly this tenure
    pub events: usize,
    /// Active employees whose observation ends at this tenure
    pub censored: usize,
    /// Probability of staying beyond this tenure
    pub survival: f64,
}

/// Kaplan-Meier estimate of staying employed as a function of tenure.
///
/// A termination is the event; active employees are censored at their
/// current tenure. There is one point per distinct tenure in ascending order.
/// An empty roster gives an empty curve.
pub fn kaplan_meier(records: &[EmployeeRecord]) -> Vec<SurvivalPoint> {
    let mut observations: Vec<(i64, bool)> = records
        .iter()
        .map(|r| (r.tenure_days, r.is_terminated()))
        .collect();
    observations.sort_unstable();

    let mut curve = Vec::new();
    let mut at_risk = observations.len();
    let mut survival = 1.0;
    for chunk in observations.chunk_by(|a, b| a.0 == b.0) {
        let events = chunk.iter().filter(|(_, terminated)| *terminated).count();
        let censored = chunk.len() - events;
        survival *= 1.0 - events as f64 / at_risk as f64;
        curve.push(SurvivalPoint {
            tenure_days: chunk[0].0,
            at_risk,
            events,
            censored,
            survival,
        });
        at_risk -= chunk.len();
    }
    curve
}

/// First tenure at which the survival estimate drops to one half or below.
pub fn median_survival(curve: &[SurvivalPoint]) -> Option<i64> {
    curve
        .iter()
        .find(|point| point.survival <= 0.5)
        .map(|point| point.tenure_days)
}

/// Categorical field used to partition the roster.
#[derive(
    Debug, Display, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// Department (`AREA`)
    #[default]
    #[display("department")]
    Department,
    /// Contract type (`TIPO_CONTRATO`)
    #[display("contract_type")]
    ContractType,
    /// Job title (`CARGO`)
    #[display("job_title")]
    JobTitle,
}

impl GroupKey {
    /// Group value of `record` under this key.
    pub fn value_of(self, record: &EmployeeRecord) -> &str {
        match self {
            Self::Department => &record.department,
            Self::ContractType => &record.contract_type,
            Self::JobTitle => record
                .job_title
                .as_deref()
                .unwrap_or(crate::preprocess::UNKNOWN_CATEGORY),
        }
    }
}

impl FromStr for GroupKey {
    type Err = WorkforceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "department" | "area" => Ok(Self::Department),
            "contract_type" | "contract" | "tipo_contrato" => Ok(Self::ContractType),
            "job_title" | "title" | "cargo" => Ok(Self::JobTitle),
            other => Err(WorkforceError::UnknownGroupKey(other.to_string())),
        }
    }
}

/// One period series per group value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBreakdown<V> {
    /// Key the roster was partitioned by
    pub key: GroupKey,
    /// Series per group value, ordered by group value
    pub groups: BTreeMap<String, PeriodSeries<V>>,
}

impl<V: Copy> GroupBreakdown<V> {
    /// Series for one group value.
    pub fn get(&self, group: &str) -> Option<&PeriodSeries<V>> {
        self.groups.get(group)
    }

    /// Group values in order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Wide frame: a `period` column over the union of all group periods and
    /// one column per group. Periods outside a group's own range are null.
    ///
    /// A group literally named `period` is written as `<key>_period`.
    pub fn to_frame(&self) -> Result<DataFrame>
    where
        Series: NamedFrom<Vec<Option<V>>, [Option<V>]>,
    {
        let periods: BTreeSet<NaiveDate> = self
            .groups
            .values()
            .flat_map(|series| series.periods())
            .collect();

        let mut columns = vec![period_column(periods.iter().copied())];
        for (group, series) in &self.groups {
            let values: Vec<Option<V>> = periods.iter().map(|p| series.get(*p)).collect();
            columns.push(Column::new(self.column_name(group).into(), values));
        }

        Ok(DataFrame::new(columns)?)
    }
}

impl<V> GroupBreakdown<V> {
    fn column_name(&self, group: &str) -> String {
        if group == PERIOD_COLUMN {
            format!("{}_{group}", self.key)
        } else {
            group.to_string()
        }
    }
}

/// Partition `records` by `key` and run `metric` on each partition.
///
/// Every partition is an independent copy of its records, so a metric sees
/// the period range of its own group only.
pub fn group_breakdown<V, F>(
    records: &[EmployeeRecord],
    key: GroupKey,
    metric: F,
) -> Result<GroupBreakdown<V>>
where
    V: Copy,
    F: Fn(&[EmployeeRecord]) -> Result<PeriodSeries<V>>,
{
    let mut partitions: BTreeMap<String, Vec<EmployeeRecord>> = BTreeMap::new();
    for record in records {
        partitions
            .entry(key.value_of(record).to_string())
            .or_default()
            .push(record.clone());
    }

    let mut groups = BTreeMap::new();
    for (group, subset) in partitions {
        let series = metric(&subset)?;
        groups.insert(group, series);
    }

    Ok(GroupBreakdown { key, groups })
}
