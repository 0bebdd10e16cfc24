//! Core trait definitions for period metrics.
//!
//! Every metric implements [`PeriodMetric`], which turns a set of processed
//! records into one value per calendar period.

use crate::{
    Result, period::Granularity, period::PeriodSeries, registry::MetricCategory,
    roster::EmployeeRecord,
};
use polars::prelude::*;

/// A metric computed per calendar period from processed records.
///
/// Implementations are pure: the same records and granularity always yield
/// the same series, covering the aggregator's full period range.
pub trait PeriodMetric: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this metric.
    ///
    /// Should be snake_case and stable across versions.
    fn name(&self) -> &str;

    /// Human-readable description of what this metric measures.
    fn description(&self) -> &str;

    /// Metric category for grouping.
    fn category(&self) -> MetricCategory;

    /// Compute the metric for every period.
    fn compute(
        &self,
        records: &[EmployeeRecord],
        granularity: Granularity,
    ) -> Result<PeriodSeries<f64>>;

    /// Compute the metric as a frame with `period` and the metric name.
    fn compute_frame(
        &self,
        records: &[EmployeeRecord],
        granularity: Granularity,
    ) -> Result<DataFrame> {
        self.compute(records, granularity)?.to_frame(self.name())
    }
}

/// Marker trait for metric configuration types.
pub trait MetricConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// A metric that supports runtime configuration.
pub trait ConfigurableMetric: PeriodMetric {
    /// Configuration type for this metric.
    type Config: MetricConfig;

    /// Create a new metric with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}

impl<T: Default + Clone + Send + Sync + std::fmt::Debug> MetricConfig for T {}
