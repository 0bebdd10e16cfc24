//! Metric registry for discovery and bulk computation.

use crate::{
    Result, WorkforceError,
    period::{Granularity, PeriodSeries, period_column},
    rates::RateConfig,
    roster::EmployeeRecord,
    traits::{ConfigurableMetric, PeriodMetric},
};
use chrono::NaiveDate;
use derive_more::Display;
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Metric category for grouping related metrics.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    /// Flow - event counts per period
    #[display("flow")]
    Flow,
    /// Rate - percentages relative to head count
    #[display("rate")]
    Rate,
}

/// Metadata for metric introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricInfo {
    /// Metric name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Metric category
    pub category: MetricCategory,
}

/// Registry of period metrics, ordered by name.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: BTreeMap<String, Arc<dyn PeriodMetric>>,
}

impl MetricRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the standard metrics with default rate settings.
    pub fn with_defaults() -> Self {
        Self::with_rate_config(RateConfig::default())
    }

    /// Register the standard metrics, retention configured by `rates`.
    pub fn with_rate_config(rates: RateConfig) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(crate::metrics::Hires));
        registry.register(Arc::new(crate::metrics::Terminations));

        registry.register(Arc::new(crate::metrics::TurnoverRate));
        registry.register(Arc::new(crate::metrics::RetentionRate::with_config(rates)));

        registry
    }

    /// Register a metric, replacing any metric with the same name.
    pub fn register(&mut self, metric: Arc<dyn PeriodMetric>) {
        self.metrics.insert(metric.name().to_string(), metric);
    }

    /// Get a metric by name.
    pub fn get(&self, name: &str) -> Option<&dyn PeriodMetric> {
        self.metrics.get(name).map(|m| m.as_ref())
    }

    /// Get a metric by name, or a not-found error.
    pub fn require(&self, name: &str) -> Result<&dyn PeriodMetric> {
        self.get(name)
            .ok_or_else(|| WorkforceError::NotFound(name.to_string()))
    }

    /// Get metrics by category.
    pub fn by_category(&self, category: MetricCategory) -> Vec<&dyn PeriodMetric> {
        self.metrics
            .values()
            .filter(|m| m.category() == category)
            .map(|m| m.as_ref())
            .collect()
    }

    /// Get all metric metadata.
    pub fn all_info(&self) -> Vec<MetricInfo> {
        self.metrics
            .values()
            .map(|m| MetricInfo {
                name: m.name().to_string(),
                description: m.description().to_string(),
                category: m.category(),
            })
            .collect()
    }

    /// Get all metric names.
    pub fn names(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }

    /// Compute every metric into one frame.
    ///
    /// Returns a DataFrame with a `period` column and one column per metric.
    pub fn compute_all(
        &self,
        records: &[EmployeeRecord],
        granularity: Granularity,
    ) -> Result<DataFrame> {
        if self.metrics.is_empty() {
            return Err(WorkforceError::NotFound("no metrics registered".to_string()));
        }

        let mut computed: Vec<(&str, PeriodSeries<f64>)> = Vec::with_capacity(self.metrics.len());
        for (name, metric) in &self.metrics {
            computed.push((name.as_str(), metric.compute(records, granularity)?));
        }

        let periods: BTreeSet<NaiveDate> = computed
            .iter()
            .flat_map(|(_, series)| series.periods())
            .collect();

        let mut columns = vec![period_column(periods.iter().copied())];
        for (name, series) in &computed {
            let values: Vec<Option<f64>> = periods.iter().map(|p| series.get(*p)).collect();
            columns.push(Column::new((*name).into(), values));
        }

        debug!(
            metrics = computed.len(),
            periods = periods.len(),
            %granularity,
            "computed all metrics"
        );
        Ok(DataFrame::new(columns)?)
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
