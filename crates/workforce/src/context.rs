//! Per-run pipeline context and the analytics capability interface.
//!
//! A [`PipelineContext`] owns one preprocessed roster snapshot, its reference
//! date, its configuration and an optional classifier. Everything rendered
//! downstream goes through the [`WorkforceAnalytics`] trait.

use crate::{
    Result,
    aggregate::PeriodAggregator,
    classify::{Prediction, StatusClassifier, predict_latest},
    cluster::{ClusteringResult, DepartureClusterer},
    config::PipelineConfig,
    distribution::{
        self, GroupBreakdown, GroupKey, MonthlyActivity, SurvivalPoint, TenureSummary,
        TerminationHeatmap,
    },
    features::{FeatureBuilder, FeatureTable},
    period::{Granularity, PeriodSeries},
    preprocess::{DataQualityIssue, Preprocessor},
    rates::RateCalculator,
    registry::MetricRegistry,
    roster::{EmployeeRecord, RawEmployeeRow, RosterFilter},
    traits::PeriodMetric,
};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, info_span};

/// Read-only analytics over one roster snapshot.
pub trait WorkforceAnalytics {
    /// Reference date of the snapshot.
    fn as_of(&self) -> NaiveDate;

    /// Period size of every series.
    fn granularity(&self) -> Granularity;

    /// Processed records.
    fn records(&self) -> &[EmployeeRecord];

    /// Row-level findings from preprocessing.
    fn issues(&self) -> &[DataQualityIssue];

    /// Hires per period.
    fn hires_by_period(&self) -> PeriodSeries<u32>;

    /// Terminations per period.
    fn terminations_by_period(&self) -> PeriodSeries<u32>;

    /// Turnover rate per period, in percent.
    fn turnover_rate(&self) -> PeriodSeries<f64>;

    /// Retention rate per period, in percent.
    fn retention_rate(&self) -> PeriodSeries<f64>;

    /// Tenure in days of every terminated employee.
    fn tenure_distribution(&self) -> Vec<i64>;

    /// Terminated employees per termination reason.
    fn termination_reasons(&self) -> BTreeMap<String, u32>;

    /// `metric` computed separately for each value of `key`.
    fn group_breakdown(
        &self,
        key: GroupKey,
        metric: &dyn PeriodMetric,
    ) -> Result<GroupBreakdown<f64>>;

    /// Hires and terminations by calendar month.
    fn seasonality(&self) -> Vec<MonthlyActivity>;

    /// Terminations per value of `key` and exit month.
    fn termination_heatmap(&self, key: GroupKey) -> TerminationHeatmap;

    /// Kaplan-Meier survival over tenure, terminations as events.
    fn survival_curve(&self) -> Vec<SurvivalPoint>;

    /// Lag-feature table with status labels.
    fn feature_table(&self) -> FeatureTable;

    /// Status prediction for the latest period.
    fn predict_status(&self) -> Prediction;

    /// Clusters of departing employees.
    fn cluster_departures(&self) -> Result<ClusteringResult>;

    /// Headline numbers.
    fn summary(&self) -> WorkforceSummary;
}

/// Headline numbers of a roster snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkforceSummary {
    /// Employees with a hire date
    pub total_hires: u64,
    /// Employees with a termination date
    pub total_terminations: u64,
    /// Employees without a termination date
    pub active_employees: u64,
    /// Retention of the most recent calendar year
    pub latest_yearly_retention: Option<f64>,
    /// Mean tenure in days, active employees included
    pub average_tenure_days: Option<f64>,
}

/// Everything a run produces, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Reference date
    pub as_of: NaiveDate,
    /// Period size
    pub granularity: Granularity,
    /// Headline numbers
    pub summary: WorkforceSummary,
    /// Hires per period
    pub hires: PeriodSeries<u32>,
    /// Terminations per period
    pub terminations: PeriodSeries<u32>,
    /// Turnover rate per period
    pub turnover_rate: PeriodSeries<f64>,
    /// Retention rate per period
    pub retention_rate: PeriodSeries<f64>,
    /// Tenure statistics of terminated employees
    pub tenure: Option<TenureSummary>,
    /// Terminations per reason
    pub termination_reasons: BTreeMap<String, u32>,
    /// Hires and terminations by calendar month
    pub seasonality: Vec<MonthlyActivity>,
    /// Kaplan-Meier survival over tenure
    pub survival: Vec<SurvivalPoint>,
    /// Latest-period status prediction
    pub prediction: Prediction,
    /// Rows excluded or reinterpreted during preprocessing
    pub issues: Vec<DataQualityIssue>,
}

/// Roster snapshot plus the parameters of one run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    records: Vec<EmployeeRecord>,
    issues: Vec<DataQualityIssue>,
    config: PipelineConfig,
    as_of: NaiveDate,
    classifier: Option<Arc<dyn StatusClassifier>>,
}

impl PipelineContext {
    /// Preprocess `rows` into a new context.
    pub fn new(rows: &[RawEmployeeRow], as_of: NaiveDate, config: PipelineConfig) -> Result<Self> {
        let span = info_span!("pipeline", %as_of, granularity = %config.granularity);
        let _guard = span.enter();

        let output = Preprocessor::new(as_of)
            .strict(config.strict_dates)
            .process(rows)?;
        info!(
            rows = rows.len(),
            records = output.records.len(),
            excluded = output.excluded(),
            "roster loaded"
        );

        Ok(Self {
            records: output.records,
            issues: output.issues,
            config,
            as_of,
            classifier: None,
        })
    }

    /// Build a context over already processed records.
    pub const fn from_records(
        records: Vec<EmployeeRecord>,
        as_of: NaiveDate,
        config: PipelineConfig,
    ) -> Self {
        Self {
            records,
            issues: Vec::new(),
            config,
            as_of,
            classifier: None,
        }
    }

    /// Attach a trained classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn StatusClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Run configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A new context over the records that pass `filter`.
    ///
    /// Issues and the classifier carry over; the records are copied.
    pub fn filtered(&self, filter: &RosterFilter) -> Self {
        let records = filter.apply(&self.records);
        debug!(
            before = self.records.len(),
            after = records.len(),
            "applied roster filter"
        );
        Self {
            records,
            issues: self.issues.clone(),
            config: self.config,
            as_of: self.as_of,
            classifier: self.classifier.clone(),
        }
    }

    /// Standard metrics configured for this run.
    pub fn registry(&self) -> MetricRegistry {
        MetricRegistry::with_rate_config(self.config.rate_config())
    }

    /// Every registered metric joined on period.
    pub fn metrics_frame(&self) -> Result<DataFrame> {
        self.registry()
            .compute_all(&self.records, self.config.granularity)
    }

    /// Collect every output of the run.
    pub fn report(&self) -> PipelineReport {
        let _guard = info_span!("report", as_of = %self.as_of).entered();

        let turnover = self.turnover_rate();
        let retention = self.rates().retention_rate(&turnover);
        PipelineReport {
            as_of: self.as_of,
            granularity: self.config.granularity,
            summary: self.summary(),
            hires: self.hires_by_period(),
            terminations: self.terminations_by_period(),
            turnover_rate: turnover,
            retention_rate: retention,
            tenure: TenureSummary::from_values(&self.tenure_distribution()),
            termination_reasons: self.termination_reasons(),
            seasonality: self.seasonality(),
            survival: self.survival_curve(),
            prediction: self.predict_status(),
            issues: self.issues.clone(),
        }
    }

    fn aggregator(&self) -> PeriodAggregator<'_> {
        PeriodAggregator::new(&self.records, self.config.granularity)
    }

    fn rates(&self) -> RateCalculator {
        RateCalculator::with_config(self.config.rate_config())
    }
}

impl WorkforceAnalytics for PipelineContext {
    fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    fn granularity(&self) -> Granularity {
        self.config.granularity
    }

    fn records(&self) -> &[EmployeeRecord] {
        &self.records
    }

    fn issues(&self) -> &[DataQualityIssue] {
        &self.issues
    }

    fn hires_by_period(&self) -> PeriodSeries<u32> {
        self.aggregator().hires_by_period()
    }

    fn terminations_by_period(&self) -> PeriodSeries<u32> {
        self.aggregator().terminations_by_period()
    }

    fn turnover_rate(&self) -> PeriodSeries<f64> {
        let agg = self.aggregator();
        self.rates()
            .turnover_rate(&agg.terminations_by_period(), &agg.average_headcount())
    }

    fn retention_rate(&self) -> PeriodSeries<f64> {
        self.rates().retention_rate(&self.turnover_rate())
    }

    fn tenure_distribution(&self) -> Vec<i64> {
        distribution::tenure_distribution(&self.records)
    }

    fn termination_reasons(&self) -> BTreeMap<String, u32> {
        distribution::termination_reason_distribution(&self.records)
    }

    fn group_breakdown(
        &self,
        key: GroupKey,
        metric: &dyn PeriodMetric,
    ) -> Result<GroupBreakdown<f64>> {
        let granularity = self.config.granularity;
        distribution::group_breakdown(&self.records, key, |subset| {
            metric.compute(subset, granularity)
        })
    }

    fn seasonality(&self) -> Vec<MonthlyActivity> {
        distribution::monthly_seasonality(&self.records)
    }

    fn termination_heatmap(&self, key: GroupKey) -> TerminationHeatmap {
        distribution::termination_heatmap(&self.records, key)
    }

    fn survival_curve(&self) -> Vec<SurvivalPoint> {
        distribution::kaplan_meier(&self.records)
    }

    fn feature_table(&self) -> FeatureTable {
        FeatureBuilder::with_config(self.config.feature_config()).build(&self.records)
    }

    fn predict_status(&self) -> Prediction {
        predict_latest(self.classifier.as_deref(), &self.feature_table())
    }

    fn cluster_departures(&self) -> Result<ClusteringResult> {
        DepartureClusterer::with_config(self.config.clustering).fit(&self.records)
    }

    fn summary(&self) -> WorkforceSummary {
        let total = self.records.len() as u64;
        let terminated = self.records.iter().filter(|r| r.is_terminated()).count() as u64;

        let yearly = PeriodAggregator::new(&self.records, Granularity::Year);
        let rates = self.rates();
        let yearly_turnover =
            rates.turnover_rate(&yearly.terminations_by_period(), &yearly.average_headcount());
        let latest_yearly_retention = rates
            .retention_rate(&yearly_turnover)
            .last()
            .map(|(_, rate)| rate);

        WorkforceSummary {
            total_hires: total,
            total_terminations: terminated,
            active_employees: total - terminated,
            latest_yearly_retention,
            average_tenure_days: distribution::average_tenure(&self.records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::CompanyStatus, metrics::Hires, registry::MetricCategory,
        roster::test_support::record,
    };
    use approx::assert_relative_eq;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn raw(
        id: &str,
        hire: Option<&str>,
        termination: Option<&str>,
        department: &str,
    ) -> RawEmployeeRow {
        RawEmployeeRow {
            employee_id: id.to_string(),
            hire_date: hire.map(str::to_string),
            termination_date: termination.map(str::to_string),
            department: Some(department.to_string()),
            job_title: Some("Analista".to_string()),
            termination_reason: termination.map(|_| "Renuncia".to_string()),
            contract_type: Some("Permanente".to_string()),
        }
    }

    fn rows() -> Vec<RawEmployeeRow> {
        vec![
            raw("1", Some("2022-01-15"), None, "Ventas"),
            raw("2", Some("2022-02-20"), Some("2023-01-10"), "Marketing"),
            raw("3", None, None, "Ventas"),
        ]
    }

    #[derive(Debug)]
    struct AlwaysStable;

    impl StatusClassifier for AlwaysStable {
        fn name(&self) -> &str {
            "always_stable"
        }

        fn predict(&self, _features: &[f64]) -> Result<CompanyStatus> {
            Ok(CompanyStatus::Stable)
        }
    }

    #[test]
    fn test_monthly_flows_of_small_roster() {
        let ctx = PipelineContext::new(&rows(), as_of(), PipelineConfig::default()).unwrap();
        assert_eq!(ctx.records().len(), 2);
        assert_eq!(ctx.issues().len(), 1);

        let hires = ctx.hires_by_period();
        let date = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        assert_eq!(hires.get(date(2022, 1)), Some(1));
        assert_eq!(hires.get(date(2022, 2)), Some(1));
        assert_eq!(hires.total(), 2);

        let terminations = ctx.terminations_by_period();
        assert_eq!(terminations.get(date(2023, 1)), Some(1));
        assert_eq!(terminations.total(), 1);
    }

    #[test]
    fn test_summary() {
        let ctx = PipelineContext::new(&rows(), as_of(), PipelineConfig::default()).unwrap();
        let summary = ctx.summary();

        assert_eq!(summary.total_hires, 2);
        assert_eq!(summary.total_terminations, 1);
        assert_eq!(summary.active_employees, 1);
        // 2023: two heads on Jan 1, one on Jan 1 2024, one leaver.
        assert_relative_eq!(summary.latest_yearly_retention.unwrap(), 100.0 - 1.0 / 1.5 * 100.0);
        assert_relative_eq!(summary.average_tenure_days.unwrap(), (716.0 + 324.0) / 2.0);
    }

    #[test]
    fn test_empty_roster_summary() {
        let ctx = PipelineContext::from_records(Vec::new(), as_of(), PipelineConfig::default());
        let summary = ctx.summary();
        assert_eq!(summary.total_hires, 0);
        assert_eq!(summary.latest_yearly_retention, None);
        assert_eq!(summary.average_tenure_days, None);
        assert!(ctx.feature_table().is_empty());
        assert!(ctx.cluster_departures().unwrap().is_empty());
        assert_eq!(ctx.predict_status(), Prediction::Unavailable);
        assert!(ctx.survival_curve().is_empty());
        assert!(ctx.termination_heatmap(GroupKey::Department).rows.is_empty());
        assert!(ctx.seasonality().iter().all(|m| m.hires == 0 && m.terminations == 0));
    }

    #[test]
    fn test_seasonality_heatmap_and_survival() {
        let ctx = PipelineContext::new(&rows(), as_of(), PipelineConfig::default()).unwrap();

        let months = ctx.seasonality();
        assert_eq!((months[0].hires, months[0].terminations), (1, 1));
        assert_eq!(months[1].hires, 1);

        let heatmap = ctx.termination_heatmap(GroupKey::Department);
        assert_eq!(heatmap.get("Marketing", 1), 1);
        assert_eq!(heatmap.group_total("Ventas"), 0);

        let curve = ctx.survival_curve();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].tenure_days, 324);
        assert_relative_eq!(curve[0].survival, 0.5);
        assert_eq!(curve[1].censored, 1);

        let report = ctx.report();
        assert_eq!(report.seasonality, months);
        assert_eq!(report.survival, curve);
    }

    #[test]
    fn test_retention_complements_turnover() {
        let ctx = PipelineContext::new(&rows(), as_of(), PipelineConfig::default()).unwrap();
        for ((_, t), (_, r)) in ctx.turnover_rate().iter().zip(ctx.retention_rate().iter()) {
            assert_relative_eq!(t + r, 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_report_is_idempotent() {
        let first = PipelineContext::new(&rows(), as_of(), PipelineConfig::default())
            .unwrap()
            .report();
        let second = PipelineContext::new(&rows(), as_of(), PipelineConfig::default())
            .unwrap()
            .report();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_filtered_context_is_independent() {
        let ctx = PipelineContext::new(&rows(), as_of(), PipelineConfig::default()).unwrap();
        let filter = RosterFilter {
            departments: vec!["Ventas".to_string()],
            ..Default::default()
        };
        let ventas = ctx.filtered(&filter);

        assert_eq!(ventas.records().len(), 1);
        assert_eq!(ventas.terminations_by_period().total(), 0);
        assert_eq!(ctx.records().len(), 2);
    }

    #[test]
    fn test_group_breakdown_through_metric() {
        let records = vec![
            record("1", "2022-01-15", None, "Ventas", as_of()),
            record("2", "2022-03-01", None, "Ventas", as_of()),
            record("3", "2022-02-01", None, "Marketing", as_of()),
        ];
        let ctx = PipelineContext::from_records(records, as_of(), PipelineConfig::default());
        assert_eq!(Hires.category(), MetricCategory::Flow);

        let breakdown = ctx.group_breakdown(GroupKey::Department, &Hires).unwrap();
        let ventas = breakdown.get("Ventas").unwrap();
        assert_eq!(ventas.len(), 3);
        assert_eq!(ventas.values().sum::<f64>(), 2.0);
        assert_eq!(breakdown.get("Marketing").unwrap().len(), 1);
    }

    #[test]
    fn test_prediction_with_classifier() {
        let records: Vec<EmployeeRecord> = (1..=6)
            .map(|m| record(&m.to_string(), &format!("2022-0{m}-01"), None, "A", as_of()))
            .collect();
        let ctx = PipelineContext::from_records(records, as_of(), PipelineConfig::default());
        assert_eq!(ctx.predict_status(), Prediction::Unavailable);

        let ctx = ctx.with_classifier(Arc::new(AlwaysStable));
        assert_eq!(ctx.predict_status().status(), Some(CompanyStatus::Stable));
    }

    #[test]
    fn test_metrics_frame_respects_clamping() {
        let records = vec![
            record("1", "2023-03-01", Some("2023-03-10"), "A", as_of()),
            record("2", "2023-03-02", Some("2023-03-20"), "A", as_of()),
        ];
        let config = PipelineConfig {
            clamp_retention: true,
            ..Default::default()
        };
        let ctx = PipelineContext::from_records(records, as_of(), config);
        let frame = ctx.metrics_frame().unwrap();
        let retention = frame.column("retention_rate").unwrap().f64().unwrap();
        assert_eq!(retention.get(0), Some(0.0));
    }

    #[test]
    fn test_strict_dates_fail_on_bad_row() {
        let config = PipelineConfig {
            strict_dates: true,
            ..Default::default()
        };
        assert!(PipelineContext::new(&rows(), as_of(), config).is_err());
    }
}
