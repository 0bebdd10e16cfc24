#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod classify;
pub mod cluster;
pub mod config;
pub mod context;
pub mod distribution;
pub mod error;
pub mod features;
pub mod metrics;
pub mod period;
pub mod preprocess;
pub mod rates;
pub mod registry;
pub mod roster;
pub mod standardize;
pub mod traits;

// Re-export core types
pub use aggregate::PeriodAggregator;
pub use classify::{NearestCentroidClassifier, Prediction, StatusClassifier, predict_latest};
pub use cluster::{ClusterAssignment, ClusterConfig, ClusteringResult, DepartureClusterer};
pub use config::PipelineConfig;
pub use context::{PipelineContext, PipelineReport, WorkforceAnalytics, WorkforceSummary};
pub use distribution::{
    GroupBreakdown, GroupKey, MonthlyActivity, SurvivalPoint, TenureSummary, TerminationHeatmap,
    median_survival,
};
pub use error::{Result, WorkforceError};
pub use features::{
    CompanyStatus, FeatureBuilder, FeatureConfig, FeatureRow, FeatureTable, StatusThresholds,
};
pub use period::{Granularity, PeriodSeries};
pub use preprocess::{DataQualityIssue, IssueSeverity, PreprocessOutput, Preprocessor};
pub use rates::{RateCalculator, RateConfig};
pub use registry::{MetricCategory, MetricInfo, MetricRegistry};
pub use roster::{EmployeeRecord, RawEmployeeRow, Roster, RosterFilter};
pub use standardize::Standardizer;
pub use traits::{ConfigurableMetric, MetricConfig, PeriodMetric};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
