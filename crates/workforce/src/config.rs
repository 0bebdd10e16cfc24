//! Pipeline configuration.

use crate::{
    Result, cluster::ClusterConfig, features::FeatureConfig, features::StatusThresholds,
    period::Granularity, rates::RateConfig,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Parameters of one pipeline run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "granularity": "quarter", "clamp_retention": true }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Period size for every series
    pub granularity: Granularity,
    /// Status rule thresholds
    pub thresholds: StatusThresholds,
    /// Clamp retention into `[0, 100]`
    pub clamp_retention: bool,
    /// Fail on the first unusable roster row instead of excluding it
    pub strict_dates: bool,
    /// Departure clustering parameters
    pub clustering: ClusterConfig,
}

impl PipelineConfig {
    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Rate settings derived from this configuration.
    pub const fn rate_config(&self) -> RateConfig {
        RateConfig {
            clamp_retention: self.clamp_retention,
        }
    }

    /// Feature settings derived from this configuration.
    pub const fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            granularity: self.granularity,
            thresholds: self.thresholds,
        }
    }
}
