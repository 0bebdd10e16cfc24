//! Company-status classification.
//!
//! A [`StatusClassifier`] maps one feature vector to a [`CompanyStatus`].
//! Classifiers are trained outside the metrics pipeline and handed to it; the
//! bundled [`NearestCentroidClassifier`] is a small reference model that can
//! be fitted on a [`FeatureTable`] and saved as JSON.

use crate::{
    Result, WorkforceError,
    features::{CompanyStatus, FEATURE_COLUMNS, FEATURE_COUNT, FeatureTable},
    standardize::Standardizer,
};
use ndarray::{Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, warn};

/// A model that labels one period from its features.
pub trait StatusClassifier: Send + Sync + std::fmt::Debug {
    /// Short identifier of the model.
    fn name(&self) -> &str;

    /// Predict the status of a feature vector in [`FEATURE_COLUMNS`] order.
    fn predict(&self, features: &[f64]) -> Result<CompanyStatus>;
}

/// Outcome of classifying the latest period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Prediction {
    /// Predicted status of the latest period
    Status {
        /// Predicted label
        status: CompanyStatus,
    },
    /// The feature table has no rows
    InsufficientData,
    /// No classifier was supplied
    Unavailable,
    /// The classifier failed
    Failed {
        /// Error description
        message: String,
    },
}

impl Prediction {
    /// Predicted status, if any.
    pub const fn status(&self) -> Option<CompanyStatus> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// JSON body: `{"prediction": "<status>"}` or `{"error": "<message>"}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Status { status } => serde_json::json!({ "prediction": status }),
            Self::InsufficientData => {
                serde_json::json!({ "error": "not enough periods to build features" })
            }
            Self::Unavailable => serde_json::json!({ "error": "no trained model available" }),
            Self::Failed { message } => serde_json::json!({ "error": message }),
        }
    }
}

/// Classify the most recent row of `table`.
///
/// Never fails: a missing model, an empty table and classifier errors are all
/// reported through the returned [`Prediction`].
pub fn predict_latest(
    classifier: Option<&dyn StatusClassifier>,
    table: &FeatureTable,
) -> Prediction {
    let Some(classifier) = classifier else {
        return Prediction::Unavailable;
    };
    let Some(row) = table.last() else {
        return Prediction::InsufficientData;
    };

    match classifier.predict(&row.features()) {
        Ok(status) => {
            debug!(model = classifier.name(), period = %row.period, %status, "predicted status");
            Prediction::Status { status }
        }
        Err(err) => {
            warn!(model = classifier.name(), error = %err, "status prediction failed");
            Prediction::Failed {
                message: err.to_string(),
            }
        }
    }
}

/// Nearest-centroid classifier over standardized features.
///
/// Fitting standardizes the feature matrix and stores the mean vector of
/// each observed status. Prediction picks the status whose centroid is
/// closest in Euclidean distance; ties go to the first status in label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroidClassifier {
    features: Vec<String>,
    scaler: Standardizer,
    centroids: BTreeMap<CompanyStatus, Vec<f64>>,
}

impl NearestCentroidClassifier {
    /// Fit on every row of `table`.
    pub fn fit(table: &FeatureTable) -> Result<Self> {
        if table.is_empty() {
            return Err(WorkforceError::InsufficientData {
                required: 1,
                available: 0,
            });
        }

        let matrix = table.feature_matrix();
        let scaler = Standardizer::fit(&matrix)?;
        let scaled = scaler.transform(&matrix)?;

        let mut sums: BTreeMap<CompanyStatus, (Array1<f64>, usize)> = BTreeMap::new();
        for (row, label) in scaled.axis_iter(Axis(0)).zip(table.labels()) {
            let (sum, count) = sums
                .entry(label)
                .or_insert_with(|| (Array1::zeros(FEATURE_COUNT), 0));
            *sum += &row;
            *count += 1;
        }

        let centroids = sums
            .into_iter()
            .map(|(label, (sum, count))| (label, (sum / count as f64).to_vec()))
            .collect::<BTreeMap<_, _>>();

        debug!(
            rows = table.len(),
            classes = centroids.len(),
            "fitted nearest-centroid classifier"
        );

        Ok(Self {
            features: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            scaler,
            centroids,
        })
    }

    /// Statuses seen during fitting.
    pub fn classes(&self) -> impl Iterator<Item = CompanyStatus> + '_ {
        self.centroids.keys().copied()
    }

    /// Load a model saved with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.features.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
            return Err(WorkforceError::Model(format!(
                "model expects features {:?}",
                self.features
            )));
        }
        if self.centroids.is_empty() {
            return Err(WorkforceError::Model("model has no classes".into()));
        }
        if let Some((status, _)) = self
            .centroids
            .iter()
            .find(|(_, centroid)| centroid.len() != FEATURE_COUNT)
        {
            return Err(WorkforceError::Model(format!(
                "centroid for {status} has the wrong width"
            )));
        }
        if self.scaler.width() != FEATURE_COUNT {
            return Err(WorkforceError::Model("scaler has the wrong width".into()));
        }
        Ok(())
    }
}

impl StatusClassifier for NearestCentroidClassifier {
    fn name(&self) -> &str {
        "nearest_centroid"
    }

    fn predict(&self, features: &[f64]) -> Result<CompanyStatus> {
        if let Some(bad) = features.iter().position(|v| !v.is_finite()) {
            return Err(WorkforceError::Model(format!(
                "feature {} is not finite",
                FEATURE_COLUMNS.get(bad).unwrap_or(&"?")
            )));
        }
        let z = self.scaler.transform_row(ArrayView1::from(features))?;

        self.centroids
            .iter()
            .map(|(status, centroid)| {
                let distance: f64 = z
                    .iter()
                    .zip(centroid)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum();
                (*status, distance)
            })
            .fold(None, |best: Option<(CompanyStatus, f64)>, (status, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((status, d)),
            })
            .map(|(status, _)| status)
            .ok_or_else(|| WorkforceError::Model("model has no classes".into()))
    }
}
