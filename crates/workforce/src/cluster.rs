//! K-means clustering of departing employees.
//!
//! Terminated employees are described by tenure, exit month and exit year,
//! standardized, and grouped with `linfa` k-means (best of several seeded
//! restarts). Clusters are numbered by ascending centroid tenure.

use crate::{
    Result, WorkforceError, roster::EmployeeRecord, standardize::Standardizer,
};
use linfa::prelude::*;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Columns fed to the clustering, in matrix order.
pub const CLUSTER_FEATURES: [&str; 3] =
    ["tenure_days", "termination_month", "termination_year"];

/// Configuration for [`DepartureClusterer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of clusters.
    pub n_clusters: usize,
    /// Number of independent restarts; the lowest-inertia run wins.
    pub n_init: usize,
    /// Iteration cap per restart.
    pub max_iterations: usize,
    /// Convergence tolerance on the change in inertia.
    pub tolerance: f64,
    /// Seed for centroid initialization.
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

/// Cluster membership of one departing employee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// Employee identifier
    pub employee_id: String,
    /// Cluster index
    pub cluster: usize,
    /// Tenure in days
    pub tenure_days: i64,
    /// Exit month
    pub termination_month: u32,
    /// Exit year
    pub termination_year: i32,
}

/// Outcome of a clustering run.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ClusteringResult {
    /// One assignment per terminated employee, in roster order
    pub assignments: Vec<ClusterAssignment>,
    /// Centroids in original units, ordered like [`CLUSTER_FEATURES`]
    pub centroids: Vec<[f64; 3]>,
    /// Members per cluster
    pub sizes: Vec<usize>,
    /// Within-cluster sum of squares in standardized space
    pub inertia: f64,
}

impl ClusteringResult {
    /// Whether no employees were clustered.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Groups terminated employees with k-means.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepartureClusterer {
    config: ClusterConfig,
}

impl DepartureClusterer {
    /// Create a clusterer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clusterer with a custom configuration.
    pub const fn with_config(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Cluster the terminated employees among `records`.
    ///
    /// No terminated employees gives an empty result; fewer terminated
    /// employees than clusters is an error.
    pub fn fit(&self, records: &[EmployeeRecord]) -> Result<ClusteringResult> {
        let leavers: Vec<(&EmployeeRecord, u32, i32)> = records
            .iter()
            .filter_map(|r| Some((r, r.termination_month?, r.termination_year?)))
            .collect();

        if leavers.is_empty() {
            return Ok(ClusteringResult::default());
        }
        let k = self.config.n_clusters;
        if k == 0 || leavers.len() < k {
            return Err(WorkforceError::InsufficientData {
                required: k.max(1),
                available: leavers.len(),
            });
        }

        let mut raw = Array2::zeros((leavers.len(), CLUSTER_FEATURES.len()));
        for (mut row, (record, month, year)) in raw.outer_iter_mut().zip(&leavers) {
            row[0] = record.tenure_days as f64;
            row[1] = f64::from(*month);
            row[2] = f64::from(*year);
        }

        let scaler = Standardizer::fit(&raw)?;
        let data = scaler.transform(&raw)?;

        let dataset = Dataset::new(data.clone(), Array1::<usize>::zeros(data.nrows()));
        let rng = StdRng::seed_from_u64(self.config.seed);
        let model = KMeans::params_with(k, rng, L2Dist)
            .n_runs(self.config.n_init.max(1))
            .max_n_iterations(self.config.max_iterations as u64)
            .tolerance(self.config.tolerance)
            .fit(&dataset)
            .map_err(|e| WorkforceError::Model(e.to_string()))?;

        let labels: Array1<usize> = model.predict(&data);
        let inertia = compute_inertia(&data, &labels, model.centroids());

        // Number clusters by ascending tenure of their centroid.
        let centroids = scaler.inverse_transform(model.centroids())?;
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| centroids[[a, 0]].total_cmp(&centroids[[b, 0]]));
        let mut relabel = vec![0; k];
        for (new, &old) in order.iter().enumerate() {
            relabel[old] = new;
        }

        let assignments: Vec<ClusterAssignment> = leavers
            .iter()
            .zip(labels.iter())
            .map(|((record, month, year), &label)| ClusterAssignment {
                employee_id: record.employee_id.clone(),
                cluster: relabel[label],
                tenure_days: record.tenure_days,
                termination_month: *month,
                termination_year: *year,
            })
            .collect();

        let mut sizes = vec![0; k];
        for a in &assignments {
            sizes[a.cluster] += 1;
        }
        let ordered_centroids = order
            .iter()
            .map(|&old| [centroids[[old, 0]], centroids[[old, 1]], centroids[[old, 2]]])
            .collect();

        debug!(
            employees = assignments.len(),
            clusters = k,
            inertia,
            "clustered departing employees"
        );

        Ok(ClusteringResult {
            assignments,
            centroids: ordered_centroids,
            sizes,
            inertia,
        })
    }
}

/// Within-cluster sum of squared distances.
fn compute_inertia(data: &Array2<f64>, labels: &Array1<usize>, centroids: &Array2<f64>) -> f64 {
    data.outer_iter()
        .zip(labels.iter())
        .filter(|(_, cluster)| **cluster < centroids.nrows())
        .map(|(point, &cluster)| {
            point
                .iter()
                .zip(centroids.row(cluster).iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::test_support::record;
    use chrono::NaiveDate;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Three quick 2020 exits and three long-tenure 2023 exits.
    fn leavers() -> Vec<EmployeeRecord> {
        vec![
            record("a1", "2020-01-01", Some("2020-02-01"), "A", as_of()),
            record("a2", "2020-01-10", Some("2020-02-20"), "A", as_of()),
            record("a3", "2020-02-01", Some("2020-03-05"), "A", as_of()),
            record("b1", "2015-01-01", Some("2023-11-01"), "B", as_of()),
            record("b2", "2015-06-01", Some("2023-11-15"), "B", as_of()),
            record("b3", "2014-09-01", Some("2023-12-01"), "B", as_of()),
            record("active", "2019-01-01", None, "B", as_of()),
        ]
    }

    fn two_clusters() -> DepartureClusterer {
        DepartureClusterer::with_config(ClusterConfig {
            n_clusters: 2,
            ..Default::default()
        })
    }

    #[test]
    fn test_separates_short_and_long_tenures() {
        let result = two_clusters().fit(&leavers()).unwrap();

        assert_eq!(result.assignments.len(), 6);
        assert_eq!(result.sizes, vec![3, 3]);
        for a in &result.assignments {
            let expected = if a.employee_id.starts_with('a') { 0 } else { 1 };
            assert_eq!(a.cluster, expected, "{}", a.employee_id);
        }
        assert!(result.centroids[0][0] < result.centroids[1][0]);
        assert!(result.inertia >= 0.0);
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let records = leavers();
        let clusterer = DepartureClusterer::new();
        assert_eq!(clusterer.fit(&records).unwrap(), clusterer.fit(&records).unwrap());
    }

    #[test]
    fn test_single_cluster_centroid_is_the_mean() {
        let clusterer = DepartureClusterer::with_config(ClusterConfig {
            n_clusters: 1,
            n_init: 1,
            ..Default::default()
        });
        let records = leavers();
        let result = clusterer.fit(&records).unwrap();

        assert_eq!(result.sizes, vec![6]);
        let leavers: Vec<&EmployeeRecord> =
            records.iter().filter(|r| r.is_terminated()).collect();
        let mean_tenure =
            leavers.iter().map(|r| r.tenure_days as f64).sum::<f64>() / leavers.len() as f64;
        approx::assert_relative_eq!(result.centroids[0][0], mean_tenure, epsilon = 1e-6);
        // Standardized columns have unit variance, so the one-cluster
        // inertia is rows times columns.
        approx::assert_relative_eq!(result.inertia, 18.0, epsilon = 1e-6);
    }

    #[test]
    fn test_no_leavers_gives_empty_result() {
        let records = vec![record("1", "2022-01-01", None, "A", as_of())];
        let result = DepartureClusterer::new().fit(&records).unwrap();
        assert!(result.is_empty());
        assert!(result.centroids.is_empty());
    }

    #[test]
    fn test_fewer_leavers_than_clusters() {
        let records = vec![
            record("1", "2022-01-01", Some("2022-03-01"), "A", as_of()),
            record("2", "2022-01-01", Some("2022-05-01"), "A", as_of()),
        ];
        let err = DepartureClusterer::new().fit(&records).unwrap_err();
        assert!(matches!(
            err,
            WorkforceError::InsufficientData {
                required: 3,
                available: 2
            }
        ));
    }
}
