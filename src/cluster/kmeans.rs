//! K-means clustering.
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (WCSS).
//!
//! # The Objective
//!
//! K-means minimizes:
//!
//! ```text
//! WCSS = Σₖ Σᵢ∈Cₖ wᵢ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids via k-means++
//! 2. **Assign**: Each point → nearest centroid
//! 3. **Update**: Each centroid → weighted mean of assigned points
//! 4. Repeat until the centroids stop moving
//!
//! # Membership
//!
//! K-means is a hard clusterer. Its membership distribution puts probability
//! 1 on the nearest centroid and 0 elsewhere.
//!
//! # Missing Values
//!
//! Missing coordinates are replaced by the weighted column mean before
//! fitting, and skipped in distances when a record is queried.

use super::traits::Clusterer;
use crate::data::{Dataset, Record};
use crate::error::{Error, Result};
use crate::options::{get_parsed_option, Configurable, OptionDescription};
use ndarray::{Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Squared Euclidean distance over coordinates present in both points.
pub(super) fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (x - y).powi(2))
        .sum()
}

/// Pick `k` rows of `data` as seeds using k-means++.
///
/// The first seed is uniform; each next seed is drawn with probability
/// proportional to its squared distance from the nearest existing seed.
pub(super) fn init_centroids(data: &Array2<f64>, k: usize, rng: &mut impl Rng) -> Array2<f64> {
    let n = data.nrows();
    let d = data.ncols();
    let mut centroids = Array2::<f64>::zeros((k, d));
    if k == 0 || n == 0 {
        return centroids;
    }

    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    for i in 1..k {
        let distances: Vec<f64> = (0..n)
            .map(|j| {
                let point = data.row(j);
                (0..i)
                    .map(|c| squared_distance(&point, &centroids.row(c)))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        if total == 0.0 {
            let idx = rng.random_range(0..n);
            centroids.row_mut(i).assign(&data.row(idx));
            continue;
        }

        let threshold = rng.random::<f64>() * total;
        let mut cumsum = 0.0;
        let mut selected = n - 1;

        for (j, &dist) in distances.iter().enumerate() {
            cumsum += dist;
            if cumsum >= threshold && dist > 0.0 {
                selected = j;
                break;
            }
        }

        centroids.row_mut(i).assign(&data.row(selected));
    }

    centroids
}

/// Index of the centroid nearest to `point`.
fn nearest(point: &ArrayView1<'_, f64>, centroids: &Array2<f64>) -> usize {
    let mut best_cluster = 0;
    let mut best_dist = f64::MAX;
    for (k, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = squared_distance(point, &centroid);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = k;
        }
    }
    best_cluster
}

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
    centroids: Option<Array2<f64>>,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            tol: 1e-4,
            seed: None,
            centroids: None,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Fitted centroids (k × d).
    pub fn centroids(&self) -> Option<&Array2<f64>> {
        self.centroids.as_ref()
    }

    fn impute_column_means(data: &mut Array2<f64>, weights: &[f64]) {
        for mut col in data.columns_mut() {
            let (sw, sx) = col
                .iter()
                .zip(weights)
                .filter(|(x, _)| !x.is_nan())
                .fold((0.0f64, 0.0f64), |(sw, sx), (x, w)| (sw + w, sx + w * x));
            let mean = if sw > 0.0 { sx / sw } else { 0.0 };
            col.mapv_inplace(|x| if x.is_nan() { mean } else { x });
        }
    }
}

impl Default for Kmeans {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Configurable for Kmeans {
    fn set_options(&mut self, options: &mut Vec<String>) -> Result<()> {
        if let Some(k) = get_parsed_option('N', options)? {
            self.k = k;
        }
        if let Some(n) = get_parsed_option('I', options)? {
            self.max_iter = n;
        }
        if let Some(s) = get_parsed_option('S', options)? {
            self.seed = Some(s);
        }
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut opts = vec![
            "-N".to_string(),
            self.k.to_string(),
            "-I".to_string(),
            self.max_iter.to_string(),
        ];
        if let Some(seed) = self.seed {
            opts.push("-S".to_string());
            opts.push(seed.to_string());
        }
        opts
    }

    fn describe_options(&self) -> Vec<OptionDescription> {
        vec![
            OptionDescription {
                flag: 'N',
                synopsis: "-N <num>",
                description: "Number of clusters (default 2).",
            },
            OptionDescription {
                flag: 'I',
                synopsis: "-I <num>",
                description: "Maximum Lloyd iterations (default 100).",
            },
            OptionDescription {
                flag: 'S',
                synopsis: "-S <seed>",
                description: "Random seed for k-means++ seeding.",
            },
        ]
    }
}

impl Clusterer for Kmeans {
    fn name(&self) -> &'static str {
        "kmeans"
    }

    fn fit(&mut self, data: &Dataset) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }

        let n = data.len();
        let d = data.schema().width();

        if self.k == 0 {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "must be > 0",
            });
        }
        if self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }

        let weights: Vec<f64> = data.records().iter().map(Record::weight).collect();
        let mut data_arr = super::to_matrix(data)?;
        Self::impute_column_means(&mut data_arr, &weights);

        // Initialize RNG
        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        let mut centroids = init_centroids(&data_arr, self.k, &mut rng);
        let mut labels = vec![0usize; n];
        let mut iterations = 0;

        for _iter in 0..self.max_iter {
            iterations += 1;

            // Assignment step - parallel when feature enabled
            #[cfg(feature = "parallel")]
            {
                let centroids_ref = &centroids;
                let data_ref = &data_arr;
                labels.par_iter_mut().enumerate().for_each(|(i, label)| {
                    *label = nearest(&data_ref.row(i), centroids_ref);
                });
            }

            #[cfg(not(feature = "parallel"))]
            for (i, label) in labels.iter_mut().enumerate() {
                *label = nearest(&data_arr.row(i), &centroids);
            }

            // Update step
            let mut new_centroids = Array2::<f64>::zeros((self.k, d));
            let mut mass = vec![0.0f64; self.k];

            for i in 0..n {
                let k = labels[i];
                for j in 0..d {
                    new_centroids[[k, j]] += weights[i] * data_arr[[i, j]];
                }
                mass[k] += weights[i];
            }

            for k in 0..self.k {
                if mass[k] > 0.0 {
                    for j in 0..d {
                        new_centroids[[k, j]] /= mass[k];
                    }
                } else {
                    // Empty cluster: reinitialize randomly
                    let idx = rng.random_range(0..n);
                    new_centroids.row_mut(k).assign(&data_arr.row(idx));
                }
            }

            // Check convergence
            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();

            centroids = new_centroids;

            if shift < self.tol {
                break;
            }
        }

        debug!(k = self.k, dims = d, iterations, "kmeans fitted");
        self.centroids = Some(centroids);
        Ok(())
    }

    fn n_clusters(&self) -> Result<usize> {
        self.centroids
            .as_ref()
            .map(|c| c.nrows())
            .ok_or(Error::NotFitted)
    }

    fn distribution(&self, record: &Record) -> Result<Vec<f64>> {
        let centroids = self.centroids.as_ref().ok_or(Error::NotFitted)?;
        if record.len() != centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: centroids.ncols(),
                found: record.len(),
            });
        }
        let best = nearest(&ArrayView1::from(record.values()), centroids);
        let mut probs = vec![0.0; centroids.nrows()];
        probs[best] = 1.0;
        Ok(probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Attribute, Schema};

    fn dataset(rows: Vec<Vec<f64>>) -> Dataset {
        let d = rows.first().map_or(2, Vec::len);
        let attrs = (0..d).map(|j| Attribute::numeric(format!("x{j}"))).collect();
        Dataset::from_records(
            Schema::new("pts", attrs),
            rows.into_iter().map(Record::new).collect(),
        )
        .unwrap()
    }

    fn labels(km: &Kmeans, data: &Dataset) -> Vec<usize> {
        data.records().iter().map(|r| km.cluster(r).unwrap()).collect()
    }

    #[test]
    fn test_kmeans_basic() {
        let data = dataset(vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ]);

        let mut kmeans = Kmeans::new(2).with_seed(42);
        kmeans.fit(&data).unwrap();
        let labels = labels(&kmeans, &data);

        // Points 0,1 should be in same cluster, points 2,3 in another
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_kmeans_distribution_is_one_hot() {
        let data = dataset(vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ]);
        let mut kmeans = Kmeans::new(2).with_seed(5);
        kmeans.fit(&data).unwrap();

        for record in data.records() {
            let probs = kmeans.distribution(record).unwrap();
            assert_eq!(probs.len(), 2);
            assert_eq!(probs.iter().filter(|&&p| p == 1.0).count(), 1);
            assert_eq!(probs.iter().sum::<f64>(), 1.0);
        }
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        // Property: every point must be assigned to exactly one cluster
        let data = dataset(
            (0..50)
                .map(|i| vec![i as f64 * 0.1, (i % 5) as f64])
                .collect(),
        );

        let mut kmeans = Kmeans::new(5).with_seed(123);
        kmeans.fit(&data).unwrap();
        let labels = labels(&kmeans, &data);

        assert_eq!(labels.len(), data.len());
        for &label in &labels {
            assert!(label < 5, "label {} out of range", label);
        }
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data = dataset(vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ]);

        let mut kmeans1 = Kmeans::new(2).with_seed(42);
        let mut kmeans2 = Kmeans::new(2).with_seed(42);
        kmeans1.fit(&data).unwrap();
        kmeans2.fit(&data).unwrap();

        assert_eq!(kmeans1.centroids(), kmeans2.centroids(), "same seed should give same result");
    }

    #[test]
    fn test_kmeans_missing_values() {
        let data = dataset(vec![
            vec![0.0, f64::NAN],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![f64::NAN, 10.1],
        ]);
        let mut kmeans = Kmeans::new(2).with_seed(11);
        kmeans.fit(&data).unwrap();
        assert!(kmeans.centroids().unwrap().iter().all(|c| c.is_finite()));

        let probe = Record::new(vec![10.05, f64::NAN]);
        let near_b = kmeans.cluster(&data.records()[2]).unwrap();
        assert_eq!(kmeans.cluster(&probe).unwrap(), near_b);
    }

    #[test]
    fn test_kmeans_empty_input_error() {
        let mut kmeans = Kmeans::new(2);
        assert_eq!(kmeans.fit(&dataset(vec![])), Err(Error::EmptyInput));
    }

    #[test]
    fn test_kmeans_k_larger_than_n_error() {
        let data = dataset(vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
        let mut kmeans = Kmeans::new(5); // k > n
        assert!(matches!(
            kmeans.fit(&data),
            Err(Error::InvalidClusterCount { requested: 5, n_items: 2 })
        ));
    }
}
