//! Gaussian Mixture Model clustering.
//!
//! GMM provides **soft clustering** with probabilistic assignments,
//! allowing records to belong to multiple clusters with different
//! probabilities. It is the default clusterer of the membership filter.
//!
//! # The Probabilistic Model
//!
//! GMM assumes data is generated from K Gaussian distributions:
//!
//! ```text
//! P(x) = Σₖ πₖ × N(x | μₖ, Σₖ)
//! ```
//!
//! Where:
//! - πₖ = mixing weight (probability of cluster k)
//! - μₖ = mean of cluster k
//! - Σₖ = diagonal covariance of cluster k
//!
//! # The EM Algorithm
//!
//! **E-step**: Compute "responsibilities" (soft assignments):
//! ```text
//! γₙₖ = P(z=k | xₙ) = πₖ × N(xₙ | μₖ, Σₖ) / Σⱼ πⱼ × N(xₙ | μⱼ, Σⱼ)
//! ```
//!
//! **M-step**: Update parameters using responsibilities scaled by record
//! weight wₙ:
//! - μₖ = Σₙ wₙγₙₖ xₙ / Σₙ wₙγₙₖ
//! - πₖ = Σₙ wₙγₙₖ / Σₙ wₙ
//!
//! Iteration stops after `max_iter` rounds or once the weighted mean
//! log-likelihood improves by less than `tol`.
//!
//! # Missing Values
//!
//! With a diagonal covariance a missing coordinate can be marginalised out
//! exactly: it is skipped in the density and contributes nothing to the
//! M-step sums for that dimension.
//!
//! # Failure Modes
//!
//! - **Local optima**: EM converges to local maxima; initialization matters
//! - **Singular covariance**: Small clusters can collapse; we add regularization
//! - **Wrong K**: Too many components overfit; too few underfit

use super::traits::Clusterer;
use crate::data::{Dataset, Record};
use crate::error::{Error, Result};
use crate::options::{get_parsed_option, Configurable, OptionDescription};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use tracing::debug;

/// Fitted mixture parameters.
#[derive(Debug, Clone)]
struct Mixture {
    means: Array2<f64>,
    variances: Array2<f64>,
    log_weights: Array1<f64>,
}

impl Mixture {
    fn k(&self) -> usize {
        self.means.nrows()
    }

    fn d(&self) -> usize {
        self.means.ncols()
    }

    /// Per-component log joint densities ln πₖ + ln N(x | μₖ, Σₖ).
    fn log_joint(&self, point: &ArrayView1<'_, f64>) -> Vec<f64> {
        (0..self.k())
            .map(|c| {
                self.log_weights[c]
                    + Gmm::log_gaussian(point, &self.means.row(c), &self.variances.row(c))
            })
            .collect()
    }
}

/// Gaussian Mixture Model clustering with diagonal covariances.
#[derive(Debug, Clone)]
pub struct Gmm {
    /// Number of components (clusters).
    n_components: usize,
    /// Maximum EM iterations.
    max_iter: usize,
    /// Early-stopping tolerance on mean log-likelihood.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
    /// Regularization for covariance.
    reg_covar: f64,
    model: Option<Mixture>,
}

impl Gmm {
    /// Create a new GMM with default settings.
    pub fn new() -> Self {
        Self {
            n_components: 8,
            max_iter: 100,
            tol: 1e-6,
            seed: None,
            reg_covar: 1e-6,
            model: None,
        }
    }

    /// Set number of components.
    pub fn with_n_components(mut self, n: usize) -> Self {
        self.n_components = n;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set early-stopping tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set covariance regularization. Must be positive; checked at fit time.
    pub fn with_reg_covar(mut self, reg: f64) -> Self {
        self.reg_covar = reg;
        self
    }

    /// Fitted component means (k × d).
    pub fn means(&self) -> Option<&Array2<f64>> {
        self.model.as_ref().map(|m| &m.means)
    }

    /// Fitted mixing weights.
    pub fn weights(&self) -> Option<Array1<f64>> {
        self.model.as_ref().map(|m| m.log_weights.mapv(f64::exp))
    }

    /// Compute log-likelihood of a point under a diagonal Gaussian.
    ///
    /// Missing coordinates are skipped.
    fn log_gaussian(
        point: &ArrayView1<'_, f64>,
        mean: &ArrayView1<'_, f64>,
        var: &ArrayView1<'_, f64>,
    ) -> f64 {
        let half_ln_2pi = 0.5 * (2.0 * std::f64::consts::PI).ln();
        let mut log_prob = 0.0;

        for i in 0..point.len() {
            let x = point[i];
            if x.is_nan() {
                continue;
            }
            let diff = x - mean[i];
            log_prob -= half_ln_2pi + 0.5 * var[i].ln();
            log_prob -= 0.5 * diff * diff / var[i];
        }

        log_prob
    }

    /// Log-sum-exp for numerical stability.
    fn logsumexp(values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NEG_INFINITY;
        }
        let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if max_val.is_infinite() {
            return max_val;
        }
        max_val
            + values
                .iter()
                .map(|&v| (v - max_val).exp())
                .sum::<f64>()
                .ln()
    }

    /// Weighted per-column mean and variance over non-missing values.
    fn column_moments(data: &Array2<f64>, weights: &[f64], reg: f64) -> (Vec<f64>, Vec<f64>) {
        let d = data.ncols();
        let mut means = vec![0.0; d];
        let mut vars = vec![1.0; d];
        for j in 0..d {
            let (mut sw, mut sx) = (0.0, 0.0);
            for (i, &w) in weights.iter().enumerate() {
                let x = data[[i, j]];
                if !x.is_nan() {
                    sw += w;
                    sx += w * x;
                }
            }
            if sw <= 0.0 {
                continue;
            }
            let mean = sx / sw;
            let mut sq = 0.0;
            for (i, &w) in weights.iter().enumerate() {
                let x = data[[i, j]];
                if !x.is_nan() {
                    sq += w * (x - mean) * (x - mean);
                }
            }
            means[j] = mean;
            vars[j] = (sq / sw).max(reg);
        }
        (means, vars)
    }
}

impl Default for Gmm {
    fn default() -> Self {
        Self::new()
    }
}

impl Configurable for Gmm {
    fn set_options(&mut self, options: &mut Vec<String>) -> Result<()> {
        if let Some(n) = get_parsed_option('N', options)? {
            self.n_components = n;
        }
        if let Some(n) = get_parsed_option('I', options)? {
            self.max_iter = n;
        }
        if let Some(s) = get_parsed_option('S', options)? {
            self.seed = Some(s);
        }
        if let Some(r) = get_parsed_option::<f64>('M', options)? {
            if !(r > 0.0) {
                return Err(Error::InvalidParameter {
                    name: "reg_covar",
                    message: "must be > 0",
                });
            }
            self.reg_covar = r;
        }
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut opts = vec![
            "-N".to_string(),
            self.n_components.to_string(),
            "-I".to_string(),
            self.max_iter.to_string(),
            "-M".to_string(),
            self.reg_covar.to_string(),
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
                description: "Number of mixture components (default 8, capped at the number of records).",
            },
            OptionDescription {
                flag: 'I',
                synopsis: "-I <num>",
                description: "Maximum EM iterations (default 100).",
            },
            OptionDescription {
                flag: 'S',
                synopsis: "-S <seed>",
                description: "Random seed for initialisation.",
            },
            OptionDescription {
                flag: 'M',
                synopsis: "-M <num>",
                description: "Minimum variance added to every component (positive, default 1e-6).",
            },
        ]
    }
}

impl Clusterer for Gmm {
    fn name(&self) -> &'static str {
        "gmm"
    }

    fn fit(&mut self, data: &Dataset) -> Result<()> {
        if data.is_empty() {
            return Err(Error::EmptyInput);
        }

        let n = data.len();
        let d = data.schema().width();
        let k = self.n_components.min(n);

        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "n_components",
                message: "must be > 0",
            });
        }
        if !(self.reg_covar > 0.0) {
            return Err(Error::InvalidParameter {
                name: "reg_covar",
                message: "must be > 0",
            });
        }
        if d == 0 {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "no columns left to cluster",
            });
        }

        let data_arr = super::to_matrix(data)?;
        let weights: Vec<f64> = data.records().iter().map(Record::weight).collect();
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "weights",
                message: "total record weight must be positive",
            });
        }

        // Initialize RNG
        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        let (col_means, col_vars) = Self::column_moments(&data_arr, &weights, self.reg_covar);

        // Means: k-means++ seeds, missing coordinates from the column mean
        let mut means = super::kmeans::init_centroids(&data_arr, k, &mut rng);
        for ((_, j), m) in means.indexed_iter_mut() {
            if m.is_nan() {
                *m = col_means[j];
            }
        }

        // Variances: data variance
        let mut variances = Array2::from_shape_fn((k, d), |(_, j)| col_vars[j]);

        // Weights: uniform
        let mut log_weights = Array1::from_elem(k, (1.0 / k as f64).ln());

        let mut resp = Array2::<f64>::zeros((n, k));
        let mut prev_ll = f64::NEG_INFINITY;
        let mut iterations = 0;

        for _iter in 0..self.max_iter {
            iterations += 1;

            // E-step
            let mut ll = 0.0;
            for i in 0..n {
                let point = data_arr.row(i);
                let log_probs: Vec<f64> = (0..k)
                    .map(|c| {
                        log_weights[c]
                            + Self::log_gaussian(&point, &means.row(c), &variances.row(c))
                    })
                    .collect();
                let log_sum = Self::logsumexp(&log_probs);
                ll += weights[i] * log_sum;
                for c in 0..k {
                    resp[[i, c]] = (log_probs[c] - log_sum).exp();
                }
            }
            let mean_ll = ll / total_weight;

            // M-step
            let mut new_means = means.clone();
            let mut new_variances = variances.clone();
            for c in 0..k {
                let mass: f64 = (0..n).map(|i| weights[i] * resp[[i, c]]).sum();
                log_weights[c] = (mass / total_weight).ln();

                for j in 0..d {
                    let (mut sw, mut sx) = (0.0, 0.0);
                    for i in 0..n {
                        let x = data_arr[[i, j]];
                        if !x.is_nan() {
                            let r = weights[i] * resp[[i, c]];
                            sw += r;
                            sx += r * x;
                        }
                    }
                    if sw <= 1e-10 {
                        continue;
                    }
                    let mu = sx / sw;
                    let mut sq = 0.0;
                    for i in 0..n {
                        let x = data_arr[[i, j]];
                        if !x.is_nan() {
                            sq += weights[i] * resp[[i, c]] * (x - mu) * (x - mu);
                        }
                    }
                    new_means[[c, j]] = mu;
                    new_variances[[c, j]] = (sq / sw).max(self.reg_covar);
                }
            }
            means = new_means;
            variances = new_variances;

            if (mean_ll - prev_ll).abs() < self.tol {
                break;
            }
            prev_ll = mean_ll;
        }

        debug!(components = k, dims = d, iterations, "gmm fitted");
        self.model = Some(Mixture {
            means,
            variances,
            log_weights,
        });
        Ok(())
    }

    fn n_clusters(&self) -> Result<usize> {
        self.model.as_ref().map(Mixture::k).ok_or(Error::NotFitted)
    }

    fn distribution(&self, record: &Record) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or(Error::NotFitted)?;
        if record.len() != model.d() {
            return Err(Error::DimensionMismatch {
                expected: model.d(),
                found: record.len(),
            });
        }
        let point = ArrayView1::from(record.values());
        let log_probs = model.log_joint(&point);
        let log_sum = Self::logsumexp(&log_probs);
        Ok(log_probs.iter().map(|lp| (lp - log_sum).exp()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Attribute, Schema};

    fn dataset(rows: &[[f64; 2]]) -> Dataset {
        let schema = Schema::new("pts", vec![Attribute::numeric("x"), Attribute::numeric("y")]);
        Dataset::from_records(schema, rows.iter().map(|r| Record::new(r.to_vec())).collect())
            .unwrap()
    }

    #[test]
    fn test_gmm_basic() {
        let data = dataset(&[[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]]);

        let mut gmm = Gmm::new().with_n_components(2).with_seed(42);
        gmm.fit(&data).unwrap();
        assert_eq!(gmm.n_clusters().unwrap(), 2);

        let labels: Vec<usize> = data.records().iter().map(|r| gmm.cluster(r).unwrap()).collect();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_gmm_soft_assignments() {
        let data = dataset(&[[0.0, 0.0], [5.0, 5.0], [10.0, 10.0]]);

        let mut gmm = Gmm::new().with_n_components(2).with_seed(42);
        gmm.fit(&data).unwrap();

        // Each row should sum to ~1
        for record in data.records() {
            let probs = gmm.distribution(record).unwrap();
            assert_eq!(probs.len(), 2);
            let sum: f64 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_components_capped_at_n() {
        let data = dataset(&[[0.0, 0.0], [1.0, 1.0]]);
        let mut gmm = Gmm::new().with_seed(1);
        gmm.fit(&data).unwrap();
        assert_eq!(gmm.n_clusters().unwrap(), 2);
    }

    #[test]
    fn test_missing_values_marginalised() {
        let data = dataset(&[[0.0, 0.0], [0.2, f64::NAN], [10.0, 10.0], [f64::NAN, 10.2]]);
        let mut gmm = Gmm::new().with_n_components(2).with_seed(7);
        gmm.fit(&data).unwrap();

        let all_missing = Record::new(vec![f64::NAN, f64::NAN]);
        let probs = gmm.distribution(&all_missing).unwrap();
        let weights = gmm.weights().unwrap();
        for (p, w) in probs.iter().zip(weights.iter()) {
            assert!((p - w).abs() < 1e-9);
        }
    }

    #[test]
    fn test_not_fitted() {
        let gmm = Gmm::new();
        assert_eq!(gmm.n_clusters(), Err(Error::NotFitted));
        assert_eq!(gmm.distribution(&Record::new(vec![1.0])), Err(Error::NotFitted));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut gmm = Gmm::new().with_n_components(1).with_seed(3);
        gmm.fit(&dataset(&[[0.0, 1.0], [1.0, 0.0]])).unwrap();
        assert!(matches!(
            gmm.distribution(&Record::new(vec![1.0])),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_empty_input_error() {
        let mut gmm = Gmm::new();
        assert_eq!(gmm.fit(&dataset(&[])), Err(Error::EmptyInput));
    }

    #[test]
    fn test_options_round_trip() {
        let mut opts = crate::options::to_options(["-N", "3", "-S", "9", "-I", "20"]);
        let mut gmm = Gmm::new();
        gmm.set_options(&mut opts).unwrap();
        assert!(opts.is_empty());

        let mut again = Gmm::new();
        again.set_options(&mut gmm.options()).unwrap();
        assert_eq!(again.options(), gmm.options());
        assert_eq!(again.n_components, 3);
        assert_eq!(again.seed, Some(9));
    }

    #[test]
    fn test_non_positive_reg_covar_rejected() {
        for bad in ["0", "-1e-3", "NaN"] {
            let mut opts = crate::options::to_options(["-M", bad]);
            assert!(
                matches!(
                    Gmm::new().set_options(&mut opts),
                    Err(Error::InvalidParameter { name: "reg_covar", .. })
                ),
                "-M {bad}"
            );
        }

        // Constant column: a zero floor would give ln(0).
        let mut gmm = Gmm::new().with_n_components(1).with_reg_covar(0.0);
        assert!(matches!(
            gmm.fit(&dataset(&[[1.0, 1.0], [1.0, 1.0]])),
            Err(Error::InvalidParameter { name: "reg_covar", .. })
        ));
    }
}
