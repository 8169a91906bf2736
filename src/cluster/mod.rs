//! Clustering models that produce membership distributions.
//!
//! The membership filter only needs a fitted model that can answer "how
//! likely is this record to belong to each cluster". Anything implementing
//! [`Clusterer`] can be injected; two are provided.
//!
//! ## Hard vs Soft Clustering
//!
//! **Soft clustering** gives each record a probability distribution over
//! clusters. A record sitting between two groups gets split membership
//! rather than being forced into one.
//!
//! **Hard clustering** assigns each record to exactly one cluster. Its
//! membership distribution is one-hot.
//!
//! ## Algorithms
//!
//! ### Gaussian Mixture Model ([`Gmm`], default)
//!
//! Models data as a mixture of k diagonal Gaussians fitted by EM:
//!
//! ```text
//! P(x) = Σ π_k × N(x | μ_k, Σ_k)
//! ```
//!
//! ### K-means ([`Kmeans`])
//!
//! Assign each point to the nearest centroid, then move centroids to the
//! weighted mean of their points. Repeat.
//!
//! ## Usage
//!
//! ```rust
//! use membership::cluster::{Clusterer, Gmm};
//! use membership::data::{Attribute, Dataset, Record, Schema};
//!
//! let schema = Schema::new("pts", vec![Attribute::numeric("x"), Attribute::numeric("y")]);
//! let rows = [[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
//! let data = Dataset::from_records(
//!     schema,
//!     rows.iter().map(|r| Record::new(r.to_vec())).collect(),
//! )
//! .unwrap();
//!
//! let mut gmm = Gmm::new().with_n_components(2).with_seed(42);
//! gmm.fit(&data).unwrap();
//! let probs = gmm.distribution(&data.records()[0]).unwrap();
//! assert_eq!(probs.len(), 2);
//! ```
//!
//! ## By name
//!
//! [`clusterer_for_name`] builds a clusterer from a registry name plus flat
//! options, which is how the membership filter's `-W` option is resolved.

mod gmm;
mod kmeans;
mod traits;

pub use gmm::Gmm;
pub use kmeans::Kmeans;
pub use traits::Clusterer;

use crate::data::Dataset;
use crate::error::{Error, Result};
use crate::options::{check_for_remaining_options, Configurable};
use ndarray::Array2;

/// Registered clusterer names and what they build.
pub const CLUSTERER_NAMES: &[&str] = &["gmm", "em", "kmeans", "simplekmeans"];

/// Build a clusterer by name and configure it from `options`.
///
/// Names are case-insensitive. Every option must be consumed.
pub fn clusterer_for_name(name: &str, options: &mut Vec<String>) -> Result<Box<dyn Clusterer>> {
    let mut clusterer: Box<dyn Clusterer> = match name.to_ascii_lowercase().as_str() {
        "gmm" | "em" => Box::new(Gmm::new()),
        "kmeans" | "simplekmeans" => Box::new(Kmeans::default()),
        _ => return Err(Error::UnknownClusterer(name.to_string())),
    };
    clusterer.set_options(options)?;
    check_for_remaining_options(options)?;
    Ok(clusterer)
}

/// Copy a dataset's values into an n × d matrix.
pub(crate) fn to_matrix(data: &Dataset) -> Result<Array2<f64>> {
    let n = data.len();
    let d = data.schema().width();
    let mut flat: Vec<f64> = Vec::with_capacity(n * d);
    for record in data.records() {
        if record.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: record.len(),
            });
        }
        flat.extend_from_slice(record.values());
    }
    Array2::from_shape_vec((n, d), flat).map_err(|e| Error::Other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::to_options;

    #[test]
    fn test_lookup_by_name() {
        let mut opts = to_options(["-N", "3"]);
        let c = clusterer_for_name("EM", &mut opts).unwrap();
        assert_eq!(c.name(), "gmm");
        assert_eq!(&c.options()[..2], &["-N".to_string(), "3".to_string()]);

        let c = clusterer_for_name("kmeans", &mut Vec::new()).unwrap();
        assert_eq!(c.name(), "kmeans");
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(
            clusterer_for_name("cobweb", &mut Vec::new()).unwrap_err(),
            Error::UnknownClusterer("cobweb".to_string())
        );
    }

    #[test]
    fn test_leftover_options_rejected() {
        let mut opts = to_options(["-Z", "1"]);
        assert!(matches!(
            clusterer_for_name("gmm", &mut opts),
            Err(Error::Config(_))
        ));
    }
}
