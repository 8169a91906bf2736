//! Clustering traits.

use crate::data::{Dataset, Record};
use crate::error::Result;
use crate::options::{Configurable, OptionDescription};
use std::fmt;

/// A clustering model that is fitted once and then queried per record.
///
/// Every column of the dataset passed to [`fit`](Clusterer::fit) is treated as
/// a feature; callers strip label or ignored columns beforehand.
pub trait Clusterer: Configurable + fmt::Debug {
    /// Registry name, as accepted by [`clusterer_for_name`](super::clusterer_for_name).
    fn name(&self) -> &'static str;

    /// Fit the model to `data`, replacing any previous fit.
    fn fit(&mut self, data: &Dataset) -> Result<()>;

    /// Number of clusters of the fitted model.
    fn n_clusters(&self) -> Result<usize>;

    /// Membership probabilities for `record`, one entry per cluster.
    fn distribution(&self, record: &Record) -> Result<Vec<f64>>;

    /// Most probable cluster for `record`.
    fn cluster(&self, record: &Record) -> Result<usize> {
        let probs = self.distribution(record)?;
        Ok(probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0))
    }
}

impl<C: Configurable + ?Sized> Configurable for Box<C> {
    fn set_options(&mut self, options: &mut Vec<String>) -> Result<()> {
        (**self).set_options(options)
    }

    fn options(&self) -> Vec<String> {
        (**self).options()
    }

    fn describe_options(&self) -> Vec<OptionDescription> {
        (**self).describe_options()
    }
}

impl<C: Clusterer + ?Sized> Clusterer for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fit(&mut self, data: &Dataset) -> Result<()> {
        (**self).fit(data)
    }

    fn n_clusters(&self) -> Result<usize> {
        (**self).n_clusters()
    }

    fn distribution(&self, record: &Record) -> Result<Vec<f64>> {
        (**self).distribution(record)
    }

    fn cluster(&self, record: &Record) -> Result<usize> {
        (**self).cluster(record)
    }
}
