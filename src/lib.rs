//! # membership
//!
//! Cluster-membership filtering: fit a clusterer on a batch of records and
//! replace every record with its vector of cluster-membership probabilities,
//! optionally keeping the label column.
//!
//! The pieces compose rather than inherit:
//!
//! - [`filter`]: the batch/streaming [`Filter`] protocol, the
//!   [`ClusterMembership`] transform and the [`RemoveColumns`] filter it uses
//!   to hide ignored columns from the clusterer.
//! - [`cluster`]: the [`Clusterer`] trait plus [`Gmm`] (default) and [`Kmeans`].
//! - [`options`]: flat-argument configuration ([`Configurable`]).
//! - [`data`]: schemas, records, datasets and column ranges.
//!
//! ```rust
//! use membership::data::{Attribute, Dataset, Record, Schema};
//! use membership::{use_filter, ClusterMembership, Gmm};
//!
//! let schema = Schema::new("pts", vec![Attribute::numeric("x"), Attribute::numeric("y")]);
//! let rows = [[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
//! let data = Dataset::from_records(
//!     schema,
//!     rows.iter().map(|r| Record::new(r.to_vec())).collect(),
//! )
//! .unwrap();
//!
//! let mut filter = ClusterMembership::new(Gmm::new().with_n_components(2).with_seed(42));
//! let out = use_filter(&mut filter, &data).unwrap();
//! assert_eq!(out.schema().width(), 2); // pCluster0, pCluster1
//! ```

pub mod cluster;
pub mod data;
/// Error types used across `membership`.
pub mod error;
pub mod filter;
pub mod options;


pub use cluster::{clusterer_for_name, Clusterer, Gmm, Kmeans};
pub use data::{Attribute, AttributeKind, ColumnRange, Dataset, Record, Schema};
pub use error::{Error, Result};
pub use filter::{
    filter_batch, filter_incremental, use_filter, ClusterMembership, Filter, FilterState,
    RemoveColumns,
};
pub use options::{Configurable, OptionDescription};
