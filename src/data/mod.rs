//! Dataset model: typed columns, weighted records, column ranges.
//!
//! Values are stored as `f64` regardless of column kind. A nominal value is
//! the index of its label within the column's value list, and a missing value
//! is `NaN`. This keeps records cheap to copy between filters while the
//! [`Schema`] carries everything needed to render them.

mod range;
mod record;
mod schema;

pub use range::ColumnRange;
pub use record::{Dataset, Record};
pub use schema::{Attribute, AttributeKind, Schema};
