//! Batch/streaming record filters.
//!
//! Every filter follows the same protocol:
//!
//! ```text
//!   Unconfigured ──set_input_schema──▶ AwaitingBatch ──batch_complete──▶ Streaming
//!        ▲                                   │                               │
//!        └────────── set_input_schema resets everything ◀───────────────────┘
//! ```
//!
//! - [`Filter::set_input_schema`] announces the schema of the records about to
//!   arrive and returns whether the output schema is already known.
//! - [`Filter::input`] either converts a record straight away (returns `true`)
//!   or buffers it until the batch is complete (returns `false`).
//! - [`Filter::batch_complete`] ends the batch. A filter that needs to see
//!   the whole batch (e.g. to fit a model) establishes its output schema here,
//!   exactly once per input schema; later calls only flush.
//! - Converted records are pulled with [`Filter::output`].
//!
//! After `batch_complete`, the next `input` discards any output that was
//! never collected, so pending records never leak across batches.
//!
//! Filters that can compute their output schema from the input schema alone,
//! such as [`RemoveColumns`], move to `Streaming` directly in
//! `set_input_schema`.

mod membership;
mod remove;

pub use membership::ClusterMembership;
pub use remove::RemoveColumns;

use crate::data::{Dataset, Record, Schema};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use tracing::debug;

pub(crate) const NO_INPUT_SCHEMA: &str = "no input schema defined";
pub(crate) const NO_OUTPUT_SCHEMA: &str = "no output schema defined";

/// Where a filter is in the batch/streaming protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// No input schema yet.
    Unconfigured,
    /// Input schema set; output schema not yet known.
    AwaitingBatch,
    /// Output schema known; records convert on arrival.
    Streaming,
}

/// A record transform following the batch/streaming protocol.
pub trait Filter {
    /// Announce the input schema and reset all state.
    ///
    /// Returns `true` if the output schema is available immediately.
    fn set_input_schema(&mut self, schema: Schema) -> Result<bool>;

    /// Submit one record.
    ///
    /// Returns `true` if converted output may be collected now.
    fn input(&mut self, record: Record) -> Result<bool>;

    /// End the current batch.
    ///
    /// Returns `true` if output records are pending.
    fn batch_complete(&mut self) -> Result<bool>;

    /// Take the next converted record.
    fn output(&mut self) -> Option<Record>;

    /// Look at the next converted record without taking it.
    fn peek_output(&self) -> Option<&Record>;

    /// Number of converted records waiting to be collected.
    fn num_pending(&self) -> usize;

    /// The current input schema.
    fn input_schema(&self) -> Option<&Schema>;

    /// The output schema, once established.
    fn output_schema(&self) -> Result<&Schema>;

    /// Current protocol state.
    fn state(&self) -> FilterState;
}

/// Converted records waiting to be collected, plus the batch boundary flag.
#[derive(Debug, Default)]
pub(crate) struct OutputQueue {
    pending: VecDeque<Record>,
    new_batch: bool,
}

impl OutputQueue {
    /// Drop everything (new input schema).
    pub(crate) fn reset(&mut self) {
        self.pending.clear();
        self.new_batch = false;
    }

    /// Called before accepting a record: clears output left from the previous batch.
    pub(crate) fn begin_input(&mut self) {
        if self.new_batch {
            if !self.pending.is_empty() {
                debug!(dropped = self.pending.len(), "discarding uncollected output from previous batch");
            }
            self.pending.clear();
            self.new_batch = false;
        }
    }

    pub(crate) fn push(&mut self, record: Record) {
        self.pending.push_back(record);
    }

    pub(crate) fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.pending.extend(records);
    }

    pub(crate) fn pop(&mut self) -> Option<Record> {
        self.pending.pop_front()
    }

    pub(crate) fn peek(&self) -> Option<&Record> {
        self.pending.front()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Mark the batch boundary; returns whether output is pending.
    pub(crate) fn end_batch(&mut self) -> bool {
        self.new_batch = true;
        !self.pending.is_empty()
    }
}

fn drain<F: Filter + ?Sized>(filter: &mut F, into: &mut Vec<Record>) {
    while let Some(record) = filter.output() {
        into.push(record);
    }
}

/// Run a whole dataset through `filter` as a single batch.
pub fn use_filter<F: Filter + ?Sized>(filter: &mut F, data: &Dataset) -> Result<Dataset> {
    filter.set_input_schema(data.schema().clone())?;
    for record in data.records() {
        filter.input(record.clone())?;
    }
    filter.batch_complete()?;

    let mut out = Vec::with_capacity(data.len());
    drain(filter, &mut out);
    Dataset::from_records(filter.output_schema()?.clone(), out)
}

/// Feed `data` one record at a time, collecting output as soon as the filter
/// reports it, then complete the batch.
pub fn filter_incremental<F: Filter + ?Sized>(filter: &mut F, data: &Dataset) -> Result<Dataset> {
    filter.set_input_schema(data.schema().clone())?;
    let mut out = Vec::with_capacity(data.len());
    let mut streamed = 0usize;
    for record in data.records() {
        if filter.input(record.clone())? {
            streamed += 1;
            drain(filter, &mut out);
        }
    }
    filter.batch_complete()?;
    drain(filter, &mut out);
    debug!(records = data.len(), streamed, "incremental filtering finished");
    Dataset::from_records(filter.output_schema()?.clone(), out)
}

/// Filter `first` as a training batch, then push `second` through the
/// output schema established by the first.
///
/// Both datasets must have the same columns and label column; relation
/// names may differ.
pub fn filter_batch<F: Filter + ?Sized>(
    filter: &mut F,
    first: &Dataset,
    second: &Dataset,
) -> Result<(Dataset, Dataset)> {
    if !first.schema().equal_headers(second.schema()) {
        return Err(Error::SchemaMismatch(format!(
            "second dataset '{}' does not match first dataset '{}'",
            second.schema().relation,
            first.schema().relation
        )));
    }
    let first_out = use_filter(filter, first)?;

    let mut out = Vec::with_capacity(second.len());
    for record in second.records() {
        filter.input(record.clone())?;
    }
    filter.batch_complete()?;
    drain(filter, &mut out);
    let second_out = Dataset::from_records(filter.output_schema()?.clone(), out)?;
    Ok((first_out, second_out))
}
