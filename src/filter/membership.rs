//! Cluster-membership transform.
//!
//! Replaces each record with the probability that it belongs to each cluster
//! of a clusterer fitted on the batch itself. The output schema is
//! `pCluster0 .. pCluster{k-1}`, followed by a copy of the label column when
//! the input has one.
//!
//! The label column never takes part in clustering, and neither do the
//! columns named by the ignored range. The label value written to the output
//! is taken from the original record, not from the reduced one.

use super::{
    Filter, FilterState, OutputQueue, RemoveColumns, NO_INPUT_SCHEMA, NO_OUTPUT_SCHEMA,
};
use crate::cluster::{clusterer_for_name, Clusterer, Gmm};
use crate::data::{Attribute, ColumnRange, Dataset, Record, Schema};
use crate::error::{Error, Result};
use crate::options::{
    check_for_remaining_options, get_option, partition_options, Configurable,
    OptionDescription, NESTED_SEPARATOR,
};
use tracing::{debug, info};

#[derive(Debug)]
enum Stage {
    Unconfigured,
    /// Records are buffered until the batch is complete.
    AwaitingBatch { batch: Dataset },
    /// The clusterer is fitted; records convert on arrival.
    Streaming {
        input: Schema,
        output: Schema,
        exclusion: Option<RemoveColumns>,
    },
}

/// Turns records into cluster-membership probability vectors.
///
/// The first batch after [`set_input_schema`](Filter::set_input_schema) is
/// buffered in full; [`batch_complete`](Filter::batch_complete) fits the
/// clusterer on it (minus the label and ignored columns) and converts it.
/// From then on records are converted as they arrive, until the input schema
/// is set again.
#[derive(Debug)]
pub struct ClusterMembership<C = Box<dyn Clusterer>> {
    clusterer: C,
    ignored: Option<ColumnRange>,
    stage: Stage,
    queue: OutputQueue,
}

impl Default for ClusterMembership {
    fn default() -> Self {
        Self::new(Box::new(Gmm::new()))
    }
}

impl<C: Clusterer> ClusterMembership<C> {
    /// Use `clusterer` to produce membership probabilities.
    pub fn new(clusterer: C) -> Self {
        Self {
            clusterer,
            ignored: None,
            stage: Stage::Unconfigured,
            queue: OutputQueue::default(),
        }
    }

    /// Ignore the columns named by `ranges` (e.g. `first-3,5,9-last`) while
    /// clustering.
    pub fn with_ignored_columns(mut self, ranges: &str) -> Result<Self> {
        self.set_ignored_columns(ranges)?;
        Ok(self)
    }

    /// Set the ignored column range; an empty string ignores nothing.
    pub fn set_ignored_columns(&mut self, ranges: &str) -> Result<()> {
        self.ignored = if ranges.trim().is_empty() {
            None
        } else {
            Some(ColumnRange::parse(ranges)?)
        };
        Ok(())
    }

    /// The ignored column range, or an empty string.
    pub fn ignored_columns(&self) -> String {
        self.ignored
            .as_ref()
            .map(|r| r.ranges().to_string())
            .unwrap_or_default()
    }

    /// The clusterer.
    pub fn clusterer(&self) -> &C {
        &self.clusterer
    }

    /// The clusterer, mutably.
    pub fn clusterer_mut(&mut self) -> &mut C {
        &mut self.clusterer
    }

    /// Replace the clusterer. Takes effect at the next fit.
    pub fn set_clusterer(&mut self, clusterer: C) {
        self.clusterer = clusterer;
    }

    /// Give back the clusterer, fitted if a batch has completed.
    pub fn into_clusterer(self) -> C {
        self.clusterer
    }

    /// One-paragraph description of the filter.
    pub fn describe(&self) -> &'static str {
        "Uses a clusterer to generate cluster membership probabilities; filtered \
         records are composed of these probabilities plus the label column (if set \
         in the input data). The label column (if set) and any user-specified \
         columns are ignored during clustering."
    }

    /// Build the reduced training view, fit the clusterer and derive the
    /// output schema.
    fn train(
        clusterer: &mut C,
        ignored: Option<&ColumnRange>,
        batch: &Dataset,
    ) -> Result<(Schema, Option<RemoveColumns>)> {
        let input = batch.schema();
        let label = input.label_index();

        let mut exclusion = None;
        let reduced;
        let training = if ignored.is_some() || label.is_some() {
            let mut ranges = ignored.map(|r| r.ranges().to_string()).unwrap_or_default();
            if let Some(l) = label {
                if !ranges.is_empty() {
                    ranges.push(',');
                }
                ranges.push_str(&(l + 1).to_string());
            }
            debug!(ranges = %ranges, "excluding columns from clustering");

            let mut remove = RemoveColumns::from_ranges(&ranges)?.with_invert(false);
            remove.set_input_schema(input.clone())?;
            for record in batch.records() {
                remove.input(record.clone())?;
            }
            remove.batch_complete()?;

            let mut view = Dataset::new(remove.output_schema()?.clone());
            while let Some(record) = remove.output() {
                view.push(record)?;
            }
            exclusion = Some(remove);
            reduced = view;
            &reduced
        } else {
            batch
        };

        clusterer.fit(training)?;
        let k = clusterer.n_clusters()?;
        info!(
            clusterer = clusterer.name(),
            clusters = k,
            records = training.len(),
            features = training.schema().width(),
            "fitted clusterer"
        );

        Ok((membership_schema(input, k)?, exclusion))
    }
}

/// `pCluster0..pCluster{k-1}` plus the label column, if any, as the new label.
fn membership_schema(input: &Schema, k: usize) -> Result<Schema> {
    let mut attributes: Vec<Attribute> = (0..k)
        .map(|i| Attribute::numeric(format!("pCluster{i}")))
        .collect();
    if let Some(label) = input.label_attribute() {
        attributes.push(label.clone());
    }
    let mut schema = Schema::new(format!("{}_clusterMembership", input.relation), attributes);
    if input.label_index().is_some() {
        schema.set_label(Some(schema.width() - 1))?;
    }
    Ok(schema)
}

/// Convert one record into the membership schema.
fn convert<C: Clusterer>(
    clusterer: &C,
    exclusion: Option<&mut RemoveColumns>,
    output: &Schema,
    label: Option<usize>,
    record: &Record,
) -> Result<Record> {
    let probs = match exclusion {
        Some(remove) => {
            remove.input(record.clone())?;
            let reduced = remove
                .output()
                .ok_or(Error::InvalidState("exclusion filter produced no record"))?;
            clusterer.distribution(&reduced)?
        }
        None => clusterer.distribution(record)?,
    };

    let k = output.width() - usize::from(label.is_some());
    if probs.len() != k {
        return Err(Error::DimensionMismatch {
            expected: k,
            found: probs.len(),
        });
    }

    let mut values = vec![0.0; output.width()];
    values[..k].copy_from_slice(&probs);
    if let Some(l) = label {
        values[k] = record.value(l);
    }
    Ok(Record::with_weight(values, record.weight()))
}

impl<C: Clusterer> Filter for ClusterMembership<C> {
    fn set_input_schema(&mut self, schema: Schema) -> Result<bool> {
        debug!(relation = %schema.relation, width = schema.width(), "membership input schema set");
        self.queue.reset();
        self.stage = Stage::AwaitingBatch {
            batch: Dataset::new(schema),
        };
        Ok(false)
    }

    fn input(&mut self, record: Record) -> Result<bool> {
        let width = self
            .input_schema()
            .ok_or(Error::InvalidState(NO_INPUT_SCHEMA))?
            .width();
        if record.len() != width {
            return Err(Error::DimensionMismatch {
                expected: width,
                found: record.len(),
            });
        }
        self.queue.begin_input();

        match &mut self.stage {
            Stage::Unconfigured => Err(Error::InvalidState(NO_INPUT_SCHEMA)),
            Stage::AwaitingBatch { batch } => {
                batch.push(record)?;
                Ok(false)
            }
            Stage::Streaming {
                input,
                output,
                exclusion,
            } => {
                let converted = convert(
                    &self.clusterer,
                    exclusion.as_mut(),
                    output,
                    input.label_index(),
                    &record,
                )?;
                self.queue.push(converted);
                Ok(true)
            }
        }
    }

    fn batch_complete(&mut self) -> Result<bool> {
        match &self.stage {
            Stage::Unconfigured => return Err(Error::InvalidState(NO_INPUT_SCHEMA)),
            Stage::Streaming { .. } => {}
            Stage::AwaitingBatch { batch } => {
                let (output, mut exclusion) =
                    Self::train(&mut self.clusterer, self.ignored.as_ref(), batch)?;

                let label = batch.schema().label_index();
                let converted = batch
                    .records()
                    .iter()
                    .map(|r| convert(&self.clusterer, exclusion.as_mut(), &output, label, r))
                    .collect::<Result<Vec<_>>>()?;

                debug!(records = converted.len(), "membership batch converted");
                let input = batch.schema().clone();
                self.queue.extend(converted);
                self.stage = Stage::Streaming {
                    input,
                    output,
                    exclusion,
                };
            }
        }
        Ok(self.queue.end_batch())
    }

    fn output(&mut self) -> Option<Record> {
        self.queue.pop()
    }

    fn peek_output(&self) -> Option<&Record> {
        self.queue.peek()
    }

    fn num_pending(&self) -> usize {
        self.queue.len()
    }

    fn input_schema(&self) -> Option<&Schema> {
        match &self.stage {
            Stage::Unconfigured => None,
            Stage::AwaitingBatch { batch } => Some(batch.schema()),
            Stage::Streaming { input, .. } => Some(input),
        }
    }

    fn output_schema(&self) -> Result<&Schema> {
        match &self.stage {
            Stage::Streaming { output, .. } => Ok(output),
            _ => Err(Error::InvalidState(NO_OUTPUT_SCHEMA)),
        }
    }

    fn state(&self) -> FilterState {
        match self.stage {
            Stage::Unconfigured => FilterState::Unconfigured,
            Stage::AwaitingBatch { .. } => FilterState::AwaitingBatch,
            Stage::Streaming { .. } => FilterState::Streaming,
        }
    }
}

impl Configurable for ClusterMembership {
    /// `-W <clusterer> [-I <range>] [-- <clusterer options>]`.
    fn set_options(&mut self, options: &mut Vec<String>) -> Result<()> {
        let name = get_option('W', options)?
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                Error::Config("a clusterer must be specified with the -W option".to_string())
            })?;
        let mut nested = partition_options(options);
        let clusterer = clusterer_for_name(&name, &mut nested)?;

        let ignored = get_option('I', options)?.unwrap_or_default();
        check_for_remaining_options(options)?;

        self.set_ignored_columns(&ignored)?;
        self.clusterer = clusterer;
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut opts = Vec::new();
        if let Some(range) = &self.ignored {
            opts.push("-I".to_string());
            opts.push(range.ranges().to_string());
        }
        opts.push("-W".to_string());
        opts.push(self.clusterer.name().to_string());
        opts.push(NESTED_SEPARATOR.to_string());
        opts.extend(self.clusterer.options());
        opts
    }

    fn describe_options(&self) -> Vec<OptionDescription> {
        vec![
            OptionDescription {
                flag: 'W',
                synopsis: "-W <clusterer name>",
                description: "Clusterer that generates membership probabilities (required), \
                              e.g. gmm. Its options follow a --.",
            },
            OptionDescription {
                flag: 'I',
                synopsis: "-I <col1,col2-col4,...>",
                description: "Columns the clusterer should ignore, e.g. first-3,5,9-last. \
                              The label column is always ignored.",
            },
        ]
    }
}
