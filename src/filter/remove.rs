//! Column removal.

use super::{Filter, FilterState, OutputQueue, NO_INPUT_SCHEMA, NO_OUTPUT_SCHEMA};
use crate::data::{ColumnRange, Record, Schema};
use crate::error::{Error, Result};
use crate::options::{get_flag, get_option, Configurable, OptionDescription};

#[derive(Debug)]
enum Stage {
    Unconfigured,
    Streaming {
        input: Schema,
        output: Schema,
        keep: Vec<usize>,
    },
}

/// Drops the columns named by a [`ColumnRange`].
///
/// With `invert` set, keeps only the named columns instead. The output schema
/// depends only on the input schema, so records stream through immediately.
/// The label column keeps its role if it survives and loses it otherwise.
#[derive(Debug)]
pub struct RemoveColumns {
    range: ColumnRange,
    stage: Stage,
    queue: OutputQueue,
}

impl RemoveColumns {
    /// Remove the columns selected by `range`.
    pub fn new(range: ColumnRange) -> Self {
        Self {
            range,
            stage: Stage::Unconfigured,
            queue: OutputQueue::default(),
        }
    }

    /// Parse a range string such as `1,3-last`.
    pub fn from_ranges(ranges: &str) -> Result<Self> {
        Ok(Self::new(ColumnRange::parse(ranges)?))
    }

    /// Keep the selected columns rather than remove them.
    pub fn with_invert(mut self, invert: bool) -> Self {
        self.set_invert(invert);
        self
    }

    /// Keep the selected columns rather than remove them.
    pub fn set_invert(&mut self, invert: bool) {
        self.range = self.range.clone().inverted(invert);
    }

    /// The configured range.
    pub fn range(&self) -> &ColumnRange {
        &self.range
    }
}

impl Filter for RemoveColumns {
    fn set_input_schema(&mut self, schema: Schema) -> Result<bool> {
        self.queue.reset();

        let removed = self.range.selection(schema.width());
        let keep: Vec<usize> = removed
            .iter()
            .enumerate()
            .filter_map(|(i, &r)| (!r).then_some(i))
            .collect();

        let attributes = keep
            .iter()
            .filter_map(|&i| schema.attribute(i).cloned())
            .collect();
        let mut output = Schema::new(schema.relation.clone(), attributes);
        let label = schema
            .label_index()
            .and_then(|l| keep.iter().position(|&k| k == l));
        output.set_label(label)?;

        self.stage = Stage::Streaming {
            input: schema,
            output,
            keep,
        };
        Ok(true)
    }

    fn input(&mut self, record: Record) -> Result<bool> {
        let Stage::Streaming { input, keep, .. } = &self.stage else {
            return Err(Error::InvalidState(NO_INPUT_SCHEMA));
        };
        if record.len() != input.width() {
            return Err(Error::DimensionMismatch {
                expected: input.width(),
                found: record.len(),
            });
        }
        let values = keep.iter().map(|&i| record.value(i)).collect();
        let reduced = Record::with_weight(values, record.weight());

        self.queue.begin_input();
        self.queue.push(reduced);
        Ok(true)
    }

    fn batch_complete(&mut self) -> Result<bool> {
        if let Stage::Unconfigured = self.stage {
            return Err(Error::InvalidState(NO_INPUT_SCHEMA));
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
            Stage::Streaming { input, .. } => Some(input),
        }
    }

    fn output_schema(&self) -> Result<&Schema> {
        match &self.stage {
            Stage::Unconfigured => Err(Error::InvalidState(NO_OUTPUT_SCHEMA)),
            Stage::Streaming { output, .. } => Ok(output),
        }
    }

    fn state(&self) -> FilterState {
        match self.stage {
            Stage::Unconfigured => FilterState::Unconfigured,
            Stage::Streaming { .. } => FilterState::Streaming,
        }
    }
}

impl Configurable for RemoveColumns {
    fn set_options(&mut self, options: &mut Vec<String>) -> Result<()> {
        let invert = get_flag('V', options);
        if let Some(ranges) = get_option('R', options)? {
            self.range = ColumnRange::parse(&ranges)?;
        }
        self.set_invert(invert);
        Ok(())
    }

    fn options(&self) -> Vec<String> {
        let mut opts = vec!["-R".to_string(), self.range.ranges().to_string()];
        if self.range.is_inverted() {
            opts.push("-V".to_string());
        }
        opts
    }

    fn describe_options(&self) -> Vec<OptionDescription> {
        vec![
            OptionDescription {
                flag: 'R',
                synopsis: "-R <col1,col2-col4,...>",
                description: "Columns to remove; 'first' and 'last' are valid indices.",
            },
            OptionDescription {
                flag: 'V',
                synopsis: "-V",
                description: "Keep the named columns and remove the rest.",
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Attribute, Dataset};
    use crate::filter::use_filter;
    use crate::options::to_options;

    fn schema() -> Schema {
        Schema::new(
            "weather",
            vec![
                Attribute::numeric("a"),
                Attribute::numeric("b"),
                Attribute::numeric("c"),
                Attribute::nominal("play", ["yes", "no"]),
            ],
        )
        .with_label(3)
        .unwrap()
    }

    #[test]
    fn test_removes_named_columns() {
        let mut f = RemoveColumns::from_ranges("2").unwrap();
        assert!(f.set_input_schema(schema()).unwrap());
        assert_eq!(f.state(), FilterState::Streaming);

        let out = f.output_schema().unwrap();
        let names: Vec<&str> = out.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["a", "c", "play"]);
        assert_eq!(out.label_index(), Some(2));

        assert!(f.input(Record::with_weight(vec![1.0, 2.0, 3.0, 0.0], 0.5)).unwrap());
        let r = f.output().unwrap();
        assert_eq!(r.values(), &[1.0, 3.0, 0.0]);
        assert_eq!(r.weight(), 0.5);
    }

    #[test]
    fn test_label_dropped_when_removed() {
        let mut f = RemoveColumns::from_ranges("last").unwrap();
        f.set_input_schema(schema()).unwrap();
        assert_eq!(f.output_schema().unwrap().label_index(), None);
        assert_eq!(f.output_schema().unwrap().width(), 3);
    }

    #[test]
    fn test_invert_keeps_named_columns() {
        let mut f = RemoveColumns::from_ranges("first,3").unwrap().with_invert(true);
        let data = Dataset::from_records(schema(), vec![Record::new(vec![1.0, 2.0, 3.0, 1.0])]).unwrap();
        let out = use_filter(&mut f, &data).unwrap();
        assert_eq!(out.schema().width(), 2);
        assert_eq!(out.records()[0].values(), &[1.0, 3.0]);
    }

    #[test]
    fn test_unconfigured_errors() {
        let mut f = RemoveColumns::from_ranges("1").unwrap();
        assert_eq!(
            f.input(Record::new(vec![1.0])),
            Err(Error::InvalidState(NO_INPUT_SCHEMA))
        );
        assert!(f.batch_complete().is_err());
        assert!(f.output_schema().is_err());
    }

    #[test]
    fn test_uncollected_output_cleared_after_batch() {
        let mut f = RemoveColumns::from_ranges("1").unwrap();
        f.set_input_schema(schema()).unwrap();
        f.input(Record::new(vec![1.0, 2.0, 3.0, 0.0])).unwrap();
        assert!(f.batch_complete().unwrap());
        assert_eq!(f.num_pending(), 1);

        f.input(Record::new(vec![4.0, 5.0, 6.0, 1.0])).unwrap();
        assert_eq!(f.num_pending(), 1);
        assert_eq!(f.output().unwrap().values(), &[5.0, 6.0, 1.0]);
    }

    #[test]
    fn test_options() {
        let mut f = RemoveColumns::from_ranges("1").unwrap();
        let mut opts = to_options(["-R", "2-3", "-V"]);
        f.set_options(&mut opts).unwrap();
        assert!(opts.is_empty());
        assert_eq!(f.options(), to_options(["-R", "2-3", "-V"]));
    }
}
