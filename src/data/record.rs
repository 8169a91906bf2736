//! Records and datasets.

use super::schema::Schema;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// One row: values in schema order plus a weight.
///
/// Nominal values are stored as the index of their label. Missing values are
/// `NaN` (serialised as `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(with = "missing_as_null")]
    values: Vec<f64>,
    #[serde(default = "unit_weight")]
    weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

impl Record {
    /// A record with weight 1.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, weight: 1.0 }
    }

    /// A record with an explicit weight.
    pub fn with_weight(values: Vec<f64>, weight: f64) -> Self {
        Self { values, weight }
    }

    /// Values in column order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at `index` (`NaN` when missing).
    pub fn value(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(f64::NAN)
    }

    /// Whether the value at `index` is missing.
    pub fn is_missing(&self, index: usize) -> bool {
        self.value(index).is_nan()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the record has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Record weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }
}

/// A schema plus rows of matching width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct RawDataset {
    schema: Schema,
    #[serde(default)]
    records: Vec<Record>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = Error;

    fn try_from(raw: RawDataset) -> Result<Self> {
        Dataset::from_records(raw.schema, raw.records)
    }
}

impl Dataset {
    /// An empty dataset with the given schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            records: Vec::new(),
        }
    }

    /// Build a dataset, checking every record's width.
    pub fn from_records(schema: Schema, records: Vec<Record>) -> Result<Self> {
        let mut dataset = Self::new(schema);
        for record in records {
            dataset.push(record)?;
        }
        Ok(dataset)
    }

    /// Append a record.
    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.len() != self.schema.width() {
            return Err(Error::DimensionMismatch {
                expected: self.schema.width(),
                found: record.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// The schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// All records in insertion order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split back into parts.
    pub fn into_parts(self) -> (Schema, Vec<Record>) {
        (self.schema, self.records)
    }
}

mod missing_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], s: S) -> Result<S::Ok, S::Error> {
        let opts: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        opts.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
        let opts = Vec::<Option<f64>>::deserialize(d)?;
        Ok(opts.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Attribute;

    fn schema() -> Schema {
        Schema::new("r", vec![Attribute::numeric("a"), Attribute::numeric("b")])
    }

    #[test]
    fn test_push_checks_width() {
        let mut ds = Dataset::new(schema());
        assert!(ds.push(Record::new(vec![1.0, 2.0])).is_ok());
        assert_eq!(
            ds.push(Record::new(vec![1.0])),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn test_missing_serialises_as_null() {
        let ds = Dataset::from_records(schema(), vec![Record::with_weight(vec![1.0, f64::NAN], 2.0)])
            .unwrap();
        let json = serde_json::to_string(&ds).unwrap();
        assert!(json.contains("[1.0,null]"));

        let back: Dataset = serde_json::from_str(&json).unwrap();
        assert!(back.records()[0].is_missing(1));
        assert_eq!(back.records()[0].weight(), 2.0);
    }

    #[test]
    fn test_deserialize_checks_record_width() {
        let json = r#"{"schema":{"relation":"r","attributes":[
            {"name":"a","kind":"numeric"},{"name":"b","kind":"numeric"}
        ]},"records":[{"values":[1.0,2.0]},{"values":[3.0]}]}"#;
        let err = serde_json::from_str::<Dataset>(json).unwrap_err();
        assert!(err.to_string().contains("dimension"), "{err}");
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let record: Record = serde_json::from_str(r#"{"values":[3.0]}"#).unwrap();
        assert_eq!(record.weight(), 1.0);
    }
}
