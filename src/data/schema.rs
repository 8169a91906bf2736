//! Column descriptions.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// What kind of values a column holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    /// Real-valued column.
    Numeric,
    /// Categorical column; records store the index into `values`.
    Nominal(Vec<String>),
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Column name.
    pub name: String,
    /// Column kind.
    pub kind: AttributeKind,
}

impl Attribute {
    /// A numeric column.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    /// A nominal column over the given labels.
    pub fn nominal<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether the column is nominal.
    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }

    /// Index of a nominal label, if this column has it.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        match &self.kind {
            AttributeKind::Nominal(values) => values.iter().position(|v| v == label),
            AttributeKind::Numeric => None,
        }
    }

    /// Render a stored value: the label for nominal columns, `?` when missing.
    pub fn format_value(&self, value: f64) -> String {
        if value.is_nan() {
            return "?".to_string();
        }
        match &self.kind {
            AttributeKind::Numeric => value.to_string(),
            AttributeKind::Nominal(values) if value >= 0.0 && value.fract() == 0.0 => values
                .get(value as usize)
                .cloned()
                .unwrap_or_else(|| value.to_string()),
            AttributeKind::Nominal(_) => value.to_string(),
        }
    }
}

/// Ordered list of columns, one of which may be the label column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct Schema {
    /// Relation (dataset) name.
    pub relation: String,
    attributes: Vec<Attribute>,
    label_index: Option<usize>,
}

impl Schema {
    /// Create a schema without a label column.
    pub fn new(relation: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            relation: relation.into(),
            attributes,
            label_index: None,
        }
    }

    /// Mark column `index` as the label column.
    pub fn with_label(mut self, index: usize) -> Result<Self> {
        self.set_label(Some(index))?;
        Ok(self)
    }

    /// Set or clear the label column.
    pub fn set_label(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            if i >= self.attributes.len() {
                return Err(Error::DimensionMismatch {
                    expected: self.attributes.len(),
                    found: i + 1,
                });
            }
        }
        self.label_index = index;
        Ok(())
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.attributes.len()
    }

    /// All columns in order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Column at `index`.
    pub fn attribute(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    /// Index of the label column.
    pub fn label_index(&self) -> Option<usize> {
        self.label_index
    }

    /// The label column itself.
    pub fn label_attribute(&self) -> Option<&Attribute> {
        self.label_index.and_then(|i| self.attributes.get(i))
    }

    /// Same columns and label column; the relation name is not compared.
    pub fn equal_headers(&self, other: &Schema) -> bool {
        self.attributes == other.attributes && self.label_index == other.label_index
    }
}

#[derive(Deserialize)]
struct RawSchema {
    relation: String,
    attributes: Vec<Attribute>,
    #[serde(default)]
    label_index: Option<usize>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = Error;

    fn try_from(raw: RawSchema) -> Result<Self> {
        let mut schema = Schema::new(raw.relation, raw.attributes);
        schema.set_label(raw.label_index)?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_out_of_bounds() {
        let schema = Schema::new("r", vec![Attribute::numeric("a")]);
        assert!(schema.clone().with_label(0).is_ok());
        assert!(schema.with_label(1).is_err());
    }

    #[test]
    fn test_format_nominal_and_missing() {
        let att = Attribute::nominal("class", ["yes", "no"]);
        assert_eq!(att.format_value(1.0), "no");
        assert_eq!(att.format_value(f64::NAN), "?");
        assert_eq!(att.index_of("yes"), Some(0));
        assert_eq!(Attribute::numeric("x").format_value(2.5), "2.5");
    }

    #[test]
    fn test_format_rejects_bad_nominal_index() {
        let att = Attribute::nominal("class", ["yes", "no"]);
        assert_eq!(att.format_value(-1.0), "-1");
        assert_eq!(att.format_value(1.7), "1.7");
        assert_eq!(att.format_value(2.0), "2");
    }

    #[test]
    fn test_equal_headers_ignores_relation() {
        let attrs = vec![Attribute::numeric("a"), Attribute::nominal("class", ["x", "y"])];
        let train = Schema::new("iris-train", attrs.clone()).with_label(1).unwrap();
        let test = Schema::new("iris-test", attrs.clone()).with_label(1).unwrap();
        assert!(train.equal_headers(&test));
        assert!(!train.equal_headers(&Schema::new("iris-train", attrs)));
    }

    #[test]
    fn test_deserialize_checks_label_index() {
        let json = r#"{"relation":"r","attributes":[
            {"name":"a","kind":"numeric"},{"name":"b","kind":"numeric"}
        ],"label_index":5}"#;
        assert!(serde_json::from_str::<Schema>(json).is_err());

        let ok = json.replace("\"label_index\":5", "\"label_index\":1");
        let schema: Schema = serde_json::from_str(&ok).unwrap();
        assert_eq!(schema.label_index(), Some(1));
    }
}
