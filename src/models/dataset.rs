//! Column-oriented table of JSON scalar cells

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),
    #[error("Unsupported payload shape: {0}")]
    UnsupportedShape(String),
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Tabular data keyed by exact column name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column; every column must have the same length
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<Self, DatasetError> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(DatasetError::DuplicateColumn(name));
        }
        if let Some(first) = self.columns.first() {
            if first.values.len() != values.len() {
                return Err(DatasetError::LengthMismatch {
                    column: name,
                    expected: first.values.len(),
                    found: values.len(),
                });
            }
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Build a table from a decoded payload.
    ///
    /// Records form (array of objects) takes the union of keys in first-seen
    /// order and fills gaps with `null`. Columnar form (object of arrays)
    /// maps each key to one column.
    pub fn from_json(payload: &Value) -> Result<Self, DatasetError> {
        match payload {
            Value::Array(records) => Self::from_records(records),
            Value::Object(map) => Self::from_columns(map),
            other => Err(DatasetError::UnsupportedShape(format!(
                "expected array or object, got {}",
                json_kind(other)
            ))),
        }
    }

    fn from_records(records: &[Value]) -> Result<Self, DatasetError> {
        let mut names: Vec<String> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let object = record.as_object().ok_or_else(|| {
                DatasetError::UnsupportedShape(format!(
                    "record {} is {}, expected object",
                    i,
                    json_kind(record)
                ))
            })?;
            for key in object.keys() {
                if !names.iter().any(|n| n == key) {
                    names.push(key.clone());
                }
            }
        }

        let mut dataset = Dataset::new();
        for name in names {
            let values = records
                .iter()
                .map(|r| r.get(&name).cloned().unwrap_or(Value::Null))
                .collect();
            dataset.push_column(name, values)?;
        }
        Ok(dataset)
    }

    fn from_columns(map: &Map<String, Value>) -> Result<Self, DatasetError> {
        let mut dataset = Dataset::new();
        for (name, column) in map {
            let values = column.as_array().ok_or_else(|| {
                DatasetError::UnsupportedShape(format!(
                    "column '{}' is {}, expected array",
                    name,
                    json_kind(column)
                ))
            })?;
            dataset.push_column(name.clone(), values.clone())?;
        }
        Ok(dataset)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_fill_missing_keys() {
        let payload = json!([
            {"t": "2024-01-01", "v1": 1.0},
            {"t": "2024-01-02", "v2": 7}
        ]);

        let dataset = Dataset::from_json(&payload).unwrap();

        assert_eq!(dataset.column_names().collect::<Vec<_>>(), vec!["t", "v1", "v2"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.column("v1").unwrap().values, vec![json!(1.0), Value::Null]);
        assert_eq!(dataset.column("v2").unwrap().values, vec![Value::Null, json!(7)]);
    }

    #[test]
    fn test_columnar_payload() {
        let payload = json!({"t": ["2024-01-01", "2024-01-02"], "v1": [1, 2]});

        let dataset = Dataset::from_json(&payload).unwrap();

        assert_eq!(dataset.row_count(), 2);
        assert!(dataset.column("v1").is_some());
    }

    #[test]
    fn test_rejects_ragged_columns() {
        let payload = json!({"t": ["2024-01-01"], "v1": [1, 2]});

        let err = Dataset::from_json(&payload).unwrap_err();

        assert!(matches!(err, DatasetError::LengthMismatch { found: 2, .. }));
    }

    #[test]
    fn test_rejects_scalars_and_non_object_records() {
        assert!(Dataset::from_json(&json!(3)).is_err());
        assert!(Dataset::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_column_lookup_is_exact() {
        let dataset = Dataset::new().with_column("Flow", vec![json!(1)]).unwrap();

        assert!(dataset.column("Flow").is_some());
        assert!(dataset.column("flow").is_none());
        assert_eq!(
            dataset.with_column("Flow", vec![json!(2)]).unwrap_err(),
            DatasetError::DuplicateColumn("Flow".to_string())
        );
    }
}
