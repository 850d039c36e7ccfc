//! Result set of a `select` response.

use super::Response;
use crate::Result;
use serde::de::Error as _;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub value_type: String,
}

/// Hit count, column definitions and records keyed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectBody {
    pub n_hits: u64,
    pub columns: Vec<Column>,
    pub records: Vec<Map<String, Value>>,
}

impl SelectBody {
    pub fn from_response(response: &Response) -> Result<Self> {
        match &response.body {
            // [[[n_hits], [[name, type], ...], record, ...], drilldown...]
            Value::Array(result_sets) => match result_sets.first() {
                Some(Value::Array(result_set)) => Self::from_array(result_set),
                _ => Err(malformed("missing result set")),
            },
            // {"n_hits": .., "columns": [{"name": .., "type": ..}], "records": [[..]]}
            Value::Object(object) => Self::from_object(object),
            _ => Err(malformed("body is neither array nor object")),
        }
    }

    fn from_array(result_set: &[Value]) -> Result<Self> {
        let n_hits = result_set
            .first()
            .and_then(|v| v.get(0))
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("missing n_hits"))?;
        let columns = result_set
            .get(1)
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing columns"))?
            .iter()
            .map(|column| Column {
                name: text_field(column, 0),
                value_type: text_field(column, 1),
            })
            .collect::<Vec<_>>();
        let records = result_set
            .iter()
            .skip(2)
            .map(|record| zip_record(&columns, record))
            .collect();
        Ok(Self {
            n_hits,
            columns,
            records,
        })
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self> {
        let n_hits = object
            .get("n_hits")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("missing n_hits"))?;
        let columns = object
            .get("columns")
            .and_then(Value::as_array)
            .map(|columns| {
                columns
                    .iter()
                    .map(|column| Column {
                        name: text_field(column, "name"),
                        value_type: text_field(column, "type"),
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let records = object
            .get("records")
            .and_then(Value::as_array)
            .map(|records| records.iter().map(|r| zip_record(&columns, r)).collect())
            .unwrap_or_default();
        Ok(Self {
            n_hits,
            columns,
            records,
        })
    }
}

fn text_field<I: serde_json::value::Index>(value: &Value, index: I) -> String {
    value.get(index).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn zip_record(columns: &[Column], record: &Value) -> Map<String, Value> {
    let values = record.as_array().map(Vec::as_slice).unwrap_or_default();
    columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.clone(), value.clone()))
        .collect()
}

fn malformed(reason: &str) -> crate::Error {
    serde_json::Error::custom(format!("malformed select body: {}", reason)).into()
}
