//! Parsed command responses.
//!
//! The server wraps every result in an envelope. Two shapes exist:
//!
//! - array: `[[return_code, start_time, elapsed_time, error_message?, error_location?], body]`
//! - object: `{"header": {"return_code": .., "start_time": .., "elapsed_time": ..,
//!   "error": {"message": ..}}, "body": ..}`

pub mod select;

use crate::Result;
use serde::de::Error as _;
use serde_json::Value;

/// Response envelope header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub return_code: i64,
    pub start_time: f64,
    pub elapsed_time: f64,
    pub error_message: Option<String>,
    pub error_location: Option<Value>,
}

impl Header {
    fn from_array(items: &[Value]) -> Result<Self> {
        Ok(Self {
            return_code: return_code(items.first())?,
            start_time: items.get(1).and_then(Value::as_f64).unwrap_or(0.0),
            elapsed_time: items.get(2).and_then(Value::as_f64).unwrap_or(0.0),
            error_message: items.get(3).and_then(Value::as_str).map(String::from),
            error_location: items.get(4).cloned(),
        })
    }

    fn from_object(header: &serde_json::Map<String, Value>) -> Result<Self> {
        let error = header.get("error");
        Ok(Self {
            return_code: return_code(header.get("return_code"))?,
            start_time: header.get("start_time").and_then(Value::as_f64).unwrap_or(0.0),
            elapsed_time: header.get("elapsed_time").and_then(Value::as_f64).unwrap_or(0.0),
            error_message: error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(String::from),
            error_location: error.and_then(|e| e.get("location")).cloned(),
        })
    }
}

/// The return code decides success, so it must be present and integral.
fn return_code(value: Option<&Value>) -> Result<i64> {
    value
        .and_then(Value::as_i64)
        .ok_or_else(|| envelope_error("return code is missing or not an integer"))
}

fn envelope_error(reason: &str) -> crate::Error {
    serde_json::Error::custom(reason).into()
}

/// A command response: header, body and the raw text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub command_name: String,
    pub header: Header,
    pub body: Value,
    pub raw: String,
}

impl Response {
    pub fn parse(command_name: impl Into<String>, raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let value: Value = serde_json::from_str(&raw)?;
        let (header, body) = match value {
            Value::Array(mut items) => {
                let header = match items.first() {
                    Some(Value::Array(header)) => Header::from_array(header)?,
                    _ => return Err(envelope_error("response header is not an array")),
                };
                let body = if items.len() > 1 {
                    items.swap_remove(1)
                } else {
                    Value::Null
                };
                (header, body)
            }
            Value::Object(mut object) => {
                let header = match object.get("header") {
                    Some(Value::Object(header)) => Header::from_object(header)?,
                    _ => return Err(envelope_error("response header is not an object")),
                };
                let body = object.remove("body").unwrap_or(Value::Null);
                (header, body)
            }
            _ => return Err(envelope_error("response is not an envelope")),
        };
        Ok(Self {
            command_name: command_name.into(),
            header,
            body,
            raw,
        })
    }

    pub fn success(&self) -> bool {
        self.header.return_code == 0
    }

    pub fn return_code(&self) -> i64 {
        self.header.return_code
    }

    pub fn error_message(&self) -> Option<&str> {
        self.header.error_message.as_deref()
    }
}
