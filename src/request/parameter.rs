//! Parameter nodes and the overwrite merger.
//!
//! A request's parameters form a small persistent tree: each builder call wraps
//! the previous tree and a new leaf in an [`OverwriteMerger`]. Flattening walks
//! the tree and overlays later nodes on earlier ones.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Wire-ready parameter mapping (name -> value).
pub type Parameters = BTreeMap<String, String>;

/// Anything that flattens into wire parameters.
pub trait ParameterSource: fmt::Debug + Send + Sync {
    fn to_map(&self) -> Parameters;
}

/// A typed input value before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Absent,
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    fn element_text(&self, separator: &str) -> String {
        match self {
            ParameterValue::Absent => String::new(),
            ParameterValue::Text(s) => s.clone(),
            ParameterValue::Integer(n) => n.to_string(),
            ParameterValue::Unsigned(n) => n.to_string(),
            ParameterValue::Float(n) => n.to_string(),
            ParameterValue::Bool(b) => b.to_string(),
            ParameterValue::List(items) => join(items, separator),
        }
    }

    /// Scalar normalization: only true emptiness counts as absent.
    ///
    /// A list whose elements all render empty is empty too.
    fn scalar_text(&self) -> Option<String> {
        match self {
            ParameterValue::Absent => None,
            other => Some(other.element_text(", ")).filter(|text| !text.is_empty()),
        }
    }

    /// Sequence normalization for values/flags: blank text counts as absent.
    fn joined_text(&self, separator: &str) -> Option<String> {
        match self {
            ParameterValue::Absent => None,
            other => Some(other.element_text(separator)).filter(|text| !text.trim().is_empty()),
        }
    }
}

fn join(items: &[ParameterValue], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.element_text(separator))
        .collect::<Vec<_>>()
        .join(separator)
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<&String> for ParameterValue {
    fn from(value: &String) -> Self {
        ParameterValue::Text(value.clone())
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for ParameterValue {
            fn from(value: $t) -> Self {
                ParameterValue::Integer(value as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for ParameterValue {
            fn from(value: $t) -> Self {
                ParameterValue::Unsigned(value as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for ParameterValue {
    fn from(value: f32) -> Self {
        ParameterValue::Float(f64::from(value))
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl<T: Into<ParameterValue>> From<Option<T>> for ParameterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParameterValue::Absent, Into::into)
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterValue {
    fn from(values: Vec<T>) -> Self {
        ParameterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParameterValue>, const N: usize> From<[T; N]> for ParameterValue {
    fn from(values: [T; N]) -> Self {
        ParameterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<ParameterValue>> From<&[T]> for ParameterValue {
    fn from(values: &[T]) -> Self {
        ParameterValue::List(values.iter().cloned().map(Into::into).collect())
    }
}

/// One or more aliases a value is sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterNames(Vec<String>);

impl ParameterNames {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for ParameterNames {
    fn from(name: &str) -> Self {
        ParameterNames(vec![name.to_string()])
    }
}

impl From<String> for ParameterNames {
    fn from(name: String) -> Self {
        ParameterNames(vec![name])
    }
}

impl<S: Into<String>> From<Vec<S>> for ParameterNames {
    fn from(names: Vec<S>) -> Self {
        ParameterNames(names.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for ParameterNames {
    fn from(names: [S; N]) -> Self {
        ParameterNames(names.into_iter().map(Into::into).collect())
    }
}

fn replicate(names: &ParameterNames, value: Option<String>) -> Parameters {
    let Some(value) = value else {
        return Parameters::new();
    };
    names
        .0
        .iter()
        .map(|name| (name.clone(), value.clone()))
        .collect()
}

/// A single name bound to a single value.
#[derive(Debug, Clone)]
pub struct ScalarParameter {
    name: String,
    value: ParameterValue,
}

impl ScalarParameter {
    pub fn new(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl ParameterSource for ScalarParameter {
    fn to_map(&self) -> Parameters {
        let mut parameters = Parameters::new();
        if let Some(value) = self.value.scalar_text() {
            parameters.insert(self.name.clone(), value);
        }
        parameters
    }
}

/// A sequence joined with `", "`, replicated under every alias.
#[derive(Debug, Clone)]
pub struct ValuesParameter {
    names: ParameterNames,
    values: ParameterValue,
}

impl ValuesParameter {
    pub fn new(names: impl Into<ParameterNames>, values: impl Into<ParameterValue>) -> Self {
        Self {
            names: names.into(),
            values: values.into(),
        }
    }
}

impl ParameterSource for ValuesParameter {
    fn to_map(&self) -> Parameters {
        replicate(&self.names, self.values.joined_text(", "))
    }
}

/// Bit-flag names joined with `"|"`, replicated under every alias.
#[derive(Debug, Clone)]
pub struct FlagsParameter {
    names: ParameterNames,
    flags: ParameterValue,
}

impl FlagsParameter {
    pub fn new(names: impl Into<ParameterNames>, flags: impl Into<ParameterValue>) -> Self {
        Self {
            names: names.into(),
            flags: flags.into(),
        }
    }
}

impl ParameterSource for FlagsParameter {
    fn to_map(&self) -> Parameters {
        replicate(&self.names, self.flags.joined_text("|"))
    }
}

/// Overlays `second` on `first`; either side may be absent.
#[derive(Debug, Clone)]
pub struct OverwriteMerger {
    first: Option<Arc<dyn ParameterSource>>,
    second: Option<Arc<dyn ParameterSource>>,
}

impl OverwriteMerger {
    pub fn new(
        first: Option<Arc<dyn ParameterSource>>,
        second: Option<Arc<dyn ParameterSource>>,
    ) -> Self {
        Self { first, second }
    }
}

impl ParameterSource for OverwriteMerger {
    fn to_map(&self) -> Parameters {
        match (&self.first, &self.second) {
            (None, None) => Parameters::new(),
            (Some(first), None) => first.to_map(),
            (None, Some(second)) => second.to_map(),
            (Some(first), Some(second)) => {
                let mut parameters = first.to_map();
                parameters.extend(second.to_map());
                parameters
            }
        }
    }
}
