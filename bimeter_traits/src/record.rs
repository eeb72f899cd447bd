//! Sparse output record handed to the publisher.
//!
//! Absence of a field means "unchanged"; `FieldValue::Null` means the field was
//! explicitly nullified by policy.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    /// Categorical label such as a flow direction.
    Label(&'static str),
    /// Wrapping update counter.
    Counter(u16),
    /// Milliseconds since the UNIX epoch.
    Timestamp(u64),
    Null,
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&'static str> {
        match self {
            FieldValue::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

/// Fields decided for emission while processing one message for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    device: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Insert or overwrite a field. Later decisions within the same message win.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_number)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}
