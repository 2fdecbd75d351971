// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Ordered configuration documents.
//!
//! The collection agent reads relabel rules sequentially and operators diff
//! generated configuration line by line, so every emitted mapping keeps its
//! insertion order. [`Document`] is a plain sequence of key/value pairs: it
//! never reorders entries and it does not enforce key uniqueness, which is
//! left to the code assembling the document.

use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq}
};

use crate::error::{self, Error};

/// Insertion-ordered sequence of `(key, value)` pairs.
///
/// # Examples
///
/// ```
/// use scrapegen::Document;
///
/// let mut document = Document::new();
/// document.push("job_name", "default/web/0");
/// document.push("honor_labels", false);
///
/// let keys: Vec<&str> = document.keys().collect();
/// assert_eq!(keys, ["job_name", "honor_labels"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    entries: Vec<(String, Value)>
}

/// Value stored in a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Boolean scalar.
    Bool(bool),
    /// Unsigned integer scalar.
    UInt(u64),
    /// String scalar.
    String(String),
    /// Ordered sequence of values.
    Sequence(Vec<Value>),
    /// Nested ordered document.
    Document(Document)
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns the document, for chained construction.
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<Value>
    {
        self.push(key, value);
        self
    }

    /// Appends an entry after all existing entries.
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>
    {
        self.entries.push((key.into(), value.into()));
    }

    /// Returns the value of the first entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Returns `true` when at least one entry is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over keys in insertion order, duplicates included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the document holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the document as YAML.
    ///
    /// Scalars that cannot be written plain, such as strings that would read
    /// back as numbers, are emitted in double-quoted style (`"8080"`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`](Error::Render) when the emitter rejects the
    /// document.
    pub fn to_yaml(&self) -> Result<String, Error> {
        let mut quoted = Vec::new();
        let staged = stage_document(self, &mut quoted)?;
        let mut rendered = serde_yaml::to_string(&staged).map_err(error::render_error)?;
        for (index, scalar) in quoted.iter().enumerate() {
            rendered = rendered.replacen(&placeholder(index), scalar, 1);
        }
        Ok(rendered)
    }
}

impl Value {
    /// Returns the string slice when the value is a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None
        }
    }

    /// Returns the boolean when the value is a boolean scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None
        }
    }

    /// Returns the nested document when the value is a document.
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(document) => Some(document),
            _ => None
        }
    }

    /// Returns the items when the value is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Self::Document(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(values: Vec<String>) -> Self {
        Self::Sequence(values.into_iter().map(Value::String).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(values: [&str; N]) -> Self {
        Self::Sequence(values.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<Document>> for Value {
    fn from(documents: Vec<Document>) -> Self {
        Self::Sequence(documents.into_iter().map(Value::Document).collect())
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        match self {
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::UInt(value) => serializer.serialize_u64(*value),
            Self::String(value) => serializer.serialize_str(value),
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Document(document) => document.serialize(serializer)
        }
    }
}

/// Plain token standing in for a quoted scalar during emission.
fn placeholder(index: usize) -> String {
    format!("__scrapegen_quoted_{index}__")
}

fn stage_document(document: &Document, quoted: &mut Vec<String>) -> Result<Document, Error> {
    let mut staged = Document::new();
    for (key, value) in &document.entries {
        let key = stage_scalar(key, quoted)?;
        let value = stage_value(value, quoted)?;
        staged.entries.push((key, value));
    }
    Ok(staged)
}

fn stage_value(value: &Value, quoted: &mut Vec<String>) -> Result<Value, Error> {
    Ok(match value {
        Value::String(text) => Value::String(stage_scalar(text, quoted)?),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| stage_value(item, quoted))
                .collect::<Result<_, _>>()?
        ),
        Value::Document(document) => Value::Document(stage_document(document, quoted)?),
        Value::Bool(_) | Value::UInt(_) => value.clone()
    })
}

/// Swaps a scalar the emitter would single-quote for a placeholder and
/// records its double-quoted rendering.
fn stage_scalar(text: &str, quoted: &mut Vec<String>) -> Result<String, Error> {
    let emitted = serde_yaml::to_string(text).map_err(error::render_error)?;
    if !emitted.starts_with('\'') {
        return Ok(text.to_owned());
    }

    let token = placeholder(quoted.len());
    quoted.push(double_quoted(text));
    Ok(token)
}

fn double_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            ch if ch.is_control() => out.push_str(&format!("\\u{:04X}", u32::from(ch))),
            ch => out.push(ch)
        }
    }
    out.push('"');
    out
}
