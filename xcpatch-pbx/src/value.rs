//! Order-preserving value tree for OpenStep property lists.

/// A string leaf with an optional `/* ... */` annotation.
///
/// Annotations are how Xcode keeps pbxproj files human-readable
/// (`13B07F861A680F5B00A75B9A /* AppDelegate.m in Sources */`). They carry no
/// semantics but must survive a round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PbxString {
    pub value: String,
    pub annotation: Option<String>,
}

impl PbxString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotation: None,
        }
    }

    pub fn annotated(value: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            annotation: Some(annotation.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PbxValue {
    String(PbxString),
    Array(Vec<PbxValue>),
    Dict(PbxDict),
}

impl PbxValue {
    pub fn string(value: impl Into<String>) -> Self {
        PbxValue::String(PbxString::new(value))
    }

    pub fn annotated(value: impl Into<String>, annotation: impl Into<String>) -> Self {
        PbxValue::String(PbxString::annotated(value, annotation))
    }

    /// The string payload, ignoring any annotation.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PbxValue::String(s) => Some(&s.value),
            _ => None,
        }
    }

    pub fn as_pbx_string(&self) -> Option<&PbxString> {
        match self {
            PbxValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PbxValue]> {
        match self {
            PbxValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<PbxValue>> {
        match self {
            PbxValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PbxDict> {
        match self {
            PbxValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut PbxDict> {
        match self {
            PbxValue::Dict(d) => Some(d),
            _ => None,
        }
    }
}

/// A dictionary that preserves entry order and key annotations.
///
/// pbxproj object tables are large and diff-sensitive; reordering entries on
/// write would produce noise, so lookups are linear over an ordered list.
/// Tables in real projects are small enough that this never matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PbxDict {
    entries: Vec<(PbxString, PbxValue)>,
}

impl PbxDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&PbxValue> {
        self.entries
            .iter()
            .find(|(k, _)| k.value == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PbxValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.value == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace by key. A replace keeps the entry's position and its
    /// existing key annotation.
    pub fn insert(&mut self, key: impl Into<String>, value: PbxValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| k.value == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((PbxString::new(key), value)),
        }
    }

    /// Insert with an annotated key; replaces value and annotation if present.
    pub fn insert_annotated(
        &mut self,
        key: impl Into<String>,
        annotation: impl Into<String>,
        value: PbxValue,
    ) {
        let key = PbxString::annotated(key, annotation);
        match self.entries.iter_mut().find(|(k, _)| k.value == key.value) {
            Some(entry) => *entry = (key, value),
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PbxValue> {
        let idx = self.entries.iter().position(|(k, _)| k.value == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PbxString, &PbxValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&PbxString, &mut PbxValue)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub(crate) fn push_parsed(&mut self, key: PbxString, value: PbxValue) {
        self.entries.push((key, value));
    }
}
