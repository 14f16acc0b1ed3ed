use std::collections::BTreeMap;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single field value as held by an in-progress form.
///
/// Serialized untagged: dates go out as ISO-8601 strings and come back as
/// `Text`. Use [`FormSnapshot::revive_dates`] to turn them back into dates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum FieldValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(Date),
    List(Vec<String>),
}

impl FieldValue {
    /// Blank text, `Empty` and an empty list all count as "not provided".
    pub fn is_absent(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) | FieldValue::Date(_) => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Empty => "nothing",
            FieldValue::Bool(_) => "a flag",
            FieldValue::Number(_) => "a number",
            FieldValue::Text(_) => "text",
            FieldValue::Date(_) => "a date",
            FieldValue::List(_) => "a list",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Date> for FieldValue {
    fn from(value: Date) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

/// The complete set of field values for one in-progress record, keyed by
/// dot-qualified path (e.g. `billing.total_payable`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FormSnapshot(BTreeMap<String, FieldValue>);

impl FormSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        self.0.get(path)
    }

    pub fn set(&mut self, path: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(path.into(), value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<FieldValue> {
        self.0.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy every field of `other` over this snapshot.
    pub fn extend(&mut self, other: FormSnapshot) {
        self.0.extend(other.0);
    }

    pub fn is_blank(&self, path: &str) -> bool {
        self.get(path).is_none_or(FieldValue::is_absent)
    }

    /// Trimmed, non-empty text at `path`.
    pub fn text(&self, path: &str) -> Option<&str> {
        match self.get(path) {
            Some(FieldValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    pub fn number(&self, path: &str) -> Option<f64> {
        match self.get(path) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn date(&self, path: &str) -> Option<Date> {
        match self.get(path) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn flag(&self, path: &str) -> bool {
        matches!(self.get(path), Some(FieldValue::Bool(true)))
    }

    pub fn list(&self, path: &str) -> &[String] {
        match self.get(path) {
            Some(FieldValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Parse ISO-8601 text back into dates at the given paths.
    ///
    /// Text that does not parse is left untouched so the validator can
    /// report it. Returns the number of fields converted.
    pub fn revive_dates<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) -> usize {
        let mut revived = 0;
        for path in paths {
            if let Some(value) = self.0.get_mut(path)
                && let FieldValue::Text(raw) = value
                && let Ok(date) = raw.trim().parse::<Date>()
            {
                *value = FieldValue::Date(date);
                revived += 1;
            }
        }
        revived
    }
}

impl FromIterator<(String, FieldValue)> for FormSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        FormSnapshot(iter.into_iter().collect())
    }
}
