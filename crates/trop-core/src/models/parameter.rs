use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered map of parameter key to value.
///
/// Keys are unique and case-sensitive. Inserting an existing key replaces
/// its value in place, so the first-seen position is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(IndexMap<String, String>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Value half of a directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    /// Submit this value. An empty string is a real value.
    Explicit(String),
    /// Keep whatever the stack currently has.
    UsePrevious,
}

/// One parameter entry in a create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDirective {
    pub key: String,
    pub value: ParameterValue,
}

impl ParameterDirective {
    pub fn explicit(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ParameterValue::Explicit(value.into()),
        }
    }

    pub fn use_previous(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: ParameterValue::UsePrevious,
        }
    }

    pub fn uses_previous(&self) -> bool {
        self.value == ParameterValue::UsePrevious
    }

    /// The explicit value, if any.
    pub fn explicit_value(&self) -> Option<&str> {
        match &self.value {
            ParameterValue::Explicit(v) => Some(v),
            ParameterValue::UsePrevious => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_in_place() {
        let mut set = ParameterSet::new();
        set.insert("B", "1");
        set.insert("A", "2");
        set.insert("B", "3");

        let pairs: Vec<_> = set.iter().collect();
        assert_eq!(pairs, vec![("B", "3"), ("A", "2")]);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let set: ParameterSet = [("Key", "a"), ("key", "b")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("Key"), Some("a"));
        assert_eq!(set.get("KEY"), None);
    }

    #[test]
    fn empty_string_is_a_value() {
        let set: ParameterSet = [("A", "")].into_iter().collect();
        assert!(set.contains_key("A"));
        assert_eq!(set.get("A"), Some(""));
    }

    #[test]
    fn serializes_as_an_ordered_object() {
        let set: ParameterSet = [("Zone", "a"), ("Bucket", "b")].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"Zone":"a","Bucket":"b"}"#);

        let back: ParameterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
