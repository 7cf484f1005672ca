use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;

/// How a template document is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Sorted keys, four-space indent, trailing newline. For humans.
    Pretty,
    /// Single line. Submitted as the template body.
    Compact,
}

/// A stack template that has already been resolved to a concrete value.
pub trait StackTemplate: Send + Sync {
    /// Serialize the whole template document.
    fn to_document(&self, layout: Layout) -> Result<String, CoreError>;

    /// Names of the parameters the template declares.
    fn parameter_names(&self) -> Vec<String>;
}

/// A CloudFormation template loaded from a JSON file.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonTemplate {
    document: Map<String, Value>,
}

impl JsonTemplate {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, CoreError> {
        match serde_json::from_str::<Value>(contents)? {
            Value::Object(document) => Ok(Self { document }),
            other => Err(CoreError::TemplateShape(json_kind(&other))),
        }
    }
}

impl StackTemplate for JsonTemplate {
    fn to_document(&self, layout: Layout) -> Result<String, CoreError> {
        let sorted = sort_keys(Value::Object(self.document.clone()));
        match layout {
            Layout::Compact => Ok(serde_json::to_string(&sorted)?),
            Layout::Pretty => {
                let mut buf = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
                sorted.serialize(&mut ser)?;
                let mut out = String::from_utf8_lossy(&buf).into_owned();
                out.push('\n');
                Ok(out)
            }
        }
    }

    fn parameter_names(&self) -> Vec<String> {
        self.document
            .get("Parameters")
            .and_then(Value::as_object)
            .map(|params| params.keys().cloned().collect())
            .unwrap_or_default()
    }
}

// Rendered documents list object keys in sorted order at every depth.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = r#"{
        "Resources": {"MyBucket": {"Type": "AWS::S3::Bucket"}},
        "Parameters": {
            "SecondParameter": {"Type": "String"},
            "FirstParameter": {"Type": "String"}
        }
    }"#;

    #[test]
    fn declared_parameters_come_from_parameters_object() {
        let template = JsonTemplate::parse(TEMPLATE).unwrap();
        let mut names = template.parameter_names();
        names.sort();
        assert_eq!(names, vec!["FirstParameter", "SecondParameter"]);
    }

    #[test]
    fn no_parameters_section_means_none_declared() {
        let template = JsonTemplate::parse(r#"{"Resources": {}}"#).unwrap();
        assert!(template.parameter_names().is_empty());
    }

    #[test]
    fn rejects_non_object_documents() {
        let err = JsonTemplate::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, CoreError::TemplateShape("an array")));
    }

    #[test]
    fn pretty_layout_sorts_and_indents() {
        let template = JsonTemplate::parse(r#"{"b": 1, "a": {"d": [], "c": "x"}}"#).unwrap();
        let doc = template.to_document(Layout::Pretty).unwrap();
        assert_eq!(
            doc,
            "{\n    \"a\": {\n        \"c\": \"x\",\n        \"d\": []\n    },\n    \"b\": 1\n}\n"
        );
    }

    #[test]
    fn compact_layout_is_single_line() {
        let template = JsonTemplate::parse(TEMPLATE).unwrap();
        let doc = template.to_document(Layout::Compact).unwrap();
        assert!(!doc.contains('\n'));
        assert!(doc.starts_with("{\"Parameters\":"));
    }
}
