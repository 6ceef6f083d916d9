// Contract-shape validation for bound request parameters
//
// A `Shape` is derived from an example value of a contract type: every field
// the example serializes becomes a required field whose primitive JSON type
// must match. Nested objects and arrays are only checked as "object".

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Primitive type of a contract field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    String,
    Number,
    Boolean,
    Object,
}

impl Primitive {
    /// Classify a JSON value. Anything that is not a string, number or
    /// boolean counts as an object.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Primitive::String,
            Value::Number(_) => Primitive::Number,
            Value::Bool(_) => Primitive::Boolean,
            _ => Primitive::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Object => "object",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            // JSON Schema "object": arrays and null do not qualify
            Primitive::Object => value.is_object(),
            other => Primitive::of(value) == *other,
        }
    }
}

/// Structural schema derived from a contract example
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: BTreeMap<String, Primitive>,
}

impl Shape {
    /// Derive a shape from the default value of a contract type
    pub fn from_contract<T: Serialize + Default>() -> Self {
        match serde_json::to_value(T::default()) {
            Ok(example) => Self::from_example(&example),
            Err(_) => Self::default(),
        }
    }

    /// Derive a shape from an example value's own fields
    pub fn from_example(example: &Value) -> Self {
        let fields = match example {
            Value::Object(map) => map
                .iter()
                .map(|(key, value)| (key.clone(), Primitive::of(value)))
                .collect(),
            _ => BTreeMap::new(),
        };
        Self { fields }
    }

    /// Add or replace a required field
    pub fn field(mut self, name: impl Into<String>, primitive: Primitive) -> Self {
        self.fields.insert(name.into(), primitive);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Primitive)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate a value against this shape
    pub fn validate(&self, value: &Value) -> Result<(), ValidationIssues> {
        validate(value, self)
    }
}

/// Validate `value` against `shape`, collecting every issue
pub fn validate(value: &Value, shape: &Shape) -> Result<(), ValidationIssues> {
    let Value::Object(map) = value else {
        return Err(ValidationIssues::from(vec![
            ValidationIssue::new("", "must be object")
                .with_constraint("type")
                .with_value(value.to_string()),
        ]));
    };

    let mut issues = ValidationIssues::default();
    for (field, primitive) in &shape.fields {
        match map.get(field) {
            None => issues.add(
                ValidationIssue::new(field.clone(), format!("must have required property '{}'", field))
                    .with_constraint("required"),
            ),
            Some(actual) if !primitive.accepts(actual) => issues.add(
                ValidationIssue::new(field.clone(), format!("must be {}", primitive.as_str()))
                    .with_constraint("type")
                    .with_value(actual.to_string()),
            ),
            Some(_) => {}
        }
    }

    if issues.is_empty() { Ok(()) } else { Err(issues) }
}

/// A single validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Field that failed validation (empty for the value itself)
    pub field: String,

    /// Error message
    pub message: String,

    /// Constraint that failed (`required`, `type`, `json`)
    pub constraint: String,

    /// Offending value, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: "custom".to_string(),
            value: None,
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

/// Collection of validation issues
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationIssues {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationIssues {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Issues for a specific field
    pub fn for_field(&self, field: &str) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.field == field).collect()
    }

    /// Client-facing body for a rejected request
    pub fn to_response_body(&self) -> Value {
        serde_json::json!({
            "error": "Invalid data",
            "issues": self.issues,
        })
    }
}

impl fmt::Display for ValidationIssues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

impl std::error::Error for ValidationIssues {}

impl From<Vec<ValidationIssue>> for ValidationIssues {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }
}
