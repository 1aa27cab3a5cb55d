//! Runtime schema descriptors for flow inputs and outputs.
//!
//! A [`SchemaDescriptor`] is the single source of truth for a flow's data
//! shape: the validator interprets it before any model call, the template
//! renderer is checked against it, and the model client derives the
//! machine-readable response schema from it.

use crate::error::FlowError;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Ordered field-level description of a JSON object shape.
#[derive(Debug, Clone, Default)]
pub struct SchemaDescriptor {
    fields: Vec<FieldSpec>,
}

/// One named field in a [`SchemaDescriptor`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    required: bool,
    description: String,
}

/// The kind of value a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    String { format: Option<StringFormat> },
    Number,
    Boolean,
    Array(SchemaDescriptor),
    Object(SchemaDescriptor),
}

/// Additional constraint on string fields beyond "is a string".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// `YYYY-MM-DD` calendar date.
    Date,
    Email,
}

impl SchemaDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field; declaration order is validation and description order.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Validate `value` against this descriptor.
    ///
    /// Required fields must be present and non-null with the declared kind;
    /// unknown extra fields are ignored. Stops at the first invalid field and
    /// names it (with a dotted/indexed path for nested shapes) in the error
    /// detail.
    pub fn validate(&self, value: &Value) -> Result<(), FlowError> {
        self.validate_at("", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), FlowError> {
        let Some(object) = value.as_object() else {
            let detail = if path.is_empty() {
                "input is not a JSON object".to_string()
            } else {
                format!("field `{path}` is not a JSON object")
            };
            return Err(FlowError::validation(detail));
        };
        for field in &self.fields {
            let label = if path.is_empty() {
                field.name.clone()
            } else {
                format!("{path}.{}", field.name)
            };
            let entry = object.get(&field.name).filter(|entry| !entry.is_null());
            let Some(entry) = entry else {
                if field.required {
                    return Err(FlowError::validation(format!(
                        "missing required field `{label}`"
                    )));
                }
                continue;
            };
            field.kind.check(&label, entry)?;
        }
        Ok(())
    }

    /// Machine-readable response schema handed to the model service so it can
    /// emit structured output matching this shape directly.
    pub fn to_response_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.kind.describe(&field.description));
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        json!({
            "type": "OBJECT",
            "properties": Value::Object(properties),
            "required": required,
        })
    }
}

impl FieldSpec {
    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, FieldKind::String { format: None }, description)
    }

    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, FieldKind::Number, description)
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, FieldKind::Boolean, description)
    }

    /// Array of objects; each element is validated against `element`.
    pub fn array(name: &str, element: SchemaDescriptor, description: &str) -> Self {
        Self::new(name, FieldKind::Array(element), description)
    }

    pub fn object(name: &str, nested: SchemaDescriptor, description: &str) -> Self {
        Self::new(name, FieldKind::Object(nested), description)
    }

    fn new(name: &str, kind: FieldKind, description: &str) -> Self {
        FieldSpec {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_format(mut self, format: StringFormat) -> Self {
        if let FieldKind::String { format: slot } = &mut self.kind {
            *slot = Some(format);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl FieldKind {
    /// Scalar kinds are the ones a template placeholder may render.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::String { .. } | FieldKind::Number | FieldKind::Boolean
        )
    }

    fn check(&self, label: &str, value: &Value) -> Result<(), FlowError> {
        match self {
            FieldKind::String { format } => {
                let Some(text) = value.as_str() else {
                    return Err(type_error(label, "a string"));
                };
                if let Some(format) = format {
                    if !format.matches(text) {
                        return Err(FlowError::validation(format!(
                            "field `{label}` is not a valid {}",
                            format.label()
                        )));
                    }
                }
                Ok(())
            }
            FieldKind::Number => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(type_error(label, "a number"))
                }
            }
            FieldKind::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(type_error(label, "a boolean"))
                }
            }
            FieldKind::Array(element) => {
                let Some(items) = value.as_array() else {
                    return Err(type_error(label, "an array"));
                };
                for (index, item) in items.iter().enumerate() {
                    element.validate_at(&format!("{label}[{index}]"), item)?;
                }
                Ok(())
            }
            FieldKind::Object(nested) => nested.validate_at(label, value),
        }
    }

    fn describe(&self, description: &str) -> Value {
        match self {
            FieldKind::String { .. } => json!({"type": "STRING", "description": description}),
            FieldKind::Number => json!({"type": "NUMBER", "description": description}),
            FieldKind::Boolean => json!({"type": "BOOLEAN", "description": description}),
            FieldKind::Array(element) => json!({
                "type": "ARRAY",
                "description": description,
                "items": element.to_response_schema(),
            }),
            FieldKind::Object(nested) => {
                let mut schema = nested.to_response_schema();
                if let Some(object) = schema.as_object_mut() {
                    object.insert(
                        "description".to_string(),
                        Value::String(description.to_string()),
                    );
                }
                schema
            }
        }
    }
}

impl StringFormat {
    fn label(self) -> &'static str {
        match self {
            StringFormat::Date => "date (YYYY-MM-DD)",
            StringFormat::Email => "email address",
        }
    }

    fn matches(self, text: &str) -> bool {
        match self {
            StringFormat::Date => date_regex().is_match(text),
            StringFormat::Email => email_regex().is_match(text),
        }
    }
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("regex for date format"))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex for email format"))
}

fn type_error(label: &str, expected: &str) -> FlowError {
    FlowError::validation(format!("field `{label}` must be {expected}"))
}
