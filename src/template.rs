//! Prompt template parsing and rendering.
//!
//! Templates are plain text with two constructs:
//!
//! - `{{field}}` (or `{{{field}}}`) substitutes a scalar input field;
//!   numbers use default decimal formatting, booleans render `true`/`false`.
//! - `{{#each field}}...{{/each}}` repeats its body once per element of an
//!   array field, resolving inner placeholders against that element, in
//!   input order.
//!
//! A placeholder with no matching input field is a rendering error, not an
//! empty substitution: templates and input schemas must agree, and
//! [`PromptTemplate::check_against`] lets the test suite assert that
//! agreement statically for every registered flow.

use crate::error::FlowError;
use crate::schema::{FieldKind, SchemaDescriptor};
use serde_json::Value;
use thiserror::Error;

/// A parsed prompt template, ready to render against input objects.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Placeholder(String),
    Each { field: String, body: Vec<Segment> },
}

/// Structural errors in template source text.
///
/// These indicate a broken bundled asset, not bad user input, so flow
/// construction treats them as fatal.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unterminated placeholder at byte {0}")]
    UnterminatedPlaceholder(usize),

    #[error("placeholder name `{0}` is not a valid identifier")]
    InvalidName(String),

    #[error("`{{{{#each {0}}}}}` block is never closed")]
    UnclosedBlock(String),

    #[error("`{{{{/each}}}}` without a matching `{{{{#each}}}}`")]
    UnexpectedBlockClose,
}

impl PromptTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parser = Parser { source, pos: 0 };
        let segments = parser.parse_segments(None)?;
        Ok(PromptTemplate { segments })
    }

    /// Render the template against a validated input object.
    pub fn render(&self, context: &Value) -> Result<String, FlowError> {
        let mut out = String::new();
        render_segments(&self.segments, context, &mut out)?;
        Ok(out)
    }

    /// Verify that every placeholder names a field of `schema`.
    ///
    /// Scalar placeholders must reference scalar fields; repeated blocks must
    /// reference array fields, with block bodies checked against the element
    /// schema.
    pub fn check_against(&self, schema: &SchemaDescriptor) -> Result<(), FlowError> {
        check_segments(&self.segments, schema)
    }
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl Parser<'_> {
    /// Parse segments until end of input, or until the closing tag of the
    /// named block when `block` is set.
    fn parse_segments(&mut self, block: Option<&str>) -> Result<Vec<Segment>, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];
            let Some(offset) = rest.find("{{") else {
                literal.push_str(rest);
                self.pos = self.source.len();
                break;
            };
            literal.push_str(&rest[..offset]);
            self.pos += offset;
            let tag_start = self.pos;
            let rest = &self.source[self.pos..];

            if rest.starts_with("{{/each}}") {
                if block.is_none() {
                    return Err(TemplateError::UnexpectedBlockClose);
                }
                self.pos += "{{/each}}".len();
                flush_literal(&mut literal, &mut segments);
                return Ok(segments);
            }

            if let Some(tag) = rest.strip_prefix("{{#each ") {
                let end = tag
                    .find("}}")
                    .ok_or(TemplateError::UnterminatedPlaceholder(tag_start))?;
                let field = valid_name(tag[..end].trim())?;
                self.pos += "{{#each ".len() + end + 2;
                flush_literal(&mut literal, &mut segments);
                let body = self.parse_segments(Some(&field))?;
                segments.push(Segment::Each { field, body });
                continue;
            }

            if let Some(tag) = rest.strip_prefix("{{{") {
                let end = tag
                    .find("}}}")
                    .ok_or(TemplateError::UnterminatedPlaceholder(tag_start))?;
                let name = valid_name(tag[..end].trim())?;
                self.pos += 3 + end + 3;
                flush_literal(&mut literal, &mut segments);
                segments.push(Segment::Placeholder(name));
                continue;
            }

            let tag = &rest[2..];
            let end = tag
                .find("}}")
                .ok_or(TemplateError::UnterminatedPlaceholder(tag_start))?;
            let name = valid_name(tag[..end].trim())?;
            self.pos += 2 + end + 2;
            flush_literal(&mut literal, &mut segments);
            segments.push(Segment::Placeholder(name));
        }
        if let Some(field) = block {
            return Err(TemplateError::UnclosedBlock(field.to_string()));
        }
        flush_literal(&mut literal, &mut segments);
        Ok(segments)
    }
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

fn valid_name(name: &str) -> Result<String, TemplateError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if ok {
        Ok(name.to_string())
    } else {
        Err(TemplateError::InvalidName(name.to_string()))
    }
}

fn render_segments(segments: &[Segment], scope: &Value, out: &mut String) -> Result<(), FlowError> {
    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Placeholder(name) => {
                let value = scope.get(name).filter(|value| !value.is_null());
                let Some(value) = value else {
                    return Err(FlowError::validation(format!(
                        "template placeholder `{name}` has no matching input field"
                    )));
                };
                push_scalar(name, value, out)?;
            }
            Segment::Each { field, body } => {
                let items = scope.get(field).and_then(Value::as_array);
                let Some(items) = items else {
                    return Err(FlowError::validation(format!(
                        "template block `{field}` does not name an array input field"
                    )));
                };
                for item in items {
                    render_segments(body, item, out)?;
                }
            }
        }
    }
    Ok(())
}

fn push_scalar(name: &str, value: &Value, out: &mut String) -> Result<(), FlowError> {
    match value {
        Value::String(text) => out.push_str(text),
        Value::Number(number) => out.push_str(&number.to_string()),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        _ => {
            return Err(FlowError::validation(format!(
                "template placeholder `{name}` must reference a scalar field"
            )))
        }
    }
    Ok(())
}

fn check_segments(segments: &[Segment], schema: &SchemaDescriptor) -> Result<(), FlowError> {
    for segment in segments {
        match segment {
            Segment::Literal(_) => {}
            Segment::Placeholder(name) => {
                let Some(field) = schema.get(name) else {
                    return Err(FlowError::validation(format!(
                        "template references `{name}`, which is not a schema field"
                    )));
                };
                if !field.kind().is_scalar() {
                    return Err(FlowError::validation(format!(
                        "template placeholder `{name}` must reference a scalar field"
                    )));
                }
            }
            Segment::Each { field, body } => {
                let Some(spec) = schema.get(field) else {
                    return Err(FlowError::validation(format!(
                        "template block references `{field}`, which is not a schema field"
                    )));
                };
                let FieldKind::Array(element) = spec.kind() else {
                    return Err(FlowError::validation(format!(
                        "template block `{field}` must reference an array field"
                    )));
                };
                check_segments(body, element)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    #[test]
    fn renders_scalar_placeholders() {
        let template = PromptTemplate::parse("Weather: {{weather}} / Demand: {{{demand}}}")
            .expect("parse template");
        let rendered = template
            .render(&json!({"weather": "Heavy rain", "demand": "High"}))
            .unwrap();
        assert_eq!(rendered, "Weather: Heavy rain / Demand: High");
    }

    #[test]
    fn renders_numbers_and_booleans() {
        let template =
            PromptTemplate::parse("score={{score}} cleared={{cleared}}").expect("parse template");
        let rendered = template
            .render(&json!({"score": 92.5, "cleared": false}))
            .unwrap();
        assert_eq!(rendered, "score=92.5 cleared=false");
    }

    #[test]
    fn expands_each_block_in_input_order() {
        let template = PromptTemplate::parse("{{#each trains}}[{{train_id}}]{{/each}}")
            .expect("parse template");
        let rendered = template
            .render(&json!({"trains": [
                {"train_id": "T-002"},
                {"train_id": "T-001"},
            ]}))
            .unwrap();
        assert_eq!(rendered, "[T-002][T-001]");
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let template = PromptTemplate::parse("{{weather}}").expect("parse template");
        let err = template.render(&json!({})).unwrap_err();
        assert!(err.to_string().contains("weather"));
    }

    #[test]
    fn unclosed_block_fails_to_parse() {
        let err = PromptTemplate::parse("{{#each trains}}{{train_id}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnclosedBlock(field) if field == "trains"));
    }

    #[test]
    fn stray_block_close_fails_to_parse() {
        let err = PromptTemplate::parse("{{/each}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnexpectedBlockClose));
    }

    #[test]
    fn check_against_rejects_unknown_placeholder() {
        let template = PromptTemplate::parse("{{weather}} {{ghost}}").expect("parse template");
        let schema =
            SchemaDescriptor::new().field(FieldSpec::string("weather", "Weather conditions."));
        let err = template.check_against(&schema).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn check_against_descends_into_blocks() {
        let template =
            PromptTemplate::parse("{{#each trains}}{{train_id}} {{mileage}}{{/each}}")
                .expect("parse template");
        let element = SchemaDescriptor::new()
            .field(FieldSpec::string("train_id", "Identifier."))
            .field(FieldSpec::number("mileage", "Mileage."));
        let schema = SchemaDescriptor::new().field(FieldSpec::array(
            "trains",
            element,
            "Fleet under consideration.",
        ));
        assert!(template.check_against(&schema).is_ok());
    }
}
