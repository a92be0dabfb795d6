//! Schema validation with detailed error reporting

use jsonschema::error::ValidationErrorKind as Kind;
use jsonschema::{validator_for, ValidationError as JsonSchemaError, Validator as JsonValidator};
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Validation error with source location information
#[derive(Debug, Error, Diagnostic)]
#[error("Schema validation failed for {filename}: {summary}")]
#[diagnostic(code(regbuild::schema::validation_error))]
pub struct ValidationError {
    filename: String,
    summary: String,

    #[source_code]
    src: NamedSource<String>,

    #[related]
    violations: Vec<SchemaViolation>,
}

/// A single schema violation
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SchemaViolation {
    #[label("{}", self.hint)]
    span: SourceSpan,

    message: String,
    hint: String,

    #[help]
    help: Option<String>,
}

impl SchemaViolation {
    pub fn new(message: String, hint: String, span: SourceSpan, help: Option<String>) -> Self {
        Self {
            span,
            message,
            hint,
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ValidationError {
    pub fn new(filename: &str, source: &str, violations: Vec<SchemaViolation>) -> Self {
        let count = violations.len();
        let summary = if count == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", count)
        };
        Self {
            filename: filename.to_string(),
            summary,
            src: NamedSource::new(filename, source.to_string()),
            violations,
        }
    }

    /// Get the number of violations
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        &self.violations
    }
}

/// Errors raised before any document is checked
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    #[error("Schema {filename} is not valid JSON: {message}")]
    #[diagnostic(code(regbuild::schema::parse_error))]
    Parse { filename: String, message: String },

    #[error("Schema {filename} failed to compile: {message}")]
    #[diagnostic(code(regbuild::schema::compile_error))]
    Compile { filename: String, message: String },
}

/// A compiled schema for one registry document
pub struct Validator {
    compiled: JsonValidator,
}

impl Validator {
    /// Compile a schema from its JSON text
    pub fn new(schema_text: &str, filename: &str) -> Result<Self, SchemaError> {
        let schema_json: JsonValue =
            serde_json::from_str(schema_text).map_err(|e| SchemaError::Parse {
                filename: filename.to_string(),
                message: e.to_string(),
            })?;
        Self::from_value(&schema_json, filename)
    }

    pub fn from_value(schema: &JsonValue, filename: &str) -> Result<Self, SchemaError> {
        let compiled = validator_for(schema).map_err(|e| SchemaError::Compile {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { compiled })
    }

    /// Parse `content` and check it against the schema, collecting every
    /// violation. Returns the parsed document on success.
    pub fn validate(&self, content: &str, filename: &str) -> Result<JsonValue, ValidationError> {
        let json_value: JsonValue = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                let span = find_error_span(content, e.line(), e.column());
                let violation = SchemaViolation::new(
                    format!("JSON parse error: {}", e),
                    "invalid JSON".to_string(),
                    span,
                    Some("Check JSON syntax - commas, brackets, quotes".to_string()),
                );
                return Err(ValidationError::new(filename, content, vec![violation]));
            }
        };

        let violations: Vec<SchemaViolation> = self
            .compiled
            .iter_errors(&json_value)
            .map(|e| error_to_violation(content, &e))
            .collect();

        if violations.is_empty() {
            Ok(json_value)
        } else {
            Err(ValidationError::new(filename, content, violations))
        }
    }
}

/// Describe one schema error as a violation pointing into the document
fn error_to_violation(content: &str, error: &JsonSchemaError) -> SchemaViolation {
    let pointer = error.instance_path.to_string();
    let at = if pointer.is_empty() {
        "the document root".to_string()
    } else {
        format!("'{}'", pointer)
    };

    let (message, hint, help) = match &error.kind {
        Kind::Required { property } => {
            let field = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            (
                format!("Missing required field: {} at {}", field, at),
                "required field missing",
                Some(format!("Add the '{}' field to the entry", field)),
            )
        }
        Kind::Type { kind } => (
            format!("Wrong type at {}: expected {:?}", at, kind),
            "wrong type",
            None,
        ),
        Kind::Pattern { pattern } => (
            format!("Value at {} doesn't match pattern: {}", at, pattern),
            "pattern mismatch",
            pattern
                .contains("[A-Z]{2}")
                .then(|| "Country keys are two upper-case letters, e.g. FR".to_string()),
        ),
        Kind::MinLength { limit } => (
            format!("Value at {} is too short: minimum {} characters", at, limit),
            "too short",
            None,
        ),
        Kind::Minimum { limit } => (
            format!("Value at {} is below the minimum of {}", at, limit),
            "below minimum",
            None,
        ),
        Kind::Maximum { limit } => (
            format!("Value at {} is above the maximum of {}", at, limit),
            "above maximum",
            None,
        ),
        Kind::AdditionalProperties { unexpected } => (
            format!("Unknown field(s) at {}: {}", at, unexpected.join(", ")),
            "unknown field",
            Some(match unexpected.as_slice() {
                [one] => format!("Remove the '{}' field or check its spelling", one),
                _ => "Remove the unknown fields or check their spelling".to_string(),
            }),
        ),
        _ => (
            format!("Validation error at {}: {}", at, error),
            "validation error",
            None,
        ),
    };

    let span = find_path_span(content, &pointer);
    SchemaViolation::new(message, hint.to_string(), span, help)
}

/// Find the span (byte offset, length) for a 1-based line/column.
///
/// Line lengths include their terminator, so CRLF documents line up.
fn find_error_span(content: &str, line: usize, column: usize) -> SourceSpan {
    let line = line.saturating_sub(1);
    let column = column.saturating_sub(1);

    let mut offset = 0;
    for (i, line_content) in content.split_inclusive('\n').enumerate() {
        if i == line {
            offset += column.min(line_content.len());
            break;
        }
        offset += line_content.len();
    }
    let mut offset = offset.min(content.len());
    while !content.is_char_boundary(offset) {
        offset -= 1;
    }

    let rest_of_content = &content[offset..];
    let len = rest_of_content
        .find('\n')
        .unwrap_or(rest_of_content.len())
        .max(1);

    (offset, len).into()
}

/// Find the span for a JSON pointer in the document text.
///
/// Array indices are followed by counting objects at the array's depth, so
/// `/12/isoAlpha2` lands on the key inside the thirteenth entry.
fn find_path_span(content: &str, json_path: &str) -> SourceSpan {
    let parts: Vec<&str> = json_path.split('/').filter(|s| !s.is_empty()).collect();

    let first_line = || {
        let len = content.find('\n').unwrap_or(content.len()).max(1);
        SourceSpan::from((0, len))
    };

    let Some(first) = parts.first() else {
        return first_line();
    };

    let (entry_start, entry_end) = match first.parse::<usize>() {
        Ok(index) => match find_array_element(content, index) {
            Some(range) => range,
            None => return first_line(),
        },
        Err(_) => (0, content.len()),
    };

    let key = parts
        .iter()
        .rev()
        .find(|p| p.parse::<usize>().is_err())
        .copied();

    if let Some(key) = key {
        let needle = format!("\"{}\"", key);
        if let Some(pos) = content[entry_start..entry_end].find(&needle) {
            return (entry_start + pos, needle.len()).into();
        }
    }

    let len = content[entry_start..entry_end]
        .find('\n')
        .unwrap_or(entry_end - entry_start)
        .max(1);
    (entry_start, len).into()
}

/// Byte range of the `index`-th element of the top-level array
fn find_array_element(content: &str, index: usize) -> Option<(usize, usize)> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut current = 0usize;
    let mut start = None;

    for (pos, ch) in content.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        let opens_element = depth == 1 && !ch.is_whitespace() && ch != ',' && ch != ']';
        if opens_element && start.is_none() && current == index {
            start = Some(pos);
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 1 {
                    if let Some(s) = start {
                        return Some((s, pos + 1));
                    }
                }
                if depth == 0 {
                    if let Some(s) = start {
                        return Some((s, pos));
                    }
                }
            }
            ',' if depth == 1 => {
                if let Some(s) = start {
                    return Some((s, pos));
                }
                current += 1;
            }
            _ => {}
        }
    }
    start.map(|s| (s, content.len()))
}
