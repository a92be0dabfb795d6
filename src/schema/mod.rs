//! Schema module - JSON Schema validation of registry documents

pub mod validator;

pub use validator::{SchemaError, SchemaViolation, ValidationError, Validator};
