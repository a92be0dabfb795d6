//! Registry Build
//!
//! Turns versioned, schema-governed JSON registries (countries, regions)
//! into published HTML, PDF and CSV artifacts.

pub mod cli;
pub mod core;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod schema;
