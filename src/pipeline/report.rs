//! Pipeline stages, fatal errors and the build report

use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::FileError;
use crate::output::{ArtifactOutcome, RenderError};
use crate::registry::{InvariantViolation, RegistryError};
use crate::schema::{SchemaError, ValidationError};

/// The states a registry passes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Start,
    Loaded,
    SchemaValidated,
    InvariantValidated,
    Aggregated,
    VersionResolved,
    Rendered,
    HtmlEmitted,
    PdfAttempted,
    CsvAttempted,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Loaded => "load",
            Stage::SchemaValidated => "schema validation",
            Stage::InvariantValidated => "invariant validation",
            Stage::Aggregated => "aggregation",
            Stage::VersionResolved => "version resolution",
            Stage::Rendered => "rendering",
            Stage::HtmlEmitted => "HTML output",
            Stage::PdfAttempted => "PDF output",
            Stage::CsvAttempted => "CSV output",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Errors that abort one registry's pipeline
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SchemaDefinition(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(code(regbuild::registry::invariant))]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    #[diagnostic(code(regbuild::registry::shape))]
    Registry(#[from] RegistryError),

    #[error("Cannot parse {path}: {source}")]
    #[diagnostic(code(regbuild::registry::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(regbuild::template))]
    Template(#[from] RenderError),

    #[error(transparent)]
    #[diagnostic(code(regbuild::io))]
    File(#[from] FileError),

    #[error("Pipeline task aborted: {0}")]
    #[diagnostic(code(regbuild::task))]
    Aborted(String),
}

/// A fatal error together with where it happened
#[derive(Debug, Error, Diagnostic)]
#[error("{registry}: {stage} failed")]
#[diagnostic(code(regbuild::pipeline::failed))]
pub struct PipelineFailure {
    pub registry: String,
    pub stage: Stage,
    #[source]
    #[diagnostic_source]
    pub error: BuildError,
}

impl PipelineFailure {
    pub fn new(registry: impl Into<String>, stage: Stage, error: impl Into<BuildError>) -> Self {
        Self {
            registry: registry.into(),
            stage,
            error: error.into(),
        }
    }

    /// Offending key, for invariant violations
    pub fn key(&self) -> Option<&str> {
        match &self.error {
            BuildError::Invariant(violation) => violation.key(),
            _ => None,
        }
    }
}

/// What one successful pipeline produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub registry: String,
    pub entries: usize,
    pub version: String,
    pub html: PathBuf,
    pub pdf: ArtifactOutcome,
    pub csv: ArtifactOutcome,
    /// Degraded-output conditions that did not stop the build
    pub warnings: Vec<String>,
}

impl PipelineReport {
    /// Every artifact file that exists after this run
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.html.clone()];
        paths.extend(self.pdf.path().map(PathBuf::from));
        paths.extend(self.csv.path().map(PathBuf::from));
        paths
    }

    /// True when every artifact was produced and nothing was degraded
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
            && self.pdf.warning().is_none()
            && self.csv.warning().is_none()
            && self.csv.succeeded()
            && !matches!(self.pdf, ArtifactOutcome::Failed { .. })
    }
}

pub type PipelineResult = Result<PipelineReport, PipelineFailure>;

/// Per-registry outcomes of one build, in configuration order
#[derive(Debug, Default)]
pub struct BuildReport {
    pub outcomes: Vec<(String, PipelineResult)>,
    /// Build-wide warnings (e.g. static assets not copied)
    pub warnings: Vec<String>,
}

impl BuildReport {
    pub fn get(&self, registry: &str) -> Option<&PipelineResult> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == registry)
            .map(|(_, result)| result)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &PipelineReport> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &PipelineFailure> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}
