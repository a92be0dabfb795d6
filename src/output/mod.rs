//! Output module - page rendering and the three artifact emitters
//!
//! HTML is the primary deliverable and its failure is returned as an error.
//! PDF and CSV are best-effort: their results come back as an
//! [`ArtifactOutcome`] and never abort the caller.

pub mod csv;
pub mod pdf;
pub mod template;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::core::loader::{self, FileError};
use crate::registry::Entry;

pub use pdf::{ChromePdf, PdfRenderer};
#[cfg(test)]
pub use pdf::FailingPdf;
pub use template::{BuildContext, Partials, RenderError, Renderer};

/// What happened to one best-effort artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Written to the given path; may still carry a warning
    Written {
        path: PathBuf,
        warning: Option<String>,
    },
    /// Deliberately not produced
    Skipped { reason: String },
    /// Attempted and failed
    Failed { warning: String },
}

impl ArtifactOutcome {
    pub fn written(path: impl Into<PathBuf>) -> Self {
        ArtifactOutcome::Written {
            path: path.into(),
            warning: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, ArtifactOutcome::Written { .. })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ArtifactOutcome::Written { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            ArtifactOutcome::Written { warning, .. } => warning.as_deref(),
            ArtifactOutcome::Skipped { .. } => None,
            ArtifactOutcome::Failed { warning } => Some(warning),
        }
    }
}

impl fmt::Display for ArtifactOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactOutcome::Written { path, .. } => write!(f, "{}", path.display()),
            ArtifactOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
            ArtifactOutcome::Failed { warning } => write!(f, "failed ({})", warning),
        }
    }
}

/// Write the rendered page verbatim
pub async fn emit_html(path: &Path, markup: &str) -> Result<(), FileError> {
    loader::write_file(path, markup).await
}

/// Capture the written page as a PDF
pub async fn emit_pdf(
    renderer: Arc<dyn PdfRenderer>,
    html_path: &Path,
    pdf_path: &Path,
) -> ArtifactOutcome {
    let page = html_path.to_path_buf();
    let bytes = match tokio::task::spawn_blocking(move || renderer.render_pdf(&page)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(message)) => return failed(pdf_path, message),
        Err(join) => return failed(pdf_path, format!("PDF renderer panicked: {}", join)),
    };

    match loader::write_file(pdf_path, bytes).await {
        Ok(()) => ArtifactOutcome::written(pdf_path),
        Err(e) => failed(pdf_path, e.to_string()),
    }
}

/// Serialize the registry rows and write them as CSV
pub async fn emit_csv(entries: &[Entry], csv_path: &Path) -> ArtifactOutcome {
    let document = match csv::to_csv(entries) {
        Ok(doc) => doc,
        Err(e) => return failed(csv_path, e.to_string()),
    };

    if let Err(e) = loader::write_file(csv_path, &document.text).await {
        return failed(csv_path, e.to_string());
    }

    let warning = if document.unescaped_cells.is_empty() {
        None
    } else {
        let cells = document
            .unescaped_cells
            .iter()
            .map(|(row, column)| format!("row {} '{}'", row + 1, column))
            .collect::<Vec<_>>()
            .join(", ");
        let message = format!("unescaped delimiter in {}", cells);
        warn!(path = %csv_path.display(), "{}", message);
        Some(message)
    };

    ArtifactOutcome::Written {
        path: csv_path.to_path_buf(),
        warning,
    }
}

fn failed(path: &Path, warning: String) -> ArtifactOutcome {
    warn!(path = %path.display(), "{}", warning);
    ArtifactOutcome::Failed { warning }
}
