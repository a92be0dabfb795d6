//! Registry build pipeline
//!
//! Each configured registry runs through load, schema validation, invariant
//! validation, aggregation (regions only), version lookup, rendering and
//! emission as its own tokio task. Tasks share nothing mutable; a fatal
//! error in one leaves the others running.

pub mod report;

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::ArtifactKind;
use crate::core::{loader, Config, Git, VersionSource, UNKNOWN_VERSION};
use crate::output::{self, ArtifactOutcome, BuildContext, ChromePdf, Partials, PdfRenderer, Renderer};
use crate::registry::{aggregate_regions, check_invariants, Registry, RegistryDescriptor, RegistryKind};
use crate::schema::Validator;

pub use report::{BuildError, BuildReport, PipelineFailure, PipelineReport, PipelineResult, Stage};

/// Drives every configured registry from source files to artifacts
#[derive(Clone)]
pub struct Builder {
    config: Arc<Config>,
    pdf: Option<Arc<dyn PdfRenderer>>,
    versions: Arc<dyn VersionSource>,
    generated_at: Option<DateTime<Utc>>,
}

impl Builder {
    /// Builder with the default collaborators: git for the version and
    /// headless Chrome for PDFs
    pub fn new(config: Config) -> Self {
        let pdf: Arc<dyn PdfRenderer> = Arc::new(ChromePdf::new(config.chrome_path.clone()));
        let versions: Arc<dyn VersionSource> = Arc::new(Git::new(&config.root));
        Self {
            config: Arc::new(config),
            pdf: Some(pdf),
            versions,
            generated_at: None,
        }
    }

    /// Skip PDF generation entirely
    pub fn without_pdf(mut self) -> Self {
        self.pdf = None;
        self
    }

    pub fn with_pdf_renderer(mut self, renderer: Arc<dyn PdfRenderer>) -> Self {
        self.pdf = Some(renderer);
        self
    }

    pub fn with_version_source(mut self, versions: Arc<dyn VersionSource>) -> Self {
        self.versions = versions;
        self
    }

    /// Pin the timestamp stamped into pages (defaults to the current time)
    pub fn with_timestamp(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build all configured registries concurrently and collect the outcomes
    pub async fn build_all(&self) -> BuildReport {
        let mut report = BuildReport::default();

        let build_dir = self.config.build_dir();
        match loader::ensure_dir(&build_dir).await {
            Ok(()) => {
                if let Some(warning) = self.copy_site_assets().await {
                    report.warnings.push(warning);
                }
            }
            Err(e) => {
                // Each pipeline will report the unwritable output on its own
                warn!("{}", e);
                report.warnings.push(e.to_string());
            }
        }

        let handles: Vec<_> = self
            .config
            .registries
            .iter()
            .cloned()
            .map(|desc| {
                let builder = self.clone();
                let name = desc.name().to_string();
                let handle = tokio::spawn(async move { builder.build_registry(&desc).await });
                (name, handle)
            })
            .collect();

        for (name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join) => Err(PipelineFailure::new(
                    name.clone(),
                    Stage::Start,
                    BuildError::Aborted(join.to_string()),
                )),
            };
            report.outcomes.push((name, result));
        }

        report
    }

    /// Copy static site files into the output directory
    async fn copy_site_assets(&self) -> Option<String> {
        let site_dir = self.config.site_dir();
        if !site_dir.is_dir() {
            let warning = format!("Site directory {} not found, no assets copied", site_dir.display());
            warn!("{}", warning);
            return Some(warning);
        }

        let build_dir = self.config.build_dir();
        let copied = tokio::task::spawn_blocking(move || loader::copy_tree(&site_dir, &build_dir)).await;
        match copied {
            Ok(Ok(count)) => {
                debug!(count, "Copied site assets");
                None
            }
            Ok(Err(e)) => {
                warn!("{}", e);
                Some(e.to_string())
            }
            Err(join) => {
                warn!("{}", join);
                Some(join.to_string())
            }
        }
    }

    /// Run one registry end to end. A failure is tagged with the stage
    /// that was being entered when it happened.
    pub async fn build_registry(&self, desc: &RegistryDescriptor) -> PipelineResult {
        let name = desc.name().to_string();
        info!(registry = %name, "Building {} started", name);
        let mut warnings = Vec::new();

        // Load
        let kind = desc.list_type;
        let data_path = self.config.data_path(kind);
        let schema_path = self.config.schema_path(kind);
        let content = loader::read_text(&data_path)
            .await
            .at_stage(&name, Stage::Loaded)?;
        let schema_text = loader::read_text(&schema_path)
            .await
            .at_stage(&name, Stage::Loaded)?;
        advance(&name, Stage::Loaded);

        // Schema validation
        info!(registry = %name, "{} schema validation started", desc.list_title);
        let registry = {
            let validator = Validator::new(&schema_text, &file_name(&schema_path))
                .at_stage(&name, Stage::SchemaValidated)?;
            let document = validator
                .validate(&content, &file_name(&data_path))
                .at_stage(&name, Stage::SchemaValidated)?;
            Registry::from_value(kind, document).at_stage(&name, Stage::SchemaValidated)?
        };
        info!(registry = %name, "{} schema validation passed", desc.list_title);
        advance(&name, Stage::SchemaValidated);

        // Invariants
        check_invariants(&registry, &desc.list_title)
            .at_stage(&name, Stage::InvariantValidated)?;
        advance(&name, Stage::InvariantValidated);

        // Aggregation
        let mut registry = registry;
        if kind.aggregates() {
            let countries = self
                .load_countries()
                .await
                .at_stage(&name, Stage::Aggregated)?;
            for region in aggregate_regions(&mut registry, &countries) {
                let warning = format!("Region {} has no countries; smpteSite left empty", region);
                warn!(registry = %name, "{}", warning);
                warnings.push(warning);
            }
            advance(&name, Stage::Aggregated);
        }

        // Version
        let version = self.resolve_version(&mut warnings).await;
        let build = BuildContext {
            generated_at: self.generated_at.unwrap_or_else(Utc::now),
            version,
            html_path: Config::artifact_name(desc, ArtifactKind::Html),
            pdf_path: Config::artifact_name(desc, ArtifactKind::Pdf),
            csv_path: Config::artifact_name(desc, ArtifactKind::Csv),
        };
        advance(&name, Stage::VersionResolved);

        // Render
        let partials = Partials::load(&self.config)
            .await
            .at_stage(&name, Stage::Rendered)?;
        let renderer = Renderer::load(&self.config, &partials, desc)
            .await
            .at_stage(&name, Stage::Rendered)?;
        let markup = renderer
            .render(&registry, desc, &build)
            .at_stage(&name, Stage::Rendered)?;
        advance(&name, Stage::Rendered);

        // HTML
        let html_path = self.config.output_path(desc, ArtifactKind::Html);
        loader::ensure_dir(&self.config.build_dir())
            .await
            .at_stage(&name, Stage::HtmlEmitted)?;
        output::emit_html(&html_path, &markup)
            .await
            .at_stage(&name, Stage::HtmlEmitted)?;
        advance(&name, Stage::HtmlEmitted);

        // PDF (best effort)
        let pdf = match &self.pdf {
            Some(renderer) => {
                let pdf_path = self.config.output_path(desc, ArtifactKind::Pdf);
                output::emit_pdf(Arc::clone(renderer), &html_path, &pdf_path).await
            }
            None => ArtifactOutcome::Skipped {
                reason: "PDF generation disabled".to_string(),
            },
        };
        advance(&name, Stage::PdfAttempted);

        // CSV (best effort)
        let csv_path = self.config.output_path(desc, ArtifactKind::Csv);
        let csv = output::emit_csv(&registry.entries, &csv_path).await;
        advance(&name, Stage::CsvAttempted);

        advance(&name, Stage::Done);
        info!(registry = %name, %pdf, %csv, "Build of {} completed", name);

        Ok(PipelineReport {
            registry: name,
            entries: registry.entries.len(),
            version: build.version,
            html: html_path,
            pdf,
            csv,
            warnings,
        })
    }

    /// The countries registry as input to region statistics
    async fn load_countries(&self) -> Result<Registry, BuildError> {
        let path = self.config.data_path(RegistryKind::Countries);
        let text = loader::read_text(&path).await?;
        let value = serde_json::from_str(&text).map_err(|source| BuildError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Registry::from_value(RegistryKind::Countries, value)?)
    }

    async fn resolve_version(&self, warnings: &mut Vec<String>) -> String {
        let versions = Arc::clone(&self.versions);
        let resolved = tokio::task::spawn_blocking(move || versions.version())
            .await
            .map_err(|join| join.to_string())
            .and_then(|r| r.map_err(|e| e.to_string()));

        match resolved {
            Ok(version) => version,
            Err(e) => {
                let warning = format!("Version lookup failed ({}); using \"{}\"", e, UNKNOWN_VERSION);
                warn!("{}", warning);
                warnings.push(warning);
                UNKNOWN_VERSION.to_string()
            }
        }
    }
}

fn advance(registry: &str, stage: Stage) {
    debug!(registry, %stage, "Stage reached");
}

/// Tag a fatal error with the registry and stage it aborted, logging it
trait AtStage<T> {
    fn at_stage(self, registry: &str, stage: Stage) -> Result<T, PipelineFailure>;
}

impl<T, E: Into<BuildError>> AtStage<T> for Result<T, E> {
    fn at_stage(self, registry: &str, stage: Stage) -> Result<T, PipelineFailure> {
        self.map_err(|e| {
            let failure = PipelineFailure::new(registry, stage, e);
            warn!(registry, %stage, "{}", failure.error);
            failure
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests;
