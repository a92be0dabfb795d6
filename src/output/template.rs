//! Page rendering using Tera
//!
//! The shared header/footer fragments are read once per build into a
//! [`Partials`] value and handed to every [`Renderer`]; nothing is
//! registered globally.

use chrono::{DateTime, SecondsFormat, Utc};
use std::error::Error as _;
use std::path::{Path, PathBuf};
use tera::Tera;
use thiserror::Error;

use crate::core::{loader, Config};
use crate::registry::{Registry, RegistryDescriptor};

/// Names under which the shared fragments are available to `{% include %}`
pub const HEADER_PARTIAL: &str = "partials/header.html";
pub const FOOTER_PARTIAL: &str = "partials/footer.html";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template not found: {path}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template {name} failed to parse: {message}")]
    Parse { name: String, message: String },

    #[error("Template {name} failed to render: {message}")]
    Render { name: String, message: String },
}

/// Shared header and footer fragments
#[derive(Debug, Clone)]
pub struct Partials {
    pub header: String,
    pub footer: String,
}

impl Partials {
    pub fn new(header: impl Into<String>, footer: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            footer: footer.into(),
        }
    }

    /// Read both fragments from the configured templates directory
    pub async fn load(config: &Config) -> Result<Self, RenderError> {
        let header = read_template(&config.partial_path("header")).await?;
        let footer = read_template(&config.partial_path("footer")).await?;
        Ok(Self { header, footer })
    }
}

/// Per-run values stamped into every page
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub html_path: String,
    pub pdf_path: String,
    pub csv_path: String,
}

impl BuildContext {
    pub fn generated_at_label(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// A compiled page template together with the shared partials
pub struct Renderer {
    tera: Tera,
    name: String,
}

impl Renderer {
    /// Compile `source` as the page template `name`
    pub fn new(partials: &Partials, name: &str, source: &str) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (HEADER_PARTIAL, partials.header.as_str()),
            (FOOTER_PARTIAL, partials.footer.as_str()),
            (name, source),
        ])
        .map_err(|e| RenderError::Parse {
            name: name.to_string(),
            message: error_chain(&e),
        })?;

        Ok(Self {
            tera,
            name: name.to_string(),
        })
    }

    /// Read the page template for `desc` and compile it
    pub async fn load(
        config: &Config,
        partials: &Partials,
        desc: &RegistryDescriptor,
    ) -> Result<Self, RenderError> {
        let path = config.template_path(desc);
        let source = read_template(&path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.html", desc.template_type));
        Self::new(partials, &name, &source)
    }

    /// Render the page for a validated (and, for regions, aggregated) registry
    pub fn render(
        &self,
        registry: &Registry,
        desc: &RegistryDescriptor,
        build: &BuildContext,
    ) -> Result<String, RenderError> {
        let mut context = tera::Context::new();
        context.insert("entries", &registry.entries);
        context.insert("generatedAt", &build.generated_at_label());
        context.insert("htmlPath", &build.html_path);
        context.insert("pdfPath", &build.pdf_path);
        context.insert("csvPath", &build.csv_path);
        context.insert("versionLabel", &build.version);
        context.insert("typeKey", &desc.list_type.as_str());
        context.insert("idKey", &desc.id_type);
        context.insert("title", &desc.list_title);

        self.tera
            .render(&self.name, &context)
            .map_err(|e| RenderError::Render {
                name: self.name.clone(),
                message: error_chain(&e),
            })
    }
}

async fn read_template(path: &Path) -> Result<String, RenderError> {
    loader::read_text(path)
        .await
        .map_err(|e| RenderError::NotFound {
            path: e.path,
            source: e.source,
        })
}

/// Tera keeps the useful part of its messages in the source chain
fn error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn partials() -> Partials {
        Partials::new("<header>{{ title }}</header>", "<footer>{{ versionLabel }}</footer>")
    }

    fn build_context() -> BuildContext {
        BuildContext {
            generated_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            version: "abc123".to_string(),
            html_path: "regions.html".to_string(),
            pdf_path: "regions.pdf".to_string(),
            csv_path: "regions.csv".to_string(),
        }
    }

    fn regions() -> Registry {
        Registry::from_value(
            RegistryKind::Regions,
            json!([{"region": "Africa", "countryCount": 2}, {"region": "Asia", "countryCount": 1}]),
        )
        .unwrap()
    }

    const PAGE: &str = r#"{% include "partials/header.html" %}
<p>{{ generatedAt }} {{ typeKey }}/{{ idKey }} <a href="{{ pdfPath }}">pdf</a> <a href="{{ csvPath }}">csv</a></p>
{% for e in entries %}<tr id="{{ idKey }}-{{ e.region }}"><td>{{ e.countryCount }}</td></tr>
{% endfor %}{% include "partials/footer.html" %}"#;

    #[test]
    fn test_render_binds_context() {
        let desc = RegistryDescriptor::defaults()[1].clone();
        let renderer = Renderer::new(&partials(), "regions.html", PAGE).unwrap();
        let html = renderer.render(&regions(), &desc, &build_context()).unwrap();

        assert!(html.starts_with("<header>Regions</header>"));
        assert!(html.contains("2024-03-01T12:00:00Z regions/region"));
        assert!(html.contains(r#"<a href="regions.pdf">pdf</a>"#));
        assert!(html.contains(r#"<tr id="region-Africa"><td>2</td></tr>"#));
        assert!(html.find("Africa").unwrap() < html.find("Asia").unwrap());
        assert!(html.ends_with("<footer>abc123</footer>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let desc = RegistryDescriptor::defaults()[1].clone();
        let renderer = Renderer::new(&partials(), "regions.html", PAGE).unwrap();
        let first = renderer.render(&regions(), &desc, &build_context()).unwrap();
        let second = renderer.render(&regions(), &desc, &build_context()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let result = Renderer::new(&partials(), "broken.html", "{% for e in entries %}");
        assert!(matches!(result, Err(RenderError::Parse { .. })));
    }

    #[test]
    fn test_missing_include_fails_at_render() {
        let desc = RegistryDescriptor::defaults()[0].clone();
        let renderer = Renderer::new(&partials(), "page.html", r#"{% include "nope.html" %}"#);
        let result = renderer.and_then(|r| r.render(&regions(), &desc, &build_context()));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path());
        let err = Partials::load(&config).await.unwrap_err();
        assert!(matches!(err, RenderError::NotFound { .. }));
    }
}
