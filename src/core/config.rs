//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::registry::{RegistryDescriptor, RegistryKind};

/// Name of the optional project configuration file
pub const CONFIG_FILE: &str = "regbuild.yaml";

/// Environment variable naming an alternate browser executable
pub const CHROME_PATH_ENV: &str = "CHROMEPATH";

/// The artifacts emitted for each registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Html,
    Pdf,
    Csv,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Csv => "csv",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Build configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; all relative paths below resolve against it
    pub root: PathBuf,

    /// Directory holding `data/`, `schemas/` and `templates/`
    pub registries_dir: PathBuf,

    /// Static assets copied verbatim into the output directory
    pub site_dir: PathBuf,

    /// Output directory
    pub build_dir: PathBuf,

    /// Registries to build, in report order
    pub registries: Vec<RegistryDescriptor>,

    /// Browser executable for PDF rendering; `None` uses default discovery
    pub chrome_path: Option<PathBuf>,
}

/// Overrides read from `regbuild.yaml`
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
struct FileConfig {
    registries_dir: Option<PathBuf>,
    site_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    registries: Option<Vec<RegistryDescriptor>>,
    chrome_path: Option<PathBuf>,
}

impl Config {
    /// Built-in defaults rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registries_dir: PathBuf::from("registries"),
            site_dir: PathBuf::from("site"),
            build_dir: PathBuf::from("build"),
            registries: RegistryDescriptor::defaults(),
            chrome_path: None,
        }
    }

    /// Load configuration from all sources, merging in priority order
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        // 1. Built-in defaults
        let mut config = Self::with_root(root);

        // 2. Project config (regbuild.yaml)
        let path = root.join(CONFIG_FILE);
        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let file: FileConfig =
                serde_yml::from_str(&contents).map_err(|e| ConfigError::Invalid {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            config.merge(file);
        }

        // 3. Environment variables
        if let Some(chrome) = std::env::var_os(CHROME_PATH_ENV) {
            if !chrome.is_empty() {
                config.chrome_path = Some(PathBuf::from(chrome));
            }
        }

        Ok(config)
    }

    fn merge(&mut self, other: FileConfig) {
        if let Some(dir) = other.registries_dir {
            self.registries_dir = dir;
        }
        if let Some(dir) = other.site_dir {
            self.site_dir = dir;
        }
        if let Some(dir) = other.build_dir {
            self.build_dir = dir;
        }
        if let Some(registries) = other.registries {
            self.registries = registries;
        }
        if other.chrome_path.is_some() {
            self.chrome_path = other.chrome_path;
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.resolve(&self.build_dir)
    }

    pub fn site_dir(&self) -> PathBuf {
        self.resolve(&self.site_dir)
    }

    pub fn data_path(&self, kind: RegistryKind) -> PathBuf {
        self.resolve(&self.registries_dir)
            .join("data")
            .join(format!("{}.json", kind))
    }

    pub fn schema_path(&self, kind: RegistryKind) -> PathBuf {
        self.resolve(&self.registries_dir)
            .join("schemas")
            .join(format!("{}.schema.json", kind))
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.resolve(&self.registries_dir).join("templates")
    }

    pub fn template_path(&self, desc: &RegistryDescriptor) -> PathBuf {
        self.templates_dir()
            .join(format!("{}.html", desc.template_type))
    }

    pub fn partial_path(&self, name: &str) -> PathBuf {
        self.templates_dir()
            .join("partials")
            .join(format!("{}.html", name))
    }

    /// File name of an artifact, as linked from the page
    pub fn artifact_name(desc: &RegistryDescriptor, kind: ArtifactKind) -> String {
        format!("{}.{}", desc.template_type, kind.extension())
    }

    pub fn output_path(&self, desc: &RegistryDescriptor, kind: ArtifactKind) -> PathBuf {
        self.build_dir().join(Self::artifact_name(desc, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_paths() {
        let config = Config::with_root("/proj");
        let regions = &config.registries[1];
        assert_eq!(
            config.data_path(RegistryKind::Countries),
            PathBuf::from("/proj/registries/data/countries.json")
        );
        assert_eq!(
            config.schema_path(RegistryKind::Regions),
            PathBuf::from("/proj/registries/schemas/regions.schema.json")
        );
        assert_eq!(
            config.template_path(regions),
            PathBuf::from("/proj/registries/templates/regions.html")
        );
        assert_eq!(
            config.partial_path("header"),
            PathBuf::from("/proj/registries/templates/partials/header.html")
        );
        assert_eq!(
            config.output_path(regions, ArtifactKind::Pdf),
            PathBuf::from("/proj/build/regions.pdf")
        );
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.registries, RegistryDescriptor::defaults());
        assert_eq!(config.build_dir, PathBuf::from("build"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "buildDir: public\nregistries:\n  - listType: regions\n    templateType: regions\n    idType: region\n    listTitle: Regions\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.build_dir(), dir.path().join("public"));
        assert_eq!(config.registries.len(), 1);
        assert_eq!(config.registries[0].list_type, RegistryKind::Regions);
        assert_eq!(config.site_dir, PathBuf::from("site"));
    }

    #[test]
    fn test_unknown_registry_type_is_rejected() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "registries:\n  - listType: planets\n    templateType: planets\n    idType: planet\n    listTitle: Planets\n",
        )
        .unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
