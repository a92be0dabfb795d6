use super::*;
use crate::core::GitError;
use crate::output::FailingPdf;
use chrono::TimeZone;
use std::fs;
use tempfile::TempDir;

const COUNTRIES: &str = r#"[
  { "isoAlpha2": "AA", "name": "Aland", "region": "A", "siteCount": 2, "smpteSite": 1 },
  { "isoAlpha2": "AB", "name": "Abland", "region": "A", "siteCount": 4, "smpteSite": 3 },
  { "isoAlpha2": "BA", "name": "Baland", "region": "B", "siteCount": 5, "smpteSite": 5 }
]"#;

const REGIONS: &str = r#"[
  { "region": "A" },
  { "region": "B" }
]"#;

const COUNTRIES_SCHEMA: &str = r#"{
  "type": "array",
  "items": {
    "type": "object",
    "required": ["isoAlpha2", "name", "region", "siteCount", "smpteSite"],
    "properties": {
      "isoAlpha2": { "type": "string", "pattern": "^[A-Z]{2}$" },
      "siteCount": { "type": "integer", "minimum": 0 }
    }
  }
}"#;

const REGIONS_SCHEMA: &str = r#"{
  "type": "array",
  "items": { "type": "object", "required": ["region"] }
}"#;

const PAGE: &str = r#"{% include "partials/header.html" %}
{% for e in entries %}<li>{{ title }}{% for k, v in e %} {{ k }}={{ v }}{% endfor %}</li>
{% endfor %}{% include "partials/footer.html" %}"#;

struct FixedVersion;

impl VersionSource for FixedVersion {
    fn version(&self) -> Result<String, GitError> {
        Ok("0123abcd".to_string())
    }
}

struct NoVersion;

impl VersionSource for NoVersion {
    fn version(&self) -> Result<String, GitError> {
        Err(GitError::NotARepo)
    }
}

/// A project tree with both registries, schemas, templates and one asset
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("registries");
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("schemas")).unwrap();
    fs::create_dir_all(root.join("templates/partials")).unwrap();
    fs::create_dir_all(tmp.path().join("site")).unwrap();

    fs::write(root.join("data/countries.json"), COUNTRIES).unwrap();
    fs::write(root.join("data/regions.json"), REGIONS).unwrap();
    fs::write(root.join("schemas/countries.schema.json"), COUNTRIES_SCHEMA).unwrap();
    fs::write(root.join("schemas/regions.schema.json"), REGIONS_SCHEMA).unwrap();
    fs::write(root.join("templates/countries.html"), PAGE).unwrap();
    fs::write(root.join("templates/regions.html"), PAGE).unwrap();
    fs::write(
        root.join("templates/partials/header.html"),
        "<h1>{{ title }}</h1><p>{{ generatedAt }} {{ versionLabel }}</p>",
    )
    .unwrap();
    fs::write(
        root.join("templates/partials/footer.html"),
        r#"<a href="{{ pdfPath }}">PDF</a> <a href="{{ csvPath }}">CSV</a>"#,
    )
    .unwrap();
    fs::write(tmp.path().join("site/style.css"), "body { margin: 0 }").unwrap();
    tmp
}

fn builder(tmp: &TempDir) -> Builder {
    Builder::new(Config::with_root(tmp.path()))
        .without_pdf()
        .with_version_source(Arc::new(FixedVersion))
        .with_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap())
}

fn read(tmp: &TempDir, file: &str) -> String {
    fs::read_to_string(tmp.path().join("build").join(file)).unwrap()
}

#[tokio::test]
async fn test_full_build_produces_html_and_csv() {
    let tmp = project();
    let report = builder(&tmp).build_all().await;

    assert!(!report.has_failures(), "{:?}", report.outcomes);
    assert!(report.warnings.is_empty());

    let countries = report.get("countries").unwrap().as_ref().unwrap();
    assert_eq!(countries.entries, 3);
    assert_eq!(countries.version, "0123abcd");
    assert!(matches!(countries.pdf, ArtifactOutcome::Skipped { .. }));
    assert!(countries.csv.succeeded());

    let html = read(&tmp, "countries.html");
    assert!(html.starts_with("<h1>Countries</h1><p>2024-05-01T08:30:00Z 0123abcd</p>"));
    assert!(html.contains(r#"<a href="countries.pdf">PDF</a>"#));

    assert_eq!(
        read(&tmp, "countries.csv"),
        "isoAlpha2,name,region,siteCount,smpteSite\nAA,Aland,A,2,1\nAB,Abland,A,4,3\nBA,Baland,B,5,5\n"
    );
    assert_eq!(read(&tmp, "style.css"), "body { margin: 0 }");
}

#[tokio::test]
async fn test_regions_are_aggregated() {
    let tmp = project();
    let report = builder(&tmp).build_all().await;
    let regions = report.get("regions").unwrap().as_ref().unwrap();
    assert!(regions.warnings.is_empty());

    assert_eq!(
        read(&tmp, "regions.csv"),
        "region,countryCount,siteCount,smpteSite\nA,2,6,2\nB,1,5,5\n"
    );
    let html = read(&tmp, "regions.html");
    assert!(html.contains("<li>Regions region=A countryCount=2 siteCount=6 smpteSite=2</li>"));
}

#[tokio::test]
async fn test_region_without_countries_is_a_warning() {
    let tmp = project();
    fs::write(
        tmp.path().join("registries/data/regions.json"),
        r#"[{"region": "A"}, {"region": "B"}, {"region": "C"}]"#,
    )
    .unwrap();

    let report = builder(&tmp).build_all().await;
    let regions = report.get("regions").unwrap().as_ref().unwrap();
    assert_eq!(regions.warnings.len(), 1);
    assert!(regions.warnings[0].contains("Region C"));
    assert!(read(&tmp, "regions.csv").ends_with("C,0,0,\n"));
}

#[tokio::test]
async fn test_schema_failure_does_not_stop_other_registries() {
    let tmp = project();
    fs::write(
        tmp.path().join("registries/data/countries.json"),
        r#"[{ "isoAlpha2": "aa", "region": "A", "siteCount": 2, "smpteSite": 1 }]"#,
    )
    .unwrap();

    let report = builder(&tmp).build_all().await;
    assert_eq!(report.failure_count(), 1);

    let failure = report.get("countries").unwrap().as_ref().unwrap_err();
    assert_eq!(failure.stage, Stage::SchemaValidated);
    match &failure.error {
        BuildError::Schema(e) => assert_eq!(e.violation_count(), 2),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!tmp.path().join("build/countries.html").exists());
    assert!(!tmp.path().join("build/countries.csv").exists());

    // regions still aggregates from the raw countries document
    assert!(report.get("regions").unwrap().is_ok());
    assert!(tmp.path().join("build/regions.html").exists());
}

#[tokio::test]
async fn test_unsorted_registry_names_key() {
    let tmp = project();
    fs::write(
        tmp.path().join("registries/data/regions.json"),
        r#"[{"region": "B"}, {"region": "A"}]"#,
    )
    .unwrap();

    let report = builder(&tmp).build_all().await;
    let failure = report.get("regions").unwrap().as_ref().unwrap_err();
    assert_eq!(failure.stage, Stage::InvariantValidated);
    assert_eq!(failure.key(), Some("B"));
    assert_eq!(failure.error.to_string(), "Regions sort order B is not sorted");
    assert!(report.get("countries").unwrap().is_ok());
}

#[tokio::test]
async fn test_pdf_failure_keeps_html_and_csv() {
    let tmp = project();
    let report = builder(&tmp)
        .with_pdf_renderer(Arc::new(FailingPdf("browser exploded".to_string())))
        .build_all()
        .await;

    for name in ["countries", "regions"] {
        let outcome = report.get(name).unwrap().as_ref().unwrap();
        assert!(!outcome.pdf.succeeded());
        assert_eq!(outcome.pdf.warning(), Some("browser exploded"));
        assert!(outcome.csv.succeeded());
        assert_eq!(outcome.artifacts().len(), 2);
    }
    assert!(tmp.path().join("build/countries.html").exists());
    assert!(tmp.path().join("build/countries.csv").exists());
    assert!(!tmp.path().join("build/countries.pdf").exists());
}

#[tokio::test]
async fn test_missing_template_is_fatal() {
    let tmp = project();
    fs::remove_file(tmp.path().join("registries/templates/regions.html")).unwrap();

    let report = builder(&tmp).build_all().await;
    let failure = report.get("regions").unwrap().as_ref().unwrap_err();
    assert_eq!(failure.stage, Stage::Rendered);
    assert!(matches!(failure.error, BuildError::Template(_)));
    assert!(!tmp.path().join("build/regions.html").exists());
    assert!(report.get("countries").unwrap().is_ok());
}

#[tokio::test]
async fn test_unknown_version_is_substituted() {
    let tmp = project();
    let report = builder(&tmp)
        .with_version_source(Arc::new(NoVersion))
        .build_all()
        .await;

    let countries = report.get("countries").unwrap().as_ref().unwrap();
    assert_eq!(countries.version, UNKNOWN_VERSION);
    assert_eq!(countries.warnings.len(), 1);
    assert!(read(&tmp, "countries.html").contains("Unknown version"));
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let tmp = project();
    builder(&tmp).build_all().await;
    let first = (read(&tmp, "regions.html"), read(&tmp, "regions.csv"));
    builder(&tmp).build_all().await;
    let second = (read(&tmp, "regions.html"), read(&tmp, "regions.csv"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_missing_data_file_fails_at_load() {
    let tmp = project();
    fs::remove_file(tmp.path().join("registries/data/countries.json")).unwrap();

    let report = builder(&tmp).build_all().await;
    let failure = report.get("countries").unwrap().as_ref().unwrap_err();
    assert_eq!(failure.stage, Stage::Loaded);

    // regions needs the countries document for its statistics
    let failure = report.get("regions").unwrap().as_ref().unwrap_err();
    assert_eq!(failure.stage, Stage::Aggregated);
}

#[tokio::test]
async fn test_missing_site_dir_is_a_warning() {
    let tmp = project();
    fs::remove_dir_all(tmp.path().join("site")).unwrap();

    let report = builder(&tmp).build_all().await;
    assert!(!report.has_failures());
    assert_eq!(report.warnings.len(), 1);
}
