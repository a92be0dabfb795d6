//! PDF capture through a headless browser
//!
//! A fresh browser process is launched for every document and dropped as
//! soon as the PDF bytes are in hand.

use headless_chrome::{Browser, LaunchOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Renders an already-written HTML page to PDF bytes
pub trait PdfRenderer: Send + Sync {
    fn render_pdf(&self, html_path: &Path) -> Result<Vec<u8>, String>;
}

/// Headless Chrome/Chromium renderer
#[derive(Debug, Clone, Default)]
pub struct ChromePdf {
    /// Browser executable; `None` lets headless_chrome find one
    pub executable: Option<PathBuf>,
}

impl ChromePdf {
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }
}

impl PdfRenderer for ChromePdf {
    fn render_pdf(&self, html_path: &Path) -> Result<Vec<u8>, String> {
        let html_path = html_path
            .canonicalize()
            .map_err(|e| format!("Cannot resolve {}: {}", html_path.display(), e))?;

        let browser = Browser::new(LaunchOptions {
            headless: true,
            sandbox: true,
            path: self.executable.clone(),
            idle_browser_timeout: Duration::from_secs(60),
            ..Default::default()
        })
        .map_err(|e| format!("Failed to launch browser: {}", e))?;

        let tab = browser
            .new_tab()
            .map_err(|e| format!("Failed to open tab: {}", e))?;

        // file:// so that copied site assets next to the page resolve
        tab.navigate_to(&format!("file://{}", html_path.display()))
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| format!("Failed to load {}: {}", html_path.display(), e))?;

        tab.print_to_pdf(None)
            .map_err(|e| format!("Failed to print PDF: {}", e))
    }
}

/// A renderer that always fails with the given message
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct FailingPdf(pub String);

#[cfg(test)]
impl PdfRenderer for FailingPdf {
    fn render_pdf(&self, _html_path: &Path) -> Result<Vec<u8>, String> {
        Err(self.0.clone())
    }
}
