//! CLI argument definitions using clap derive

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "regbuild")]
#[command(author, version, about = "Registry Build")]
#[command(long_about = "Validates the country and region registries and publishes each as HTML, PDF and CSV.\n\nSet CHROMEPATH to use a specific Chrome/Chromium executable for PDF output.")]
pub struct Cli {
    /// Do not generate PDF files
    #[arg(long)]
    pub nopdf: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_nopdf_flag() {
        assert!(!Cli::try_parse_from(["regbuild"]).unwrap().nopdf);
        assert!(Cli::try_parse_from(["regbuild", "--nopdf"]).unwrap().nopdf);
        assert!(Cli::try_parse_from(["regbuild", "--pdf"]).is_err());
    }
}
