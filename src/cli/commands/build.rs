//! `regbuild` - build every registry and print what was produced

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::Cli;
use crate::core::Config;
use crate::output::ArtifactOutcome;
use crate::pipeline::{BuildReport, Builder, PipelineReport};

pub async fn run(args: Cli) -> Result<()> {
    let root = std::env::current_dir().into_diagnostic()?;
    let config = Config::load(&root).map_err(|e| miette::miette!("{}", e))?;

    let mut builder = Builder::new(config);
    if args.nopdf {
        builder = builder.without_pdf();
    }

    let registries = builder.config().registries.len();
    println!(
        "{} Building {} registr{}...\n",
        style("→").blue(),
        registries,
        if registries == 1 { "y" } else { "ies" }
    );

    let report = builder.build_all().await;
    print_report(report, registries)
}

fn print_report(report: BuildReport, registries: usize) -> Result<()> {
    for warning in &report.warnings {
        println!("{} {}", style("!").yellow(), style(warning).yellow());
    }

    let failed = report.failure_count();
    let mut degraded = 0;

    for (name, outcome) in report.outcomes {
        match outcome {
            Ok(built) => {
                if !built.is_clean() {
                    degraded += 1;
                }
                print_success(&name, &built);
            }
            Err(failure) => {
                println!(
                    "{} {} - {} failed",
                    style("✗").red(),
                    style(&name).bold(),
                    failure.stage
                );
                let report = miette::Report::new(failure);
                println!("{:?}", report);
            }
        }
    }

    println!();
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", style("Build Summary").bold());
    println!("{}", style("─".repeat(60)).dim());
    println!("  Registries:     {}", style(registries).cyan());
    println!("  Built:          {}", style(registries - failed).green());
    if degraded > 0 {
        println!("  With warnings:  {}", style(degraded).yellow());
    }
    println!("  Failed:         {}", style(failed).red());
    println!();

    match failed {
        0 => {
            println!("{} All registries built", style("✓").green().bold());
            Ok(())
        }
        1 => Err(miette::miette!("Build failed: 1 registry has errors")),
        n => Err(miette::miette!("Build failed: {} registries have errors", n)),
    }
}

fn print_success(name: &str, built: &PipelineReport) {
    println!(
        "{} {} ({} entries, {})",
        style("✓").green(),
        style(name).bold(),
        built.entries,
        built.version
    );
    for path in built.artifacts() {
        println!("    {}", path.display());
    }
    print_missing("pdf", &built.pdf);
    print_missing("csv", &built.csv);
    for warning in built
        .pdf
        .warning()
        .into_iter()
        .chain(built.csv.warning())
        .chain(built.warnings.iter().map(String::as_str))
    {
        println!("    {} {}", style("!").yellow(), style(warning).yellow());
    }
}

/// Explain an artifact that was not written
fn print_missing(label: &str, outcome: &ArtifactOutcome) {
    match outcome {
        ArtifactOutcome::Written { .. } => {}
        ArtifactOutcome::Skipped { reason } => {
            println!("    {}   {}", label, style(format!("skipped: {}", reason)).dim());
        }
        ArtifactOutcome::Failed { .. } => {
            println!("    {}   {}", label, style("not written").yellow());
        }
    }
}
