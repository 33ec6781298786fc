use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Crates documented, with the features that expose the host mocks and the
/// tracing branch of the logging shim.
const ARGS: &[&str] = &[
    "doc",
    "-p",
    "platform",
    "-p",
    "lowpower",
    "--features",
    "lowpower/std,lowpower/tracing",
    "--no-deps",
];

/// Index pages written by `cargo doc`, one per documented crate.
const INDEX_PAGES: &[&str] = &[
    "target/doc/lowpower/index.html",
    "target/doc/platform/index.html",
];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(ARGS);
    if open {
        cmd.arg("--open");
    }

    let output = cmd.output().context("Failed to build documentation")?;

    if !output.status.success() {
        eprintln!("{}", "✗ Documentation build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed");
    }

    // rustdoc warnings (broken intra-doc links) do not fail the build.
    let warnings = String::from_utf8_lossy(&output.stderr)
        .lines()
        .filter(|l| l.trim_start().starts_with("warning:"))
        .count();

    println!(
        "{}",
        format!(
            "✓ Documentation built in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    if warnings > 0 {
        println!(
            "{}",
            format!("  ⚠ {warnings} rustdoc warning(s), run cargo doc to see them").yellow()
        );
    }

    if !open {
        println!();
        for page in INDEX_PAGES {
            println!("   {}", format!("Open {page} in your browser").dimmed());
        }
        println!(
            "   {}",
            "Or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
    }

    println!();

    Ok(())
}
