use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// One `cargo` invocation in the check sequence.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
    /// Failing steps abort the run; advisory ones only print.
    fatal: bool,
}

const STEPS: &[Step] = &[
    Step {
        label: "lowpower (no_std, Cortex-M4F, atomics)",
        args: &[
            "check",
            "-p",
            "lowpower",
            "--target",
            "thumbv7em-none-eabihf",
            "--no-default-features",
        ],
        fatal: true,
    },
    Step {
        label: "lowpower (no_std, Cortex-M0+, critical-section cells)",
        args: &[
            "check",
            "-p",
            "lowpower",
            "--target",
            "thumbv6m-none-eabi",
            "--no-default-features",
        ],
        fatal: true,
    },
    Step {
        label: "lowpower (defmt logging)",
        args: &[
            "check",
            "-p",
            "lowpower",
            "--target",
            "thumbv7em-none-eabihf",
            "--features",
            "defmt",
        ],
        fatal: true,
    },
    Step {
        label: "lowpower (host, tracing logging)",
        args: &["check", "-p", "lowpower", "--features", "std,tracing"],
        fatal: true,
    },
    Step {
        label: "platform (no_std)",
        args: &[
            "check",
            "-p",
            "platform",
            "--target",
            "thumbv7em-none-eabihf",
            "--no-default-features",
        ],
        fatal: true,
    },
    Step {
        label: "clippy",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        fatal: false,
    },
    Step {
        label: "formatting",
        args: &["fmt", "--all", "--check"],
        fatal: false,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking workspace builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(step.args)
            .output()
            .with_context(|| format!("Failed to run cargo for {}", step.label))?;

        if output.status.success() {
            println!(
                "{}",
                format!(
                    "  ✓ {} passed in {:.2}s",
                    step.label,
                    start.elapsed().as_secs_f64()
                )
                .green()
            );
        } else if step.fatal {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} check failed", step.label);
        } else {
            eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        }
        println!();
    }

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
