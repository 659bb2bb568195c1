use anyhow::Context;
use clap::Parser;
use colored::*;
use racecourse_join::cli::{Args, print_summary, setup_logging};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    if let Err(error) = setup_logging(&args) {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), error);
        process::exit(1);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    match runtime.block_on(execute(&args)) {
        Ok(()) => process::exit(0),
        Err(error) => {
            // Nothing has reached stdout at this point
            eprintln!("{} {:#}", "Error:".bright_red().bold(), error);
            process::exit(1);
        }
    }
}

async fn execute(args: &Args) -> anyhow::Result<()> {
    let config = args.to_config().context("Invalid arguments")?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    let stats = racecourse_join::run(&config, &mut handle)
        .await
        .with_context(|| {
            format!(
                "Failed to join {} with {}",
                config.races_path.display(),
                config.coords_path.display()
            )
        })?;

    if !args.quiet {
        print_summary(&stats, &config);
    }
    Ok(())
}
