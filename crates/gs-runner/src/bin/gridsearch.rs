use clap::Parser;
use gs_runner::{init_logging, run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let report = run(&cli)?;
    println!("{}", report.summary());
    for failure in &report.rendering_failures {
        println!("  not run   [{}] {}: {}", failure.job_number, failure.point, failure.reason);
    }
    for result in report.results_in_grid_order() {
        if let gs_sweep::JobOutcome::Failed { reason } = &result.outcome {
            println!("  failed    [{}] {}: {}", result.job_number, result.point, reason);
        }
    }

    if cli.fail_on_error && !report.is_clean() {
        std::process::exit(1);
    }
    Ok(())
}
