use anyhow::Context;
use clap::Parser;
use meshprep_cli::{init_logging, process_directory, Args, BatchConfig, BatchOutcome};
use meshprep_visualization::SoftwareRenderer;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level).context("failed to initialize logging")?;

    let config = BatchConfig::from(args);
    let mut renderer = SoftwareRenderer::new();

    let report = process_directory(&config, &mut renderer).with_context(|| {
        format!(
            "batch over {} into {} failed",
            config.input_dir.display(),
            config.output_dir.display()
        )
    })?;
    report.log_summary();

    if let BatchOutcome::SummaryFailed {
        summary_path,
        reason,
    } = &report.outcome
    {
        anyhow::bail!("failed to write {}: {}", summary_path.display(), reason);
    }
    Ok(())
}
