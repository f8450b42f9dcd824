use clap::Parser;
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use rtxconfig::factory::{ConfigFactory, LoadOptions};
use rtxconfig::names::DuplicatePolicy;
use std::fs;
use std::path::PathBuf;

/// Load a real-time network monitoring configuration and report what was built
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Fail if any entity, link or binding was skipped
    #[arg(long)]
    strict: bool,

    /// Keep the first declaration of a duplicated name instead of the last
    #[arg(long)]
    reject_duplicates: bool,

    /// Write the load summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Args {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            duplicates: if self.reject_duplicates {
                DuplicatePolicy::Reject
            } else {
                DuplicatePolicy::LastWins
            },
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Configuration file: {:?}", args.config);

    let loaded = ConfigFactory::new()
        .with_options(args.load_options())
        .load(&args.config)
        .wrap_err_with(|| format!("Failed to load configuration '{}'", args.config.display()))?;

    let summary = loaded.summary();
    println!("records:    {}", loaded.records.len());
    println!("clocks:     {}", loaded.clocks.len());
    println!("timeseries: {}", loaded.series.len());
    println!(
        "links:      {} attached, {} skipped",
        loaded.link_report.attached, loaded.link_report.skipped
    );
    match loaded.model() {
        Some(model) => println!(
            "model:      {} element(s), {} zone(s)",
            model.elements().len(),
            model.zones().len()
        ),
        None => println!("model:      none"),
    }
    println!(
        "bindings:   {} bound, {} skipped",
        loaded.bind_report.bound, loaded.bind_report.skipped
    );
    println!(
        "problems:   {} skipped entity(ies), {} unresolved reference(s), {} rejected link(s), {} duplicate name(s), {} warning(s)",
        summary.skipped_entities,
        summary.unresolved_references,
        summary.rejected_links,
        summary.duplicate_names,
        summary.warnings
    );

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&loaded.report()).wrap_err("Failed to serialize load summary")?;
        fs::write(path, json).wrap_err_with(|| format!("Failed to write summary to '{}'", path.display()))?;
        info!("Wrote load summary to {:?}", path);
    }

    if args.strict && !summary.is_clean() {
        bail!(
            "Strict mode: {} entity(ies), {} reference(s), {} link(s) and {} binding(s) were skipped",
            summary.skipped_entities,
            summary.unresolved_references,
            summary.rejected_links,
            summary.skipped_bindings
        );
    }

    info!("Configuration loaded successfully");
    Ok(())
}
