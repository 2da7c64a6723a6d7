use anyhow::Context;
use clap::Parser;
use ontology_extract::core::pipeline::PreparedExtraction;
use ontology_extract::core::{ConfigProvider, Pipeline};
use ontology_extract::utils::error::ErrorSeverity;
use ontology_extract::utils::{logger, validation::Validate};
use ontology_extract::{ExtractEngine, ExtractPipeline, LocalStorage, TomlConfig};
use std::path::Path;

#[derive(Parser)]
#[command(name = "toml-extract")]
#[command(about = "Extract an import module using a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "extract.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Resolve the import specification and report it without extracting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // The configured log level is only known once the file is read.
    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?;
    logger::init_logger(
        &logger::effective_level(args.verbose, config.log_level()),
        args.json_logs,
    );
    tracing::info!("Loaded configuration from: {}", args.config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    // Relative paths in the file resolve against the file's directory.
    let base = Path::new(&args.config)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let storage = LocalStorage::new(base);
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let pipeline = ExtractPipeline::new(storage, config);

    if args.dry_run {
        tracing::info!("Dry run: nothing will be written");
        let prepared = pipeline
            .extract()
            .await
            .context("Failed to resolve the import specification")?;
        perform_dry_run(&prepared);
        return Ok(());
    }

    let engine = ExtractEngine::new_with_monitoring(pipeline, monitor_enabled);
    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("Extraction completed successfully");
            println!("Module written to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "Extraction failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("{}", e.user_friendly_message());
            eprintln!("Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("Configuration Summary:");
    println!("  Database: {}", config.database());
    if let Some(imports) = config.imports_file() {
        println!("  Imports: {}", imports);
    }
    if !config.terms().is_empty() {
        println!("  Terms: {}", config.terms().join(", "));
    }
    if let Some(source) = config.source() {
        println!("  Source: {}", source);
    }
    println!("  Intermediates: {}", config.intermediates());
    println!(
        "  Output: {} ({})",
        config.output_path(),
        config.output_format()
    );
    if args.dry_run {
        println!("  DRY RUN MODE ENABLED");
    }
    println!();
}

fn perform_dry_run(prepared: &PreparedExtraction) {
    let plan = &prepared.plan;
    println!("Dry Run Analysis:");
    println!("  Statements loaded: {}", prepared.store.len());
    println!("  Import specs: {}", plan.specs.len());
    for spec in &plan.specs {
        let related: Vec<String> = spec.related.iter().map(|r| r.to_string()).collect();
        println!(
            "    {} [{}] intermediates={}{}",
            spec.id,
            related.join(" "),
            plan.intermediates_for(spec),
            spec.parent_id
                .as_deref()
                .map(|p| format!(" parent={}", p))
                .unwrap_or_default()
        );
    }
    if !plan.predicates.is_empty() {
        let predicates: Vec<&str> = plan.predicates.iter().map(String::as_str).collect();
        println!("  Predicates: {}", predicates.join(", "));
    }
    for (source, config) in &plan.sources {
        if !config.predicates.is_empty() {
            println!("  Predicates for {}: {}", source, config.predicates.join(", "));
        }
    }
    for (from, to) in &plan.copy_predicates {
        println!("  Copy: {} -> {}", from, to);
    }
    if let Some(iri) = &plan.imported_from {
        println!("  Imported from: {} ({})", iri, plan.imported_from_property);
    }
}
