use clap::Parser;
use energy_influx::config::env_file;
use energy_influx::core::collector::Collector;
use energy_influx::core::scheduler::Scheduler;
use energy_influx::core::shutdown::shutdown_channel;
use energy_influx::domain::model::CollectOutcome;
use energy_influx::utils::{logger, validation::Validate};
use energy_influx::{CliConfig, CollectorConfig, CollectorError, DataType, SystemClock};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    if args.log_json {
        logger::init_service_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting energy-influx");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(&args).await {
        tracing::error!(
            "energy-influx failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(args: &CliConfig) -> Result<(), CollectorError> {
    env_file::load_env_file(&args.env_file)?;

    let config = CollectorConfig::load_or_default(&args.config)?;
    config.validate()?;
    tracing::info!("Configuration loaded and validated ({} jobs)", config.jobs.len());

    if args.dry_run {
        display_schedule(&config)?;
        return Ok(());
    }

    let one_off = args.one_off_request()?;
    let registry = config.build_registry_for(one_off.as_slice())?;
    let collector = Collector::new(registry, config.build_writer()?, SystemClock)
        .with_verbose(args.verbose)
        .with_max_lag(config.max_lag()?);

    if let Some(request) = one_off {
        tracing::info!("One-off fetch of {}", request);
        if let CollectOutcome::Empty = collector.collect(&request).await? {
            tracing::warn!("Nothing was written for {}", request);
        }
        return Ok(());
    }

    let mut scheduler = Scheduler::new(collector, SystemClock)
        .with_cancel_on_failure(config.cancel_on_failure())
        .with_tick(config.tick());
    for spec in config.job_specs()? {
        scheduler.add(spec);
    }

    // Initial run on startup
    let summary = scheduler.run_all().await;
    tracing::info!(
        "Initial run: {} jobs, {} written, {} empty, {} failed",
        summary.ran,
        summary.written,
        summary.empty,
        summary.failed
    );

    if args.once {
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received. Exiting gracefully..."),
            Err(e) => tracing::error!("Could not listen for Ctrl+C: {}", e),
        }
        shutdown_tx.shutdown();
    });

    scheduler.run_forever(shutdown_rx).await;
    Ok(())
}

fn display_schedule(config: &CollectorConfig) -> Result<(), CollectorError> {
    println!("📋 Schedule:");
    println!("  InfluxDB: {} (database '{}')", config.influx.url, config.influx.database);
    println!("  Parsers:  {}", config.parsers.endpoint);
    println!("  Cancel on failure: {}", config.cancel_on_failure());
    println!();

    for spec in config.job_specs()? {
        println!(
            "  every {:>8}  {:<20} -> {}",
            format!("{:?}", spec.every),
            spec.request.to_string(),
            spec.request.measurement()
        );
    }

    let registry = config.build_registry()?;
    println!();
    println!("🔌 Parsers ({}):", registry.len());
    for data_type in DataType::ALL {
        let zones = registry.zones(data_type);
        if zones.is_empty() {
            continue;
        }
        let zones: Vec<&str> = zones.iter().map(|zone| zone.as_str()).collect();
        println!("  {:<20} {}", data_type, zones.join(", "));
    }

    println!();
    println!("🔍 Dry run complete. Nothing was fetched.");
    Ok(())
}
