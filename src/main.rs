use anyhow::Context;
use clap::Parser;
use request_dispatcher::config::cli::{load_config, read_records, render_output};
use request_dispatcher::utils::logger;
use request_dispatcher::{CliConfig, Dispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting request-dispatcher ({:?})", cli.variant);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = load_config(&cli.config, cli.variant)
        .with_context(|| format!("failed to load config {}", cli.config))?;

    let dispatcher = match Dispatcher::new(config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let records = read_records(cli.input.as_deref()).context("failed to read input records")?;
    tracing::info!("📥 Read {} records", records.len());

    let outputs = dispatcher.dispatch(&records).await;
    for output in &outputs {
        println!("{}", render_output(output, cli.with_metadata)?);
    }

    Ok(())
}
