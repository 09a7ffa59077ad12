use clap::Parser;
use kline_exporter::app;
use kline_exporter::cli::{Args, RunRequest};
use kline_exporter::utils::config::AppConfig;
use kline_exporter::KlineError;
use log::{error, info};
use std::io;
use std::process;

#[tokio::main]
async fn main() {
    // 1. Load .env and layered config before logging so log_level applies
    dotenv::dotenv().ok();
    let config: AppConfig = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    // 2. Initialize Logger, RUST_LOG still wins when set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let args: Args = Args::parse();

    // 3. Ctrl-C at any point exits cleanly
    tokio::select! {
        result = run(args, config) => {
            if let Err(e) = result {
                error!("{}", e);
                process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, exiting");
            process::exit(0);
        }
    }
}

async fn run(args: Args, config: AppConfig) -> Result<(), KlineError> {
    // Prompts block on stdin, keep them off the runtime so Ctrl-C is still observed
    let prompt_config: AppConfig = config.clone();
    let request: RunRequest = tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        args.resolve(&prompt_config, &mut input, &mut output)
    })
    .await
    .map_err(|e| KlineError::Input(e.to_string()))?
    .map_err(|e| KlineError::Input(e.to_string()))?;

    let outcome = app::run(&request, &config).await?;

    info!("Data written to {}", outcome.export_path.display());
    if let Some(chart_path) = outcome.chart_path {
        info!("Chart written to {}", chart_path.display());
    }
    Ok(())
}
