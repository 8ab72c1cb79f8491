use std::error::Error;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use trial_indexer::{Dependencies, IndexingError, LogFormat, Settings};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let settings = Settings::parse();
    init_tracing(settings.log_format);

    if let Err(e) = run(&settings).await {
        error!(error = %e, "Indexing failed");
        eprintln!("Error: {}", e);

        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {}", err);
            source = err.source();
        }

        std::process::exit(1);
    }
}

async fn run(settings: &Settings) -> Result<(), IndexingError> {
    let mut dependencies = Dependencies::new(settings).await?;
    let summary = dependencies.orchestrator.run().await?;

    info!(summary = %summary, "Done");
    println!("{}", summary);
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
