mod commands;
mod dataset;
mod logging;
mod settings;

use anyhow::Context;
use clap::Parser;
use rail_locator_lib::{Dataset, Locator};
use settings::Settings;

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();

    logging::setup_logging();
    logging::log_version_info();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    rt.block_on(run(settings))
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut dataset = match &settings.dataset {
        Some(path) => dataset::load(path)?,
        None => {
            tracing::warn!("No dataset given, starting with an empty network");
            Dataset::default()
        }
    };
    settings.apply_to(&mut dataset.config);
    tracing::debug!("Effective configuration: {:?}", dataset.config);

    let locator = Locator::from_dataset(dataset).context("Invalid dataset")?;
    let output = commands::run(&settings.command, &locator).await?;

    let text = if settings.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", text);

    Ok(())
}
