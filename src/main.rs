// Entrypoint for the CLI application.
// - Keeps `main` small: load the configuration, build the prediction
//   client and hand both to the UI flow.
// - Returns `anyhow::Result` so any fault ends the run with a report.

use gvision_cli::{api::PredictionClient, config::Config, ui::run};
use log::info;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout only carries the prediction responses.
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    // Key and endpoint come from the config file and/or `PREDICTION_KEY`
    // and `PREDICTION_ENDPOINT_URL`. See `config::Config::from_env`.
    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let api = PredictionClient::new(&config)?;

    // Prompt for the directory and upload every file in it, one at a time.
    run(&api, &config)?;
    Ok(())
}
