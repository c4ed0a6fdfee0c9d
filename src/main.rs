// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, gather settings, build the client
//   and hand it to the UI loop.

use anyhow::Context;
use ghrepo_cli::{api::ContentsClient, config::EnvSettings, ui};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with menu output.
    // `RUST_LOG=ghrepo_cli=debug` shows every request.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = ui::collect_settings(EnvSettings::from_env())?;
    let api = ContentsClient::new(&settings).context("Failed to build HTTP client")?;

    // Blocks until the user exits.
    ui::main_menu(&api, &settings.credentials)?;
    Ok(())
}
