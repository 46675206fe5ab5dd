//! antenna - YouTube and Vimeo embed code from the command line
//!
//! Looks up a video's oEmbed data (through the disk cache) and prints either
//! the embed HTML or the full set of template variables.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use antenna::cli::{Cli, OutputMode, StartupConfig};
use antenna::data::OembedClient;

/// Sets up stderr logging, honouring `RUST_LOG` when it is set
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("antenna={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = StartupConfig::from_cli(&cli)?;
    tracing::debug!(cache_dir = %config.cache.cache_dir().display(), "starting lookup");

    let client = OembedClient::new(config.cache.clone())?;

    match config.output {
        OutputMode::Single => {
            if let Some(html) = client.resolve_embed(&config.video_url, &config.params).await {
                println!("{}", html);
            }
        }
        OutputMode::Pair => {
            let metadata = client.resolve(&config.video_url, &config.params).await;
            for (name, value) in metadata.template_vars().pairs() {
                println!("{}={}", name, value.unwrap_or_default());
            }
        }
        OutputMode::Json => {
            let metadata = client.resolve(&config.video_url, &config.params).await;
            println!("{}", serde_json::to_string_pretty(&metadata.template_vars())?);
        }
    }

    Ok(())
}
