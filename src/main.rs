use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use caption_harvester::cli::{Cli, Commands};
use caption_harvester::config::Config;
use caption_harvester::harvest::{CaptionFetcher, Harvester};
use caption_harvester::{Authenticator, HarvesterError, YoutubeClient};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "caption_harvester=debug"
    } else {
        "caption_harvester=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Commands::Config { init: true, .. } = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => Config::config_path()?,
        };
        if path.exists() {
            return Err(HarvesterError::ConfigError(format!(
                "{} already exists, refusing to overwrite it",
                path.display()
            ))
            .into());
        }
        Config::default().save(&path).await?;
        println!("Default configuration written to: {}", path.display());
        return Ok(());
    }

    let mut config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Fetch { output_dir, format } => {
            if let Some(dir) = output_dir {
                config.output.directory = dir;
            }
            if let Some(format) = format {
                config.output.format = format;
            }

            let credential = Authenticator::new(config.oauth.clone())?
                .authenticate()
                .await?;
            let client = YoutubeClient::new(&config.api, credential);
            let fetcher =
                CaptionFetcher::new(config.output.directory.clone(), config.output.format);

            let summary = Harvester::new(client, fetcher, config.api.page_size)
                .with_progress(!cli.quiet)
                .run()
                .await?;

            println!(
                "Processed {} videos: {} caption files saved to {}, {} without captions",
                summary.videos,
                summary.saved,
                config.output.directory.display(),
                summary.without_captions
            );
        }
        Commands::Auth => {
            let credential = Authenticator::new(config.oauth.clone())?
                .authenticate()
                .await?;
            println!("Authorized. Token stored in: {}", credential.store().path().display());
        }
        Commands::Config { .. } => {
            config.display();
        }
    }

    Ok(())
}
