mod config;
mod output;
mod patreon;
mod tiers;
mod update;

use crate::config::Config;
use crate::patreon::auth::Credentials;
use clap::Parser;
use eyre::Report;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Refreshes the patron mention lists for the site.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML settings file; defaults apply when it doesn't exist.
    #[arg(long, env = "PATRON_TIERS_CONFIG", default_value = "patrons.toml")]
    config: PathBuf,

    /// Overrides the configured output directory.
    #[arg(long, env = "PATRON_TIERS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Report> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }

    tracing_subscriber::registry()
        .with(config.sentry.dsn.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("info,{}=debug,hyper_util=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _sentry = config.sentry.dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let credentials = Credentials::resolve(&config.credentials_file);
    update::update_patrons(&config, &credentials).await?;
    Ok(())
}
