mod cli;
mod clinical;
mod config;
mod error;
mod gemini;
mod geo;
mod overpass;
mod providers;
mod server;
mod users;

use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = cli::Args::parse();
    server::run(args).await.context("serve failed")
}
