use anyhow::Result;
use clap::Parser;
use weather_outlook::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    weather_outlook::init_tracing();
    let cli = Cli::parse();
    weather_outlook::run(cli).await
}
