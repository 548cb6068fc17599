use anyhow::Result;
use batch_convert::{cli::Cli, run};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
