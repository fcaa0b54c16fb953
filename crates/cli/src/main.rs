use clap::Parser;
use porelay_cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli).await);
}
