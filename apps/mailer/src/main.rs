//! Mailer entry point

use clap::Parser;
use core_config::tracing::install_color_eyre;
use eyre::Result;
use mailer::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre first for colored error output
    install_color_eyre();

    mailer::run(Cli::parse()).await
}
