use std::{error::Error, io, path::PathBuf};

use clap::Parser;
use rime::{Client, ClientConfig, ClientExit};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file with a `client` section
    config: PathBuf,
    /// Write a default config to `config` and exit
    #[arg(long)]
    write_default: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize env_logger; For logging to STDERR
    env_logger::init();

    let cli = Cli::parse();
    if cli.write_default {
        ClientConfig::default().save(&cli.config)?;
        return Ok(());
    }

    let config = ClientConfig::load(&cli.config)?;
    let client = Client::new(config);

    match client.run(io::stdin().lock(), io::stdout().lock())? {
        ClientExit::Exited | ClientExit::InputClosed => Ok(()),
        ClientExit::Rejected => Err("server is at capacity".into()),
        ClientExit::RetriesExhausted => Err("could not reach server".into()),
    }
}
