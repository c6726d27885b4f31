use std::{error::Error, path::PathBuf, process};

use clap::Parser;
use log::info;
use rime::{DatabaseServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file with a `server` section
    config: PathBuf,
    /// Write a default config to `config` and exit
    #[arg(long)]
    write_default: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    if cli.write_default {
        ServerConfig::default().save(&cli.config)?;
        return Ok(());
    }

    let config = ServerConfig::load(&cli.config)?;
    let server = DatabaseServer::bind(&config)?;

    ctrlc::set_handler(|| {
        info!("interrupted, shutting down");
        process::exit(0);
    })?;

    server.listen()?;
    Ok(())
}
