use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use mixfeed::{Config, SqlitePostSource};

#[derive(Parser, Debug)]
struct Args {
    /// SQLite database to serve from. Overrides `MIXFEED_DATABASE`
    #[arg(long)]
    database: Option<String>,

    /// Address to bind to, e.g. 0.0.0.0:3030. Overrides `MIXFEED_ADDRESS`
    #[arg(long)]
    address: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load_env_config()?;
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Some(address) = args.address {
        config.address = address;
    }

    let source = SqlitePostSource::open(&config.database)?;
    source.initialize_db().await?;

    mixfeed::serve(source, config).await;
    Ok(())
}
