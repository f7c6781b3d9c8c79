use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use dotenv::dotenv;

pub const DEFAULT_DATABASE: &str = "feed.db";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:3030";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path of the SQLite database the feed is read from.
    pub database: String,
    pub address: SocketAddr,
    /// Page size used when a request carries no `limit`.
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DEFAULT_DATABASE.to_owned(),
            address: ([0, 0, 0, 0], 3030).into(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Loads a `.env` file when present, then reads the `MIXFEED_*` variables.
    ///
    /// - `MIXFEED_DATABASE`: database path, default `feed.db`
    /// - `MIXFEED_ADDRESS`: listen address, default `0.0.0.0:3030`
    /// - `MIXFEED_DEFAULT_PAGE_SIZE`: default `10`
    /// - `MIXFEED_MAX_PAGE_SIZE`: default `100`
    pub fn load_env_config() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            database: lookup("MIXFEED_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            address: parse_var(&lookup, "MIXFEED_ADDRESS", DEFAULT_ADDRESS)?,
            default_page_size: parse_var(
                &lookup,
                "MIXFEED_DEFAULT_PAGE_SIZE",
                &DEFAULT_PAGE_SIZE.to_string(),
            )?,
            max_page_size: parse_var(&lookup, "MIXFEED_MAX_PAGE_SIZE", &MAX_PAGE_SIZE.to_string())?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 || self.max_page_size == 0 {
            bail!("page sizes must be greater than zero");
        }
        if self.default_page_size > self.max_page_size {
            bail!(
                "default page size {} exceeds max page size {}",
                self.default_page_size,
                self.max_page_size
            );
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_owned());
    raw.parse()
        .with_context(|| format!("{key} has an invalid value: {raw:?}"))
}
