use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;

/// Process configuration, read from `PARLEY_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub page_limit_max: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let port = var("PARLEY_PORT", "3000")
            .parse()
            .context("PARLEY_PORT must be a port number")?;
        let page_limit_max: u32 = var("PARLEY_PAGE_LIMIT_MAX", "200")
            .parse()
            .context("PARLEY_PAGE_LIMIT_MAX must be a positive integer")?;
        anyhow::ensure!(page_limit_max > 0, "PARLEY_PAGE_LIMIT_MAX must be a positive integer");

        Ok(Self {
            db_path: PathBuf::from(var("PARLEY_DB_PATH", "parley.db")),
            host: var("PARLEY_HOST", "0.0.0.0"),
            port,
            page_limit_max,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
