use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

pub const DEFAULT_OMDB_BASE: &str = "https://www.omdbapi.com";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ADDR: &str = "0.0.0.0:3146";

#[derive(Debug, Clone)]
pub struct Config {
    pub omdb_api_key: String,
    pub omdb_base_url: String,
    pub data_dir: PathBuf,
    pub listen_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let omdb_api_key = get("OMDB_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("Missing required environment variable: OMDB_API_KEY"))?;
        let omdb_base_url = get("OMDB_BASE_URL").unwrap_or_else(|| DEFAULT_OMDB_BASE.to_string());
        let data_dir = get("CINESEARCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let addr_raw = get("CINESEARCH_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let listen_addr = addr_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("CINESEARCH_ADDR is not a socket address: {}", addr_raw))?;

        info!(
            omdb = %omdb_base_url,
            data_dir = %data_dir.display(),
            addr = %listen_addr,
            "Configuration loaded"
        );
        Ok(Self {
            omdb_api_key,
            omdb_base_url,
            data_dir,
            listen_addr,
        })
    }
}
