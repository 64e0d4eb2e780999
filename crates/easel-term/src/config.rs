use std::path::PathBuf;

use anyhow::{Context, Result};
use easel::{BridgeBuilder, BridgeConfig, RefreshTimer};

pub const ENV_LOG: &str = "EASEL_LOG";
pub const ENV_REFRESH_HZ: &str = "EASEL_REFRESH_HZ";
pub const ENV_SEED: &str = "EASEL_SEED";
pub const ENV_CACHE_DIR: &str = "EASEL_CACHE_DIR";
pub const ENV_MAX_MEMORY: &str = "EASEL_MAX_MEMORY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub guest: PathBuf,
    pub refresh_hz: u32,
    pub seed: Option<u64>,
    pub cache: Option<PathBuf>,
    pub max_memory: usize,
    /// Diagnostics go here; the terminal itself is the display.
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let guest = std::env::args_os()
            .nth(1)
            .map(PathBuf::from)
            .context("usage: easel-term <guest.wasm>")?;
        Self::resolve(guest, |name| std::env::var(name).ok())
    }

    fn resolve(guest: PathBuf, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            guest,
            refresh_hz: parse_var(&var, ENV_REFRESH_HZ)?.unwrap_or(RefreshTimer::DEFAULT_RATE_HZ),
            seed: parse_var(&var, ENV_SEED)?,
            cache: var(ENV_CACHE_DIR)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            max_memory: parse_var(&var, ENV_MAX_MEMORY)?
                .unwrap_or(BridgeConfig::DEFAULT_MAX_MEMORY),
            log_file: var(ENV_LOG)
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn builder(&self) -> BridgeBuilder {
        BridgeBuilder::new().config(BridgeConfig {
            max_memory: self.max_memory,
            random_seed: self.seed,
            cache: self.cache.clone(),
            ..BridgeConfig::default()
        })
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid {name}: {value:?}"))
        })
        .transpose()
}
