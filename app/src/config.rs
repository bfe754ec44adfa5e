use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;
use serde::{Deserialize, Serialize};

use infra::persistence::{DocumentConnectionManager, SledConnectionManager};

/// Prefix for environment variables that override the file, eg:
/// `CANTEENS_DATABASE_URL`.
pub const ENV_PREFIX: &str = "CANTEENS_";

#[derive(Deserialize, Debug)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub env_logger: EnvLogger,
    #[serde(default)]
    pub listener: Listener,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DbConfig {
    Sled(SledConfig),
    Postgres(PostgresConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SledConfig {
    pub path: PathBuf,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub addr: SocketAddr,
}

#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
struct Overrides {
    database_url: Option<String>,
    listen_addr: Option<SocketAddr>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    modules: HashMap<String, LogLevel>,
    timestamp_nanos: bool,
}

impl Config {
    /// Reads the TOML file at `path`, then applies `CANTEENS_*` overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let buf = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let mut config = Self::parse(&buf)?;
        let overrides = envy::prefixed(ENV_PREFIX)
            .from_env::<Overrides>()
            .context("environment overrides")?;
        config.apply(overrides);
        Ok(config)
    }

    pub fn parse(toml: &str) -> Result<Self> {
        let config = toml::from_str(toml).context("parse config")?;
        Ok(config)
    }

    fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.database_url {
            debug!("Database from environment");
            self.db = DbConfig::Postgres(PostgresConfig { url });
        }
        if let Some(addr) = overrides.listen_addr {
            debug!("Listen address from environment: {}", addr);
            self.listener.addr = addr;
        }
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl SledConfig {
    pub fn build(&self) -> Result<Pool<SledConnectionManager>> {
        debug!("Build pool from {:?}", self);

        let manager = SledConnectionManager::open(&self.path)?;

        let builder = r2d2::Pool::builder();

        debug!("Pool builder: {:?}", builder);
        let pool = builder.build(manager).context("build pool")?;

        Ok(pool)
    }
}

impl PostgresConfig {
    pub fn build(&self) -> Result<Pool<DocumentConnectionManager>> {
        debug!("Build postgres pool");

        let manager = DocumentConnectionManager::from_url(&self.url)?;
        let pool = r2d2::Pool::builder()
            .build(manager)
            .context("build pool")?;

        Ok(pool)
    }
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(&module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}
