use std::env;
use std::io;
use std::net::SocketAddr;
use std::path::Path;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    match value.parse() {
                        Ok(value) => $config.$name = value,
                        Err(_) => eprintln!("Ignoring invalid value for {}: {:?}", $key, value),
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: Database,
    pub loglevel: LevelFilter,
    pub bind: SocketAddr,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    pub async fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        Ok(toml::from_slice(&buf)?)
    }

    /// Overrides all values which are set in the environment.
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "TOURNEY_LOGLEVEL", loglevel, "TOURNEY_BIND", bind);
        self.database = self.database.with_environment();
        self.engine = self.engine.with_environment();

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Database::default(),
            loglevel: LevelFilter::Info,
            bind: SocketAddr::new([0, 0, 0, 0].into(), 3000),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Mysql,
    /// Keep everything in memory. Nothing is persisted across restarts.
    Memory,
}

impl std::str::FromStr for Driver {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mysql" => Ok(Self::Mysql),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("driver")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub prefix: String,
}

impl Database {
    pub fn connect_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}?ssl-mode=DISABLED",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "TOURNEY_DB_DRIVER",
            driver,
            "TOURNEY_DB_HOST",
            host,
            "TOURNEY_DB_PORT",
            port,
            "TOURNEY_DB_USER",
            user,
            "TOURNEY_DB_PASSWORD",
            password,
            "TOURNEY_DB_DATABASE",
            database,
            "TOURNEY_DB_PREFIX",
            prefix,
        );

        self
    }
}

impl Default for Database {
    fn default() -> Self {
        Self {
            driver: Driver::Memory,
            host: String::from("localhost"),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: String::from("tourney"),
            prefix: String::new(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The preferred number of entrants per group when a group stage item doesn't specify a
    /// group count.
    pub group_size: usize,
    /// The maximum time to wait for the lock of a stage item.
    pub lock_timeout_ms: u64,
}

impl EngineConfig {
    pub fn with_environment(mut self) -> Self {
        from_environment!(
            self,
            "TOURNEY_ENGINE_GROUP_SIZE",
            group_size,
            "TOURNEY_ENGINE_LOCK_TIMEOUT_MS",
            lock_timeout_ms,
        );

        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            group_size: tourney_core::DEFAULT_GROUP_SIZE,
            lock_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for config field: {0}")]
    InvalidValue(&'static str),
}
