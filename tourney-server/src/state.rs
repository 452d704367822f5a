use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolOptions;
use sqlx::MySqlPool;
use tokio::sync::watch;

use crate::config::Driver;
use crate::engine::Engine;
use crate::store::{MemoryStore, MySqlStore};
use crate::{Config, Error};

#[derive(Clone, Debug)]
pub struct State(Arc<StateInner>);

impl State {
    /// Creates the engine with the store selected in `config`. For MySQL all missing tables are
    /// created.
    pub async fn new(config: Config, shutdown_rx: watch::Receiver<()>) -> Result<Self, Error> {
        let engine = match config.database.driver {
            Driver::Mysql => {
                let pool: MySqlPool = PoolOptions::new()
                    .max_connections(8)
                    .max_lifetime(Duration::new(3600, 0))
                    .idle_timeout(Duration::new(60, 0))
                    .connect_lazy(&config.database.connect_string())?;

                let store = MySqlStore::new(pool, config.database.prefix.clone());
                store.migrate().await?;

                Engine::new(store, &config.engine)
            }
            Driver::Memory => {
                log::warn!("Using the in-memory store, no data will be persisted");

                Engine::new(MemoryStore::new(), &config.engine)
            }
        };

        Ok(Self::from_parts(config, engine, shutdown_rx))
    }

    pub fn from_parts(config: Config, engine: Engine, shutdown_rx: watch::Receiver<()>) -> Self {
        Self(Arc::new(StateInner {
            engine,
            config,
            shutdown_rx,
        }))
    }
}

impl Deref for State {
    type Target = StateInner;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct StateInner {
    pub engine: Engine,
    pub config: Config,
    pub shutdown_rx: watch::Receiver<()>,
}
