mod config;
mod engine;
mod http;
mod logger;
mod signal;
mod state;
mod store;

pub use config::Config;
pub use state::State;

use std::fmt::Display;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use hyper::StatusCode;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to the config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match Config::from_file(&args.config).await {
        Ok(config) => config,
        Err(err) => {
            eprintln!(
                "Failed to load config file {}: {}, using defaults",
                args.config.display(),
                err
            );

            Config::default()
        }
    }
    .with_environment();

    logger::init(config.loglevel);

    log::info!(
        "Starting server on {} using the {:?} store",
        config.bind,
        config.database.driver
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    let state = match State::new(config, shutdown_rx).await {
        Ok(state) => state,
        Err(err) => {
            log::error!("Failed to initialize: {}", err);
            process::exit(1);
        }
    };

    tokio::task::spawn(signal::shutdown_on_signal(shutdown_tx));

    if let Err(err) = http::bind(state.config.bind, state.clone()).await {
        log::error!("Failed to run http server: {}", err);
        process::exit(1);
    }

    log::info!("Server stopped");
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] engine::Error),
    #[error(transparent)]
    Store(#[from] store::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    StatusCodeError(#[from] StatusCodeError),
}

/// An error that is returned to the client with the given status code.
#[derive(Clone, Debug, Error)]
#[error("{code}: {message}")]
pub struct StatusCodeError {
    pub code: StatusCode,
    pub message: String,
}

impl StatusCodeError {
    pub fn new<T>(code: StatusCode, message: T) -> Self
    where
        T: Display,
    {
        Self {
            code,
            message: message.to_string(),
        }
    }

    /// Replaces the message of the error.
    pub fn message<T>(mut self, message: T) -> Self
    where
        T: Display,
    {
        self.message = message.to_string();
        self
    }

    fn from_code(code: StatusCode) -> Self {
        Self::new(code, code.canonical_reason().unwrap_or("Unknown Error"))
    }

    /// 400 Bad Request
    pub fn bad_request() -> Self {
        Self::from_code(StatusCode::BAD_REQUEST)
    }

    /// 404 Not Found
    pub fn not_found() -> Self {
        Self::from_code(StatusCode::NOT_FOUND)
    }

    /// 405 Method Not Allowed
    pub fn method_not_allowed() -> Self {
        Self::from_code(StatusCode::METHOD_NOT_ALLOWED)
    }

    /// 408 Request Timeout
    pub fn request_timeout() -> Self {
        Self::from_code(StatusCode::REQUEST_TIMEOUT)
    }

    /// 411 Length Required
    pub fn length_required() -> Self {
        Self::from_code(StatusCode::LENGTH_REQUIRED)
    }

    /// 413 Payload Too Large
    pub fn payload_too_large() -> Self {
        Self::from_code(StatusCode::PAYLOAD_TOO_LARGE)
    }
}
