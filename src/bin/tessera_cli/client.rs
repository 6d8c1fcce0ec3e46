#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::sync::Arc;

use thiserror::Error;

use tessera::config::{self, LoadError, Settings};
use tessera::query::QueryResult;
use tessera::telemetry::TelemetryError;
use tessera::{ApiError, ClientConfig, QueryClient};

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read token file: {0}")]
    TokenFile(std::io::Error),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("request failed: {0}")]
    Query(Arc<ApiError>),
    #[error("the server returned no data")]
    NoData,
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Settings from file, env and flags. A token file beats any other token
/// source.
pub fn load_settings(cli: &Cli) -> Result<Settings, CliError> {
    let mut settings = config::load(cli.config.as_deref(), &cli.overrides)?;
    if let Some(path) = &cli.token_file {
        let token = fs::read_to_string(path)
            .map_err(CliError::TokenFile)?
            .trim()
            .to_string();
        settings.api.token = (!token.is_empty()).then_some(token);
    }
    Ok(settings)
}

pub fn build_client(settings: &Settings) -> Result<QueryClient, CliError> {
    let config = ClientConfig::from_settings(settings)?;
    Ok(QueryClient::new(config)?)
}

/// The fetched value, or the error the query reported.
pub fn into_data<T>(result: QueryResult<T>) -> Result<T, CliError> {
    if let Some(err) = result.error {
        return Err(CliError::Query(err));
    }
    result.data.ok_or(CliError::NoData)
}
