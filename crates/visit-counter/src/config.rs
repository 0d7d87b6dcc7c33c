//! Counter configuration.
//!
//! The same fields are read from the environment by the hosted function and
//! from flags (falling back to the environment) by the command line.
use aws_config::SdkConfig;
use clap::ValueEnum;

use crate::{DynamoStore, Error, Result};

pub const DEFAULT_TABLE_NAME: &str = "visit-count-table";
pub const TABLE_NAME_VAR: &str = "VISIT_COUNT_TABLE";
pub const ENDPOINT_VAR: &str = "DYNAMODB_ENDPOINT";
pub const STRATEGY_VAR: &str = "VISIT_COUNT_STRATEGY";

/// How an increment reaches the store.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    /// Read the count, then unconditionally write `count + 1`.
    ///
    /// Two overlapping invocations for the same user may both read the same
    /// count, and one increment is lost.
    #[default]
    ReadThenWrite,
    /// Let the store add one in a single request.
    Atomic,
}

impl core::fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UpdateStrategy::ReadThenWrite => "read-then-write",
            UpdateStrategy::Atomic => "atomic",
        })
    }
}

#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct Config {
    /// Name of the visit-count table.
    #[arg(long, env = TABLE_NAME_VAR, default_value = DEFAULT_TABLE_NAME)]
    pub table_name: String,

    /// DynamoDB endpoint override, eg. `http://localhost:8000` for DynamoDB Local.
    #[arg(long, env = ENDPOINT_VAR)]
    pub endpoint_url: Option<String>,

    /// How increments are written.
    #[arg(
        long,
        env = STRATEGY_VAR,
        value_enum,
        ignore_case = true,
        default_value_t = UpdateStrategy::ReadThenWrite
    )]
    pub strategy: UpdateStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            table_name: DEFAULT_TABLE_NAME.to_owned(),
            endpoint_url: None,
            strategy: UpdateStrategy::default(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, unset or empty variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Config::default();
        if let Some(table_name) = var(TABLE_NAME_VAR) {
            config.table_name = table_name;
        }
        config.endpoint_url = var(ENDPOINT_VAR);
        if let Some(strategy) = var(STRATEGY_VAR) {
            config.strategy = UpdateStrategy::from_str(strategy.trim(), true).map_err(|_| {
                Error::Config {
                    msg: format!(
                        "{STRATEGY_VAR} must be 'read-then-write' or 'atomic', found {strategy:?}"
                    ),
                }
            })?;
        }
        log::debug!("loaded config {config:?}");
        Ok(config)
    }

    /// Loads the AWS configuration, honoring the endpoint override.
    pub async fn sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint_url) = &self.endpoint_url {
            log::info!("using DynamoDB endpoint {endpoint_url}");
            loader = loader.endpoint_url(endpoint_url);
        }
        loader.load().await
    }

    /// Builds the DynamoDB store this configuration points at.
    pub async fn dynamo_store(&self) -> DynamoStore {
        DynamoStore::from_sdk_config(&self.sdk_config().await, &self.table_name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(Config::default(), config);
        assert_eq!("visit-count-table", config.table_name);
        assert_eq!(UpdateStrategy::ReadThenWrite, config.strategy);
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("VISIT_COUNT_TABLE", "visits-dev"),
            ("DYNAMODB_ENDPOINT", "http://localhost:8000"),
            ("VISIT_COUNT_STRATEGY", "Atomic"),
        ]))
        .unwrap();
        assert_eq!(
            Config {
                table_name: "visits-dev".to_owned(),
                endpoint_url: Some("http://localhost:8000".to_owned()),
                strategy: UpdateStrategy::Atomic,
            },
            config
        );
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("VISIT_COUNT_TABLE", ""),
            ("DYNAMODB_ENDPOINT", "  "),
        ]))
        .unwrap();
        assert_eq!(Config::default(), config);
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let result = Config::from_lookup(lookup(&[("VISIT_COUNT_STRATEGY", "eventually")]));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn strategy_names() {
        for strategy in [UpdateStrategy::ReadThenWrite, UpdateStrategy::Atomic] {
            assert_eq!(
                strategy,
                UpdateStrategy::from_str(&strategy.to_string(), false).unwrap()
            );
        }
    }
}
