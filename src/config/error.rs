//! Configuration error taxonomy.

use thiserror::Error;

/// Errors raised while loading or validating the configuration file.
///
/// All of these are fatal at startup: the process refuses to run with a
/// partial or contradictory configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("general config is missing")]
    MissingGeneral,

    #[error("invalid or missing base_url")]
    InvalidBaseUrl,

    #[error("meilisearch configuration is missing")]
    MissingMeilisearch,

    #[error("meilisearch host is required")]
    MissingMeilisearchHost,

    #[error("index name is empty")]
    EmptyIndexName,

    #[error("sitemap is not enabled for index {0}")]
    SitemapDisabled(String),

    #[error("base_address is required for index {0}")]
    MissingBaseAddress(String),

    #[error("invalid or missing field_map for index {0}")]
    MissingFieldMap(String),

    #[error("invalid or missing unique_field for index {0}")]
    MissingUniqueField(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
