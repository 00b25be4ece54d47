//! Configuration model: one general section plus a map of named sources,
//! each source binding a search index to one output sitemap file through a
//! declarative field map.

mod error;

pub use error::ConfigError;

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// General settings shared by every source.
    pub general: Option<GeneralConfig>,
    /// Named sources: index name -> sitemap configuration.
    #[serde(default)]
    pub sitemaps: HashMap<String, SitemapConfig>,
}

/// Settings shared by every source.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Public base URL the generated files are reachable under.
    pub base_url: String,
    /// Subdirectory of the store that holds per-source sitemap files.
    #[serde(default)]
    pub indexsitemap_path: String,
    /// File name of the sitemap-index (defaults to `sitemap`).
    pub file_name: Option<String>,
    /// Prefix prepended to every per-source file name.
    pub prefix: Option<String>,
    /// Stylesheet applied to rendered url-sets.
    pub stylesheet: Option<Stylesheet>,
    /// Optional static file server over the store directory.
    pub serve: Option<ServeConfig>,
    /// Connection settings for the search index.
    pub meilisearch: Option<MeiliConfig>,
}

/// Static file server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
    #[serde(default)]
    pub enable: bool,
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub listen: String,
}

/// MeiliSearch connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MeiliConfig {
    /// Host URL, e.g. `http://127.0.0.1:7700`.
    pub host: String,
    pub api_key: Option<String>,
}

/// One named source: a search index mapped to one sitemap file.
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapConfig {
    /// Must be set; a source with `sitemap: false` is a configuration error.
    #[serde(default)]
    pub sitemap: bool,
    /// Filter expression passed through to the search index.
    pub filter: Option<String>,
    /// Base address entry locations are composed under. A trailing `=`
    /// concatenates the slug directly instead of joining as a path segment.
    #[serde(default)]
    pub base_address: String,
    /// Gzip the rendered url-set.
    #[serde(default)]
    pub compress: bool,
    /// Output file name (defaults to the index name).
    pub sitemap_file_name: Option<String>,
    /// Periodic regeneration for indexes whose documents change.
    pub live_update: Option<LiveConfig>,
    /// Field map translating documents into sitemap concepts.
    pub field_map: Option<FieldMapConfig>,
}

/// Periodic regeneration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LiveConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Regeneration interval in seconds.
    pub interval: u64,
}

/// Path expressions mapping document fields to sitemap concepts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldMapConfig {
    /// Path of the field that uniquely identifies a document.
    #[serde(default)]
    pub unique_field: String,
    /// Path of the last-modified field; current time when unset or absent.
    pub lastmod: Option<String>,
    #[serde(default)]
    pub changefreq: ChangeFreq,
    #[serde(default)]
    pub priority: SitePriority,
    pub video: Option<VideoFieldMap>,
    pub image: Option<ImageFieldMap>,
    pub news: Option<NewsFieldMap>,
}

/// Field paths for `<video:video>` blocks. Every field is a path expression;
/// `thumbnail_loc` and `content_loc` additionally accept the templated
/// `key|prefix[|suffix]` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFieldMap {
    pub thumbnail_loc: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_loc: Option<String>,
    pub player_loc: Option<String>,
    pub player_auto_play: Option<String>,
    pub duration: Option<String>,
    pub expiration_date: Option<String>,
    pub rating: Option<String>,
    pub view_count: Option<String>,
    pub publication_date: Option<String>,
    pub family_friendly: Option<String>,
    #[serde(rename = "relationship")]
    pub restriction_relationship: Option<String>,
    pub restriction: Option<String>,
    pub requires_subscription: Option<String>,
    pub live: Option<String>,
}

/// Field paths for `<image:image>` blocks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageFieldMap {
    pub loc: Option<String>,
    pub caption: Option<String>,
    pub title: Option<String>,
    pub license: Option<String>,
    pub geo_location: Option<String>,
}

/// Field paths for `<news:news>` blocks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsFieldMap {
    pub publication: Option<NewsPublicationFieldMap>,
    pub pub_date: Option<String>,
    pub title: Option<String>,
    pub keywords: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsPublicationFieldMap {
    pub name: Option<String>,
    pub language: Option<String>,
}

/// Change frequency hint emitted per entry. Unrecognized configured values
/// fall back to `daily`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum ChangeFreq {
    Always,
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl From<String> for ChangeFreq {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "always" => Self::Always,
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            "never" => Self::Never,
            _ => Self::default(),
        }
    }
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

/// Entry priority expressed as a coarse level; rendered as a fixed numeric
/// rate. Unrecognized configured values fall back to `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum SitePriority {
    Low,
    Medium,
    #[default]
    High,
    Highest,
}

impl From<String> for SitePriority {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "highest" => Self::Highest,
            _ => Self::default(),
        }
    }
}

impl SitePriority {
    /// Numeric rate written to the `<priority>` element.
    pub fn rate(&self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Medium => 0.5,
            Self::High => 0.8,
            Self::Highest => 1.0,
        }
    }
}

/// Named stylesheet applied to rendered url-sets. Unrecognized names fall
/// back to `style1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum Stylesheet {
    #[default]
    Style1,
    Style2,
}

impl From<String> for Stylesheet {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "style2" => Self::Style2,
            _ => Self::Style1,
        }
    }
}

impl Stylesheet {
    /// URL of the external XSL document referenced by the stylesheet
    /// processing instruction.
    pub fn link(&self) -> &'static str {
        match self {
            Self::Style1 => {
                "https://raw.githubusercontent.com/meilimap/meilimap/main/stylesheets/style1.xsl"
            }
            Self::Style2 => {
                "https://raw.githubusercontent.com/meilimap/meilimap/main/stylesheets/style2.xsl"
            }
        }
    }
}

impl Config {
    /// Load a configuration file. YAML and JSON are both accepted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// The general section, or the fatal error when it is missing.
    pub fn general(&self) -> Result<&GeneralConfig, ConfigError> {
        self.general.as_ref().ok_or(ConfigError::MissingGeneral)
    }

    /// Check the invariants the rest of the system relies on. Lenient enum
    /// values (changefreq, priority, stylesheet) are already normalized at
    /// parse time; everything here is a hard failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let general = self.general()?;

        if general.base_url.is_empty() || Url::parse(&general.base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl);
        }

        let meili = general
            .meilisearch
            .as_ref()
            .ok_or(ConfigError::MissingMeilisearch)?;
        if meili.host.is_empty() {
            return Err(ConfigError::MissingMeilisearchHost);
        }

        for (name, sitemap) in &self.sitemaps {
            validate_sitemap(name, sitemap)?;
        }

        Ok(())
    }
}

fn validate_sitemap(name: &str, sitemap: &SitemapConfig) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyIndexName);
    }

    if !sitemap.sitemap {
        return Err(ConfigError::SitemapDisabled(name.to_string()));
    }

    if sitemap.base_address.is_empty() {
        return Err(ConfigError::MissingBaseAddress(name.to_string()));
    }

    let field_map = sitemap
        .field_map
        .as_ref()
        .ok_or_else(|| ConfigError::MissingFieldMap(name.to_string()))?;

    if field_map.unique_field.is_empty() {
        return Err(ConfigError::MissingUniqueField(name.to_string()));
    }

    Ok(())
}
