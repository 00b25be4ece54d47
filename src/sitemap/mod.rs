//! Canonical sitemap entry model and its XML rendering.
//!
//! An entry is built from one search-index document by [`builder`], using the
//! coercion rules in [`coerce`], and rendered into spec-compliant XML by
//! [`render`].

pub mod builder;
pub mod coerce;
pub mod render;

/// One `<url>` record in a rendered url-set.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlEntry {
    /// Location URL; unique within a batch.
    pub loc: String,
    /// Last-modified timestamp, `YYYY-MM-DDThh:mm:ss±hh:mm`.
    pub lastmod: String,
    pub changefreq: crate::config::ChangeFreq,
    /// Numeric priority rate, already formatted (`0.8`, `1`).
    pub priority: String,
    pub video: Option<Video>,
    pub image: Option<Image>,
    pub news: Option<News>,
}

/// A `<video:video>` extension block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Video {
    pub thumbnail_loc: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_loc: Option<String>,
    pub player_loc: Option<String>,
    /// Rendered as the `autoplay` attribute of `<video:player_loc>`,
    /// `ap=0` or `ap=1`.
    pub player_autoplay: Option<String>,
    pub duration: Option<String>,
    pub expiration_date: Option<String>,
    pub rating: Option<String>,
    pub view_count: Option<String>,
    pub publication_date: Option<String>,
    /// `yes` / `no`.
    pub family_friendly: Option<String>,
    pub restriction: Option<String>,
    /// Rendered as the `relationship` attribute of `<video:restriction>`.
    pub restriction_relationship: Option<String>,
    pub requires_subscription: Option<String>,
    /// `yes` / `no`.
    pub live: Option<String>,
}

/// An `<image:image>` extension block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub loc: String,
    pub caption: Option<String>,
    pub title: Option<String>,
    pub license: Option<String>,
    pub geo_location: Option<String>,
}

/// A `<news:news>` extension block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct News {
    pub publication: Option<NewsPublication>,
    pub pub_date: Option<String>,
    pub title: Option<String>,
    /// Keyword list already joined by `", "`.
    pub keywords: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewsPublication {
    pub name: Option<String>,
    pub language: Option<String>,
}

/// Which extension namespaces a source's field map configures. Namespaces
/// are declared per configuration, not per batch content, so an empty batch
/// still renders a schema-correct document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extensions {
    pub video: bool,
    pub image: bool,
    pub news: bool,
}

impl Extensions {
    pub fn from_field_map(fields: &crate::config::FieldMapConfig) -> Self {
        Self {
            video: fields.video.is_some(),
            image: fields.image.is_some(),
            news: fields.news.is_some(),
        }
    }
}

/// One `<sitemap>` record in the rendered sitemap-index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexFile {
    pub loc: String,
    /// Rebuild date, `YYYY-MM-DD`.
    pub lastmod: String,
}
