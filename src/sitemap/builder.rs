//! Build canonical sitemap entries from search-index documents.
//!
//! Entry construction is document-scoped and best-effort: a document whose
//! unique field cannot be resolved is skipped with a log line, and a failing
//! video/image/news block is omitted with a warning while the entry itself
//! survives. The batch caller adds nothing beyond location deduplication.

use crate::config::{
    FieldMapConfig, ImageFieldMap, NewsFieldMap, VideoFieldMap,
};
use crate::document::Document;
use crate::sitemap::coerce::{
    bool_yes_no, bool_zero_one, datetime_value, format_scalar, present, resource_loc, slug,
    string_array, string_value, DATETIME_LAYOUT,
};
use crate::sitemap::{Image, News, NewsPublication, UrlEntry, Video};
use anyhow::{bail, Result};
use chrono::Local;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Build one entry from one document.
///
/// Errors are skip reasons for this document only; the caller logs them and
/// moves on to the next document.
pub fn build_entry(
    doc: &Document,
    base_address: &str,
    fields: &FieldMapConfig,
) -> Result<UrlEntry> {
    let Some(unique) = present(doc, &fields.unique_field) else {
        bail!("failed to resolve unique field {}", fields.unique_field);
    };

    let loc = match unique {
        Value::String(text) => {
            let slugged = slug(text);
            if slugged.is_empty() {
                bail!("empty slug for unique field {}", fields.unique_field);
            }
            join_location(base_address, &slugged)
        }
        Value::Number(n) => match n.as_i64() {
            Some(id) => join_location(base_address, &id.to_string()),
            None => bail!(
                "unsupported unique field {} type: {n}",
                fields.unique_field
            ),
        },
        other => bail!(
            "unsupported unique field {} type: {other:?}",
            fields.unique_field
        ),
    };

    let lastmod = match fields
        .lastmod
        .as_deref()
        .and_then(|path| present(doc, path))
    {
        Some(value) => datetime_value(value)?,
        None => Local::now().format(DATETIME_LAYOUT).to_string(),
    };

    let mut entry = UrlEntry {
        loc,
        lastmod,
        changefreq: fields.changefreq,
        priority: format!("{}", fields.priority.rate()),
        video: None,
        image: None,
        news: None,
    };

    // Extension blocks are best-effort: a failing block is dropped with a
    // warning, never the whole entry.
    let unique_text = format_scalar(unique);

    if let Some(image_fields) = &fields.image {
        match build_image(image_fields, doc) {
            Ok(image) => entry.image = Some(image),
            Err(err) => warn!(unique = %unique_text, %err, "failed to build image block"),
        }
    }

    if let Some(video_fields) = &fields.video {
        match build_video(video_fields, doc) {
            Ok(video) => entry.video = Some(video),
            Err(err) => warn!(unique = %unique_text, %err, "failed to build video block"),
        }
    }

    if let Some(news_fields) = &fields.news {
        match build_news(news_fields, doc) {
            Ok(news) => entry.news = Some(news),
            Err(err) => warn!(unique = %unique_text, %err, "failed to build news block"),
        }
    }

    Ok(entry)
}

/// Build entries for a whole document batch, applying the per-document skip
/// policy and deduplicating by location (first occurrence wins).
pub fn build_entries(
    docs: &[Document],
    source: &str,
    base_address: &str,
    fields: &FieldMapConfig,
) -> Vec<UrlEntry> {
    let mut entries = Vec::with_capacity(docs.len());
    let mut seen = HashSet::new();

    for doc in docs {
        match build_entry(doc, base_address, fields) {
            Ok(entry) => {
                if seen.insert(entry.loc.clone()) {
                    entries.push(entry);
                }
            }
            Err(err) => warn!(index = source, %err, "skipping document"),
        }
    }

    entries
}

/// Join a slug or id onto the base address. A base ending in `=`
/// concatenates directly; otherwise the slug joins as a path segment with
/// exactly one `/`.
fn join_location(base_address: &str, slug: &str) -> String {
    if base_address.ends_with('=') {
        format!("{base_address}{slug}")
    } else {
        format!("{}/{slug}", base_address.trim_end_matches('/'))
    }
}

fn build_image(fields: &ImageFieldMap, doc: &Document) -> Result<Image> {
    let Some(loc_expr) = fields.loc.as_deref() else {
        bail!("image loc is not mapped");
    };

    let mut image = Image {
        loc: resource_loc(loc_expr, doc)?,
        ..Image::default()
    };

    if let Some(expr) = fields.title.as_deref() {
        image.title = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.caption.as_deref() {
        image.caption = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.geo_location.as_deref() {
        image.geo_location = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.license.as_deref() {
        image.license = Some(string_value(expr, doc)?);
    }

    Ok(image)
}

fn build_video(fields: &VideoFieldMap, doc: &Document) -> Result<Video> {
    let mut video = Video::default();

    if let Some(expr) = fields.thumbnail_loc.as_deref() {
        video.thumbnail_loc = Some(resource_loc(expr, doc)?);
    }
    if let Some(expr) = fields.content_loc.as_deref() {
        video.content_loc = Some(resource_loc(expr, doc)?);
    }
    if let Some(expr) = fields.player_loc.as_deref() {
        video.player_loc = Some(string_value(expr, doc)?);
    }

    if let Some(path) = fields.player_auto_play.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        let flag = bool_zero_one(path, value)?;
        video.player_autoplay = Some(format!("ap={flag}"));
    }

    if let Some(expr) = fields.title.as_deref() {
        video.title = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.description.as_deref() {
        video.description = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.duration.as_deref() {
        video.duration = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.rating.as_deref() {
        video.rating = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.view_count.as_deref() {
        video.view_count = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.requires_subscription.as_deref() {
        video.requires_subscription = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.restriction.as_deref() {
        video.restriction = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.restriction_relationship.as_deref() {
        video.restriction_relationship = Some(string_value(expr, doc)?);
    }

    if let Some(path) = fields.expiration_date.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        video.expiration_date = Some(datetime_value(value)?);
    }
    if let Some(path) = fields.publication_date.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        video.publication_date = Some(datetime_value(value)?);
    }

    if let Some(path) = fields.family_friendly.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        video.family_friendly = Some(bool_yes_no(path, value)?.to_string());
    }
    if let Some(path) = fields.live.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        video.live = Some(bool_yes_no(path, value)?.to_string());
    }

    Ok(video)
}

fn build_news(fields: &NewsFieldMap, doc: &Document) -> Result<News> {
    let mut news = News::default();

    if let Some(expr) = fields.title.as_deref() {
        news.title = Some(string_value(expr, doc)?);
    }
    if let Some(expr) = fields.description.as_deref() {
        news.description = Some(string_value(expr, doc)?);
    }

    if let Some(path) = fields.pub_date.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        news.pub_date = Some(datetime_value(value)?);
    }

    if let Some(path) = fields.keywords.as_deref() {
        let Some(value) = present(doc, path) else {
            bail!("missing field for key: {path}");
        };
        news.keywords = Some(string_array(value)?);
    }

    if let Some(publication_fields) = &fields.publication {
        let mut publication = NewsPublication::default();
        if let Some(expr) = publication_fields.name.as_deref() {
            publication.name = Some(string_value(expr, doc)?);
        }
        if let Some(expr) = publication_fields.language.as_deref() {
            publication.language = Some(string_value(expr, doc)?);
        }
        news.publication = Some(publication);
    }

    Ok(news)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChangeFreq, SitePriority};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn minimal_fields(unique: &str) -> FieldMapConfig {
        FieldMapConfig {
            unique_field: unique.to_string(),
            ..FieldMapConfig::default()
        }
    }

    #[test]
    fn test_integer_unique_with_equals_base() {
        let fields = minimal_fields("id");
        let d = doc(json!({"id": 1}));

        let entry = build_entry(&d, "https://foobar.com/movies=", &fields).unwrap();
        assert_eq!(entry.loc, "https://foobar.com/movies=1");
    }

    #[test]
    fn test_integer_unique_with_path_base() {
        let fields = minimal_fields("id");
        let d = doc(json!({"id": 1}));

        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        assert_eq!(entry.loc, "https://foobar.com/movies/1");
    }

    #[test]
    fn test_string_unique_is_slugged() {
        let fields = minimal_fields("title");
        let d = doc(json!({"title": "Anatomy of a Fall"}));

        let entry = build_entry(&d, "https://foobar.com/movies/", &fields).unwrap();
        assert_eq!(entry.loc, "https://foobar.com/movies/anatomy-of-a-fall");
    }

    #[test]
    fn test_defaults_applied() {
        let fields = minimal_fields("id");
        let d = doc(json!({"id": 7}));

        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        assert_eq!(entry.changefreq, ChangeFreq::Daily);
        assert_eq!(entry.priority, "0.8");
        assert!(!entry.lastmod.is_empty());
    }

    #[test]
    fn test_priority_formatting() {
        let mut fields = minimal_fields("id");
        fields.priority = SitePriority::Highest;
        let d = doc(json!({"id": 7}));

        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        assert_eq!(entry.priority, "1");
    }

    #[test]
    fn test_lastmod_from_document() {
        let mut fields = minimal_fields("id");
        fields.lastmod = Some("updated_at".to_string());
        let d = doc(json!({"id": 7, "updated_at": "2024-03-01T10:30:00+02:00"}));

        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        assert_eq!(entry.lastmod, "2024-03-01T10:30:00+02:00");
    }

    #[test]
    fn test_skip_reasons() {
        let fields = minimal_fields("id");

        // Unique field absent.
        let d = doc(json!({"title": "x"}));
        assert!(build_entry(&d, "https://foobar.com", &fields).is_err());

        // Unsupported unique type.
        let d = doc(json!({"id": true}));
        assert!(build_entry(&d, "https://foobar.com", &fields).is_err());
        let d = doc(json!({"id": 1.5}));
        assert!(build_entry(&d, "https://foobar.com", &fields).is_err());

        // Empty slug.
        let fields = minimal_fields("title");
        let d = doc(json!({"title": "!!!"}));
        assert!(build_entry(&d, "https://foobar.com", &fields).is_err());
    }

    #[test]
    fn test_extension_failure_keeps_entry() {
        let mut fields = minimal_fields("id");
        fields.image = Some(ImageFieldMap {
            loc: Some("poster|https://cdn.foobar.com/posters".to_string()),
            ..ImageFieldMap::default()
        });

        // No poster field: the image block fails, the entry survives.
        let d = doc(json!({"id": 7}));
        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        assert!(entry.image.is_none());

        // With the field present the block materializes.
        let d = doc(json!({"id": 7, "poster": "p7.jpg"}));
        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        assert_eq!(
            entry.image.unwrap().loc,
            "https://cdn.foobar.com/posters/p7.jpg"
        );
    }

    #[test]
    fn test_video_block() {
        let mut fields = minimal_fields("id");
        fields.video = Some(VideoFieldMap {
            thumbnail_loc: Some("thumb|https://cdn.foobar.com/thumbs".to_string()),
            content_loc: Some("video_url".to_string()),
            title: Some("title".to_string()),
            player_loc: Some("player_url".to_string()),
            player_auto_play: Some("autoplay".to_string()),
            family_friendly: Some("family".to_string()),
            live: Some("is_live".to_string()),
            publication_date: Some("published_at".to_string()),
            view_count: Some("views".to_string()),
            ..VideoFieldMap::default()
        });

        let d = doc(json!({
            "id": 7,
            "thumb": "t7.jpg",
            "video_url": "https://cdn.foobar.com/videos/7.mp4",
            "title": "Trailer",
            "player_url": "https://foobar.com/player/7",
            "autoplay": true,
            "family": true,
            "is_live": false,
            "published_at": 1_700_000_000,
            "views": 420
        }));

        let entry = build_entry(&d, "https://foobar.com/movies", &fields).unwrap();
        let video = entry.video.unwrap();
        assert_eq!(
            video.thumbnail_loc.as_deref(),
            Some("https://cdn.foobar.com/thumbs/t7.jpg")
        );
        assert_eq!(video.player_autoplay.as_deref(), Some("ap=1"));
        assert_eq!(video.family_friendly.as_deref(), Some("yes"));
        assert_eq!(video.live.as_deref(), Some("no"));
        assert_eq!(
            video.publication_date.as_deref(),
            Some("2023-11-14T22:13:20+00:00")
        );
        assert_eq!(video.view_count.as_deref(), Some("420"));
    }

    #[test]
    fn test_news_block() {
        let mut fields = minimal_fields("id");
        fields.news = Some(NewsFieldMap {
            title: Some("headline".to_string()),
            keywords: Some("tags".to_string()),
            pub_date: Some("published_at".to_string()),
            publication: Some(crate::config::NewsPublicationFieldMap {
                name: Some("paper".to_string()),
                language: Some("lang".to_string()),
            }),
            ..NewsFieldMap::default()
        });

        let d = doc(json!({
            "id": 7,
            "headline": "Something happened",
            "tags": ["local", "politics"],
            "published_at": "2024-03-01T10:30:00Z",
            "paper": "The Daily Foobar",
            "lang": "en"
        }));

        let entry = build_entry(&d, "https://foobar.com/news", &fields).unwrap();
        let news = entry.news.unwrap();
        assert_eq!(news.keywords.as_deref(), Some("local, politics"));
        assert_eq!(news.pub_date.as_deref(), Some("2024-03-01T10:30:00+00:00"));
        let publication = news.publication.unwrap();
        assert_eq!(publication.name.as_deref(), Some("The Daily Foobar"));
        assert_eq!(publication.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_batch_dedup_first_wins() {
        let fields = minimal_fields("title");
        let docs = vec![
            doc(json!({"title": "Dune", "rank": 1})),
            doc(json!({"title": "dune", "rank": 2})),
            doc(json!({"title": "Alien", "rank": 3})),
            doc(json!({"missing": true})),
        ];

        let entries = build_entries(&docs, "movies", "https://foobar.com/movies", &fields);
        let locs: Vec<&str> = entries.iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(
            locs,
            vec![
                "https://foobar.com/movies/dune",
                "https://foobar.com/movies/alien"
            ]
        );
    }
}
